//! The `ResourceStore` facade
//!
//! Owns the shared store state, the injected transport, the configuration
//! and the action sequence counter. Cloning is cheap and every clone
//! shares the same state — handles returned by actions keep a clone alive
//! until they complete.

use crate::status::{ActionHandle, AsActionId};
use crate::transport::{HttpTransport, Transport};
use jsonapi_store_core::config::StoreConfig;
use jsonapi_store_core::error::QueryError;
use jsonapi_store_core::record::NormalizedRecord;
use jsonapi_store_core::resolver::{self, Resolved, ResolvedRecord};
use jsonapi_store_core::state::{ActionStatus, StatusEntry, StoreState};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// The normalization cache: keyed store, resolver accessors and action
/// orchestration over an injected transport
///
/// Store writes are synchronous point mutations performed from action
/// completion paths; locks are never held across an await point. Multiple
/// actions may be in flight concurrently, distinguished by sequence id;
/// completion order is not guaranteed to match invocation order, and the
/// last mutation to apply wins.
#[derive(Clone)]
pub struct ResourceStore {
    state: Arc<RwLock<StoreState>>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) config: Arc<StoreConfig>,
    sequence: Arc<AtomicU64>,
}

impl ResourceStore {
    /// Create a store over an injected transport
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, config: StoreConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::new())),
            transport,
            config: Arc::new(config),
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Create a store speaking JSON:API over HTTP to `base_url`
    #[must_use]
    pub fn from_url(base_url: impl Into<String>, config: StoreConfig) -> Self {
        Self::new(Arc::new(HttpTransport::new(base_url)), config)
    }

    /// The configuration this store was built with
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Path-addressed read accessor
    ///
    /// `""` yields the whole store, `"type"` a resolved collection,
    /// `"type/id"` a single resolved record. Relationship views are
    /// computed on demand from current store content.
    #[must_use]
    pub fn read(&self, path: &str) -> Resolved {
        resolver::read(&self.state_read(), &self.config, path)
    }

    /// Filtering read accessor: resolved collection filtered by a JSONPath
    /// expression, matches re-keyed by id
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::BadQuery`] for an invalid expression.
    pub fn read_filtered(
        &self,
        resource_type: &str,
        query: &str,
    ) -> Result<HashMap<String, ResolvedRecord>, QueryError> {
        resolver::read_filtered(&self.state_read(), &self.config, resource_type, query)
    }

    /// Look up one stored record without resolving relationships
    #[must_use]
    pub fn record(&self, resource_type: &str, id: &str) -> Option<NormalizedRecord> {
        self.state_read().record(resource_type, id).cloned()
    }

    /// Look up the status of an action by sequence id or handle
    #[must_use]
    pub fn status(&self, id: impl AsActionId) -> Option<StatusEntry> {
        self.state_read().status(id.action_id())
    }

    pub(crate) fn state_read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn state_write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate the next action sequence id
    pub(crate) fn next_action_id(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Register `LOADING` for a new action and schedule status eviction
    pub(crate) fn begin_action(&self, action_id: u64) {
        self.state_write()
            .set_status(action_id, ActionStatus::Loading);
        self.schedule_status_cleanup(action_id);
    }

    /// Record the terminal status for an action
    pub(crate) fn finish_action<T, E>(&self, action_id: u64, result: &Result<T, E>) {
        let status = match result {
            Ok(_) => ActionStatus::Success,
            Err(_) => ActionStatus::Error,
        };
        self.state_write().set_status(action_id, status);
    }

    /// Wrap an action body in a handle that brackets it with status updates
    pub(crate) fn run_action<T, F>(&self, action_id: u64, body: F) -> ActionHandle<T>
    where
        T: Send + 'static,
        F: std::future::Future<Output = Result<T, crate::error::StoreError>> + Send + 'static,
    {
        self.begin_action(action_id);
        let store = self.clone();
        ActionHandle::new(
            action_id,
            Box::pin(async move {
                let result = body.await;
                store.finish_action(action_id, &result);
                result
            }),
        )
    }

    // One-shot deferred eviction, scheduled at invocation time. A zero
    // clean age disables eviction; outside a tokio runtime the entry
    // simply persists until cleared manually.
    fn schedule_status_cleanup(&self, action_id: u64) {
        let age = self.config.action_status_clean_age;
        if age == 0 {
            return;
        }
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let state = Arc::clone(&self.state);
            runtime.spawn(async move {
                tokio::time::sleep(Duration::from_secs(age)).await;
                state
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .delete_status(action_id);
            });
        }
    }
}

impl std::fmt::Debug for ResourceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
