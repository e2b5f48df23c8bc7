//! Store state and mutations
//!
//! [`StoreState`] is the keyed cache: a two-level `type -> id -> record`
//! map for resources plus a status sub-map keyed by action sequence id.
//! It is created empty and mutated only through the methods here; reads go
//! through the resolver accessors in [`crate::resolver`]. All mutations
//! are synchronous point mutations and idempotent at `(type, id)`
//! granularity.

use crate::document::ResourceIdentifier;
use crate::error::RecordError;
use crate::record::{NormalizedRecord, StoreShape};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Lifecycle state of one orchestrated action
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionStatus {
    /// Action invoked, network call in flight
    Loading,
    /// Action completed successfully (terminal)
    Success,
    /// Action failed (terminal)
    Error,
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => write!(f, "LOADING"),
            Self::Success => write!(f, "SUCCESS"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Status registry entry: lifecycle state plus the time it was recorded
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusEntry {
    /// Current lifecycle state
    pub status: ActionStatus,
    /// When the state was recorded
    pub time: DateTime<Utc>,
}

/// The keyed store: records by type and id, statuses by action id
#[derive(Clone, Debug, Default)]
pub struct StoreState {
    records: StoreShape,
    statuses: HashMap<u64, StatusEntry>,
}

impl StoreState {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored records
    #[must_use]
    pub const fn records(&self) -> &StoreShape {
        &self.records
    }

    /// Look up one record
    #[must_use]
    pub fn record(&self, resource_type: &str, id: &str) -> Option<&NormalizedRecord> {
        self.records.get(resource_type)?.get(id)
    }

    /// All stored records of one type
    #[must_use]
    pub fn collection(&self, resource_type: &str) -> Option<&HashMap<String, NormalizedRecord>> {
        self.records.get(resource_type)
    }

    /// Add records under the default policy
    ///
    /// Deep-merges into existing entries when `merge_records` is set in the
    /// global configuration (passed here as `merge`), otherwise overwrites.
    pub fn add_records(&mut self, shape: StoreShape, merge: bool) {
        if merge {
            self.update_records(shape);
        } else {
            self.replace_records(shape);
        }
    }

    /// Force-overwrite records regardless of the global merge policy
    pub fn replace_records(&mut self, shape: StoreShape) {
        for (resource_type, collection) in shape {
            debug!(%resource_type, count = collection.len(), "replacing records");
            let stored = self.records.entry(resource_type).or_default();
            for (id, record) in collection {
                stored.insert(id, record);
            }
        }
    }

    /// Force-deep-merge records regardless of the global merge policy
    ///
    /// An existing record at `(type, id)` is deep-merged with the incoming
    /// one, incoming values winning on conflict; first-time types
    /// auto-create an empty sub-map.
    pub fn update_records(&mut self, shape: StoreShape) {
        for (resource_type, collection) in shape {
            debug!(%resource_type, count = collection.len(), "merging records");
            let stored = self.records.entry(resource_type).or_default();
            for (id, record) in collection {
                match stored.get_mut(&id) {
                    Some(existing) => existing.merge_from(record),
                    None => {
                        stored.insert(id, record);
                    }
                }
            }
        }
    }

    /// Reconcile stored ids against "the current known set"
    ///
    /// For every type present in `shape`, deletes stored ids of that type
    /// absent from `shape`. Types not mentioned in `shape` are left
    /// untouched (partial reconciliation: a collection fetch only speaks
    /// for the types it returned).
    pub fn clear_records(&mut self, shape: &StoreShape) {
        for (resource_type, keep) in shape {
            if let Some(stored) = self.records.get_mut(resource_type) {
                let before = stored.len();
                stored.retain(|id, _| keep.contains_key(id));
                debug!(
                    %resource_type,
                    removed = before - stored.len(),
                    "cleared stale records"
                );
            }
        }
    }

    /// Remove exactly one record
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Unidentifiable`] when type or id is missing,
    /// carrying the partial identifier.
    pub fn delete_record(&mut self, identifier: &ResourceIdentifier) -> Result<(), RecordError> {
        if !identifier.is_complete() {
            return Err(RecordError::Unidentifiable {
                value: serde_json::json!({
                    "type": identifier.resource_type,
                    "id": identifier.id,
                }),
            });
        }
        if let Some(stored) = self.records.get_mut(&identifier.resource_type) {
            stored.remove(&identifier.id);
            debug!(identifier = %identifier, "deleted record");
        }
        Ok(())
    }

    /// Record a status for an action sequence id, stamped now
    pub fn set_status(&mut self, action_id: u64, status: ActionStatus) {
        debug!(action_id, %status, "action status");
        self.statuses.insert(
            action_id,
            StatusEntry {
                status,
                time: Utc::now(),
            },
        );
    }

    /// Remove a status entry; no-op for unknown ids
    pub fn delete_status(&mut self, action_id: u64) {
        self.statuses.remove(&action_id);
    }

    /// Look up a status entry
    #[must_use]
    pub fn status(&self, action_id: u64) -> Option<StatusEntry> {
        self.statuses.get(&action_id).copied()
    }
}
