//! Orchestrated actions
//!
//! Each action wraps one network operation with a sequence id and a
//! `LOADING -> SUCCESS | ERROR` status lifecycle: status is registered
//! before the transport is called, the terminal status is recorded before
//! the result (or the unchanged error) reaches the caller. Actions accept
//! a `"type/id"` path string, a normalized record, or either paired with a
//! per-request override.

use crate::client::ResourceStore;
use crate::error::StoreError;
use crate::status::ActionHandle;
use crate::transport::{Method, TransportRequest};
use futures::future::try_join_all;
use jsonapi_store_core::codec;
use jsonapi_store_core::config::StoreConfig;
use jsonapi_store_core::document::{Document, Linkage, ResourceIdentifier};
use jsonapi_store_core::error::RecordError;
use jsonapi_store_core::paths;
use jsonapi_store_core::record::{NormalizedRecord, Records};
use jsonapi_store_core::resolver::{self, Resolved, ResolvedRecord};
use jsonapi_store_core::state::StoreState;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Per-request override: swap the URL or add query/header entries
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestOverride {
    /// Replacement request URL
    pub url: Option<String>,
    /// Extra query parameters
    pub params: Vec<(String, String)>,
    /// Extra headers
    pub headers: Vec<(String, String)>,
}

impl RequestOverride {
    /// Override the request URL
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Add a query parameter
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// What an action is addressed at
#[derive(Clone, Debug, PartialEq)]
pub enum Target {
    /// A `type`, `type/id` or `type/id/relationship` path
    Path(String),
    /// A normalized record (used as body and/or address)
    Record(Box<NormalizedRecord>),
}

/// Arguments accepted by every action
#[derive(Clone, Debug, PartialEq)]
pub struct ActionArgs {
    /// The addressed resource
    pub target: Target,
    /// Per-request transport override
    pub request: RequestOverride,
}

impl ActionArgs {
    fn spec(&self) -> paths::PathSpec {
        match &self.target {
            Target::Path(path) => paths::parse(path),
            Target::Record(record) => paths::PathSpec {
                resource_type: Some(record.meta.resource_type.clone())
                    .filter(|t| !t.is_empty()),
                id: Some(record.meta.id.clone()).filter(|id| !id.is_empty()),
                relationship: None,
            },
        }
    }

    fn record(&self) -> Option<&NormalizedRecord> {
        match &self.target {
            Target::Record(record) => Some(record),
            Target::Path(_) => None,
        }
    }

    /// The identifier this action addresses
    ///
    /// # Errors
    ///
    /// [`RecordError::Unidentifiable`] when type or id cannot be
    /// determined.
    fn identifier(&self) -> Result<ResourceIdentifier, StoreError> {
        self.spec()
            .identifier()
            .ok_or_else(|| self.unidentifiable())
    }

    fn unidentifiable(&self) -> StoreError {
        let value = match &self.target {
            Target::Path(path) => Value::String(path.clone()),
            Target::Record(record) => record.to_value("_jv"),
        };
        StoreError::Record(RecordError::Unidentifiable { value })
    }

    /// URL for read-style requests: override, verbatim path, record self
    /// link, or `type/id` built from the record
    fn read_url(&self) -> Result<String, StoreError> {
        if let Some(url) = &self.request.url {
            return Ok(url.clone());
        }
        match &self.target {
            Target::Path(path) => Ok(path.clone()),
            Target::Record(record) => self_link(record).map_or_else(
                || {
                    let identifier = self.identifier()?;
                    Ok(paths::build(&[&identifier.resource_type, &identifier.id]))
                },
                Ok,
            ),
        }
    }

    /// URL for POST requests: the collection endpoint
    fn collection_url(&self) -> Result<String, StoreError> {
        if let Some(url) = &self.request.url {
            return Ok(url.clone());
        }
        let spec = self.spec();
        spec.resource_type
            .as_deref()
            .map(|resource_type| paths::build(&[resource_type]))
            .ok_or_else(|| self.unidentifiable())
    }

    fn transport_request(&self, method: Method, url: String) -> TransportRequest {
        TransportRequest::new(method, url)
            .with_params(self.request.params.clone())
            .with_headers(self.request.headers.clone())
    }
}

impl From<&str> for ActionArgs {
    fn from(path: &str) -> Self {
        Self {
            target: Target::Path(path.to_string()),
            request: RequestOverride::default(),
        }
    }
}

impl From<String> for ActionArgs {
    fn from(path: String) -> Self {
        Self {
            target: Target::Path(path),
            request: RequestOverride::default(),
        }
    }
}

impl From<NormalizedRecord> for ActionArgs {
    fn from(record: NormalizedRecord) -> Self {
        Self {
            target: Target::Record(Box::new(record)),
            request: RequestOverride::default(),
        }
    }
}

impl From<&NormalizedRecord> for ActionArgs {
    fn from(record: &NormalizedRecord) -> Self {
        record.clone().into()
    }
}

impl<A: Into<ActionArgs>> From<(A, RequestOverride)> for ActionArgs {
    fn from((base, request): (A, RequestOverride)) -> Self {
        let mut args = base.into();
        args.request = request;
        args
    }
}

/// `get_related` result: relationship name, then type, then id
pub type RelatedResults = HashMap<String, HashMap<String, HashMap<String, ResolvedRecord>>>;

impl ResourceStore {
    /// Fetch one resource or a collection and store it
    ///
    /// Side-loads any `included` resources before the primary records,
    /// normalizes and adds the primary data, optionally reconciles stale
    /// siblings (`clear_on_update`), resolves relationship views and
    /// returns them. With `preserve_json`, the original wire payload is
    /// attached to the returned records.
    pub fn get(&self, args: impl Into<ActionArgs>) -> ActionHandle<Resolved> {
        let args = args.into();
        let action_id = self.next_action_id();
        let store = self.clone();
        self.run_action(action_id, async move { store.run_get(args, true).await })
    }

    /// Alias for [`ResourceStore::get`]
    pub fn fetch(&self, args: impl Into<ActionArgs>) -> ActionHandle<Resolved> {
        self.get(args)
    }

    /// Read-only preview query: exactly [`ResourceStore::get`] with every
    /// store write suppressed
    pub fn search(&self, args: impl Into<ActionArgs>) -> ActionHandle<Resolved> {
        let args = args.into();
        let action_id = self.next_action_id();
        let store = self.clone();
        self.run_action(action_id, async move { store.run_get(args, false).await })
    }

    /// Resolve a resource's relationships to actual related records
    ///
    /// Fetches the root record, then per relationship (or only the one
    /// named by a `type/id/name` path): uses embedded linkage when
    /// present, otherwise follows `links.related`, otherwise hits the
    /// `type/id/relationships/name` linkage endpoint; each related
    /// resource is then fetched via `get`. All fetches are joined
    /// all-or-nothing — one failure rejects the whole batch.
    pub fn get_related(&self, args: impl Into<ActionArgs>) -> ActionHandle<RelatedResults> {
        let args = args.into();
        let action_id = self.next_action_id();
        let store = self.clone();
        self.run_action(action_id, async move { store.run_get_related(args).await })
    }

    /// Create a resource
    ///
    /// Accepts 200 and 201 alike; stores the server's authoritative copy
    /// when one is returned, the submitted record otherwise.
    pub fn post(&self, args: impl Into<ActionArgs>) -> ActionHandle<Resolved> {
        let args = args.into();
        let action_id = self.next_action_id();
        let store = self.clone();
        self.run_action(action_id, async move { store.run_post(args).await })
    }

    /// Alias for [`ResourceStore::post`]
    pub fn create(&self, args: impl Into<ActionArgs>) -> ActionHandle<Resolved> {
        self.post(args)
    }

    /// Update a resource
    ///
    /// With `clean_patch`, attributes deep-equal to the stored record are
    /// stripped before submission. A response with a full resource body
    /// replaces the stored record (delete, then add, then side-load
    /// included); an empty or meta-only response merges the submitted
    /// fields instead.
    pub fn patch(&self, args: impl Into<ActionArgs>) -> ActionHandle<Resolved> {
        let args = args.into();
        let action_id = self.next_action_id();
        let store = self.clone();
        self.run_action(action_id, async move { store.run_patch(args).await })
    }

    /// Alias for [`ResourceStore::patch`]
    pub fn update(&self, args: impl Into<ActionArgs>) -> ActionHandle<Resolved> {
        self.patch(args)
    }

    /// Delete a resource
    ///
    /// Removes the local record unconditionally on success and side-loads
    /// any included resources; returns the server's representation when
    /// one came back, the submitted identifier's view otherwise.
    pub fn delete(&self, args: impl Into<ActionArgs>) -> ActionHandle<Resolved> {
        let args = args.into();
        let action_id = self.next_action_id();
        let store = self.clone();
        self.run_action(action_id, async move { store.run_delete(args).await })
    }

    async fn run_get(&self, args: ActionArgs, persist: bool) -> Result<Resolved, StoreError> {
        let url = args.read_url()?;
        debug!(%url, persist, "get");
        let response = self
            .transport
            .request(args.transport_request(Method::Get, url))
            .await?;
        let document = response.document.unwrap_or_default();

        let records = codec::normalize(document.data.as_ref());
        // a body-less response normalizes to an empty record; there is
        // nothing to store in that case
        let empty = matches!(&records, Records::One(record)
            if !record.has_identifier() && record.attributes.is_empty());
        let shape = if empty {
            jsonapi_store_core::record::StoreShape::new()
        } else {
            codec::to_store_shape(&records, &self.config)?
        };

        let mut resolved = if persist {
            {
                let mut state = self.state_write();
                // included resources land before the primary records
                if let Some(included) = &document.included {
                    state.add_records(
                        codec::normalize_resources(included),
                        self.config.merge_records,
                    );
                }
                state.add_records(shape.clone(), self.config.merge_records);
                if self.config.clear_on_update && matches!(records, Records::Collection(_)) {
                    state.clear_records(&shape);
                }
            }
            resolver::resolve_records(&self.state_read(), &self.config, &records)
        } else {
            // search: resolve against a throwaway state so relationship
            // views still work without touching the store
            let mut preview = StoreState::new();
            if let Some(included) = &document.included {
                preview.add_records(codec::normalize_resources(included), false);
            }
            preview.add_records(shape, false);
            resolver::resolve_records(&preview, &self.config, &records)
        };

        if self.config.preserve_json {
            attach_json(&mut resolved, &document);
        }
        Ok(resolved)
    }

    async fn run_get_related(&self, args: ActionArgs) -> Result<RelatedResults, StoreError> {
        let identifier = args.identifier()?;
        let wanted = args.spec().relationship;

        // fetch the root fresh so the linkage reflects the server's view
        let root_path = paths::build(&[&identifier.resource_type, &identifier.id]);
        let root = self.run_get(ActionArgs::from(root_path), true).await?;
        let relationships = root
            .as_one()
            .map(|resolved| resolved.record.meta.relationships.clone())
            .unwrap_or_default();

        if let Some(name) = &wanted {
            if !relationships.contains_key(name) {
                return Err(StoreError::MissingRelationship {
                    resource: identifier.to_string(),
                    relationship: name.clone(),
                });
            }
        }

        let mut results = RelatedResults::new();
        for (name, relationship) in relationships {
            if wanted.as_ref().is_some_and(|wanted| *wanted != name) {
                continue;
            }
            let entry = results.entry(name.clone()).or_default();

            let linkage = match &relationship.data {
                Some(linkage) => linkage.clone(),
                None => {
                    if let Some(href) = relationship.related_href() {
                        // related link: the response carries the related
                        // resources themselves
                        let related = self.run_get(ActionArgs::from(href.to_string()), true).await?;
                        collect_resolved(entry, related);
                        continue;
                    }
                    // fall back to the explicit relationship-linkage endpoint
                    self.fetch_linkage(&identifier, &name).await?
                }
            };

            let identifiers: Vec<ResourceIdentifier> = linkage
                .identifiers()
                .into_iter()
                .filter(|related| related.is_complete())
                .cloned()
                .collect();
            let fetches = identifiers.iter().map(|related| {
                self.get(paths::build(&[&related.resource_type, &related.id]))
            });
            for related in try_join_all(fetches).await? {
                collect_resolved(entry, related);
            }
        }
        Ok(results)
    }

    async fn fetch_linkage(
        &self,
        identifier: &ResourceIdentifier,
        name: &str,
    ) -> Result<Linkage, StoreError> {
        let url = paths::build(&[
            &identifier.resource_type,
            &identifier.id,
            "relationships",
            name,
        ]);
        let response = self
            .transport
            .request(TransportRequest::new(Method::Get, url))
            .await?;
        let document = response.document.unwrap_or_default();
        Ok(match document.data {
            None => Linkage::Empty,
            Some(data) => match codec::normalize(Some(&data)) {
                Records::One(record) => Linkage::ToOne(record.identifier()),
                Records::Collection(collection) => Linkage::ToMany(
                    collection
                        .values()
                        .map(NormalizedRecord::identifier)
                        .collect(),
                ),
            },
        })
    }

    async fn run_post(&self, args: ActionArgs) -> Result<Resolved, StoreError> {
        let record = args.record().ok_or_else(|| args.unidentifiable())?.clone();
        let url = args.collection_url()?;
        debug!(%url, "post");

        let body = codec::denormalize(&Records::One(record.clone()));
        let response = self
            .transport
            .request(args.transport_request(Method::Post, url).with_document(body))
            .await?;
        // some servers answer 200, some 201; both carry equal weight
        debug!(status = response.status, "post response");
        let document = response.document.unwrap_or_default();

        // the server's copy is authoritative when it returned one
        let records = if document.has_data() {
            codec::normalize(document.data.as_ref())
        } else {
            Records::One(record)
        };
        let shape = codec::to_store_shape(&records, &self.config)?;
        {
            let mut state = self.state_write();
            if let Some(included) = &document.included {
                state.add_records(
                    codec::normalize_resources(included),
                    self.config.merge_records,
                );
            }
            state.add_records(shape, self.config.merge_records);
        }

        let mut resolved = resolver::resolve_records(&self.state_read(), &self.config, &records);
        if self.config.preserve_json {
            attach_json(&mut resolved, &document);
        }
        Ok(resolved)
    }

    async fn run_patch(&self, args: ActionArgs) -> Result<Resolved, StoreError> {
        let mut record = args.record().ok_or_else(|| args.unidentifiable())?.clone();
        if !record.has_identifier() {
            return Err(args.unidentifiable());
        }
        if self.config.clean_patch {
            record = clean_patch(&record, &self.state_read(), &self.config);
        }
        let url = args.read_url()?;
        debug!(%url, "patch");

        let body = codec::denormalize(&Records::One(record.clone()));
        let response = self
            .transport
            .request(args.transport_request(Method::Patch, url).with_document(body))
            .await?;
        let document = response.document.unwrap_or_default();

        if document.has_data() {
            // full resource body: the server's copy replaces ours
            let records = codec::normalize(document.data.as_ref());
            let shape = codec::to_store_shape(&records, &self.config)?;
            {
                let mut state = self.state_write();
                state.delete_record(&record.identifier())?;
                state.add_records(shape, self.config.merge_records);
                // included records come last so the replacement cannot
                // evict them as stale
                if let Some(included) = &document.included {
                    state.add_records(
                        codec::normalize_resources(included),
                        self.config.merge_records,
                    );
                }
            }
            let mut resolved =
                resolver::resolve_records(&self.state_read(), &self.config, &records);
            if self.config.preserve_json {
                attach_json(&mut resolved, &document);
            }
            Ok(resolved)
        } else {
            // empty or meta-only response: merge the submitted fields
            let records = Records::One(record);
            let shape = codec::to_store_shape(&records, &self.config)?;
            self.state_write().update_records(shape);
            let mut resolved =
                resolver::resolve_records(&self.state_read(), &self.config, &records);
            if self.config.preserve_json {
                attach_json(&mut resolved, &document);
            }
            Ok(resolved)
        }
    }

    async fn run_delete(&self, args: ActionArgs) -> Result<Resolved, StoreError> {
        let identifier = args.identifier()?;
        let url = args.read_url()?;
        debug!(%url, "delete");

        let response = self
            .transport
            .request(args.transport_request(Method::Delete, url))
            .await?;
        let document = response.document.unwrap_or_default();

        {
            let mut state = self.state_write();
            state.delete_record(&identifier)?;
            if let Some(included) = &document.included {
                state.add_records(
                    codec::normalize_resources(included),
                    self.config.merge_records,
                );
            }
        }

        if document.has_data() {
            let records = codec::normalize(document.data.as_ref());
            Ok(resolver::resolve_records(
                &self.state_read(),
                &self.config,
                &records,
            ))
        } else {
            // no body: hand back the submitted identifier's view
            let record = args.record().cloned().unwrap_or_else(|| {
                NormalizedRecord::new(identifier.resource_type.clone(), identifier.id.clone())
            });
            Ok(Resolved::One(Box::new(ResolvedRecord::bare(record))))
        }
    }
}

/// Strip attributes that are deep-equal to the stored record's
///
/// Keeps type and id unconditionally; metadata sub-keys (`links`, `meta`,
/// `relationships`) are dropped unless allow-listed in
/// `clean_patch_props`. Minimizes accidental reversion of concurrently
/// changed fields on partial updates.
#[must_use]
pub fn clean_patch(
    record: &NormalizedRecord,
    state: &StoreState,
    config: &StoreConfig,
) -> NormalizedRecord {
    let mut cleaned = NormalizedRecord::new(
        record.meta.resource_type.clone(),
        record.meta.id.clone(),
    );

    let stored = state.record(&record.meta.resource_type, &record.meta.id);
    for (name, value) in &record.attributes {
        let unchanged = stored
            .is_some_and(|stored| stored.attributes.get(name) == Some(value));
        if !unchanged {
            cleaned.attributes.insert(name.clone(), value.clone());
        }
    }

    for prop in &config.clean_patch_props {
        match prop.as_str() {
            "links" => cleaned.meta.links = record.meta.links.clone(),
            "meta" => cleaned.meta.meta = record.meta.meta.clone(),
            "relationships" => {
                cleaned.meta.relationships = record.meta.relationships.clone();
            }
            other => warn!(prop = other, "unknown clean_patch_props entry"),
        }
    }
    cleaned
}

fn self_link(record: &NormalizedRecord) -> Option<String> {
    let link = record.meta.links.as_ref()?.get("self")?;
    match link {
        Value::String(url) => Some(url.clone()),
        other => other
            .get("href")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

fn attach_json(resolved: &mut Resolved, document: &Document) {
    match resolved {
        Resolved::One(record) => record.record.meta.json = Some(document.clone()),
        Resolved::Collection(collection) => {
            for record in collection.values_mut() {
                record.record.meta.json = Some(document.clone());
            }
        }
        Resolved::Store(_) | Resolved::None => {}
    }
}

fn collect_resolved(
    entry: &mut HashMap<String, HashMap<String, ResolvedRecord>>,
    resolved: Resolved,
) {
    match resolved {
        Resolved::One(record) => {
            entry
                .entry(record.record.meta.resource_type.clone())
                .or_default()
                .insert(record.record.meta.id.clone(), *record);
        }
        Resolved::Collection(collection) => {
            for record in collection.into_values() {
                entry
                    .entry(record.record.meta.resource_type.clone())
                    .or_default()
                    .insert(record.record.meta.id.clone(), record);
            }
        }
        Resolved::Store(_) | Resolved::None => {}
    }
}
