//! Relationship resolver
//!
//! Read-side accessors over [`StoreState`]. Relationship views are
//! computed on demand from the linkage stored in each record's metadata —
//! they are never persisted, so stored records cannot go stale or form
//! reference cycles inside the store. Resolution walks the relationship
//! graph carrying an ordered path of `(relation, type, id)` triples; when
//! recursion is disabled, a repeated triple terminates with a bare
//! identifier stub instead of recursing.

use crate::config::StoreConfig;
use crate::document::{Linkage, ResourceIdentifier};
use crate::error::QueryError;
use crate::paths;
use crate::record::{NormalizedRecord, Records, StoreShape};
use crate::state::StoreState;
use serde_json::Value;
use std::collections::HashMap;

/// One traversed relationship edge on the resolution path
type SeenEdge = (String, String, String);

/// A relationship view on a resolved record
#[derive(Clone, Debug, PartialEq)]
pub enum Related {
    /// Resolved to-one relationship
    One(Box<ResolvedRecord>),
    /// Resolved to-many relationship, keyed by related id
    Many(HashMap<String, Related>),
    /// Terminal reference: a repeated edge on the resolution path, or a
    /// related record not present in the store
    Stub(ResourceIdentifier),
    /// Present but unresolved: explicit null linkage, or a relationship
    /// stub with neither linkage nor resolvable related link
    Empty,
}

/// A record together with its computed relationship views
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ResolvedRecord {
    /// The record as stored
    pub record: NormalizedRecord,
    /// Relationship views, keyed by relationship name
    pub related: HashMap<String, Related>,
}

impl ResolvedRecord {
    /// Wrap a record with no relationship views
    #[must_use]
    pub fn bare(record: NormalizedRecord) -> Self {
        Self {
            record,
            related: HashMap::new(),
        }
    }

    /// Flatten to the external view shape
    ///
    /// The record's flattened form plus one top-level key per relationship
    /// view; resolved views flatten recursively, stubs flatten to bare
    /// `{type, id}` objects, empty views to `null`.
    #[must_use]
    pub fn to_value(&self, reserved_key: &str) -> Value {
        let mut flat = self.record.to_value(reserved_key);
        if let Value::Object(map) = &mut flat {
            for (name, related) in &self.related {
                map.insert(name.clone(), related.to_value(reserved_key));
            }
        }
        flat
    }
}

impl Related {
    /// Flatten this view to a JSON value (see [`ResolvedRecord::to_value`])
    #[must_use]
    pub fn to_value(&self, reserved_key: &str) -> Value {
        match self {
            Self::One(resolved) => resolved.to_value(reserved_key),
            Self::Many(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(id, related)| (id.clone(), related.to_value(reserved_key)))
                    .collect(),
            ),
            Self::Stub(identifier) => serde_json::json!({
                "type": identifier.resource_type,
                "id": identifier.id,
            }),
            Self::Empty => Value::Null,
        }
    }
}

/// Result of a read accessor
#[derive(Clone, Debug, PartialEq)]
pub enum Resolved {
    /// Nothing at the requested address
    None,
    /// The whole store
    Store(StoreShape),
    /// A single resolved record
    One(Box<ResolvedRecord>),
    /// A resolved collection keyed by id
    Collection(HashMap<String, ResolvedRecord>),
}

impl Resolved {
    /// The single resolved record, if this is a [`Resolved::One`]
    #[must_use]
    pub fn as_one(&self) -> Option<&ResolvedRecord> {
        match self {
            Self::One(resolved) => Some(resolved),
            _ => None,
        }
    }

    /// The resolved collection, if this is a [`Resolved::Collection`]
    #[must_use]
    pub const fn as_collection(&self) -> Option<&HashMap<String, ResolvedRecord>> {
        match self {
            Self::Collection(collection) => Some(collection),
            _ => None,
        }
    }
}

/// Resolve one record and its relationship views
///
/// Returns `None` when the record is not in the store. The stored record
/// is never mutated; the view is an owned copy.
#[must_use]
pub fn resolve_record(
    state: &StoreState,
    config: &StoreConfig,
    resource_type: &str,
    id: &str,
) -> Option<ResolvedRecord> {
    let record = state.record(resource_type, id)?.clone();
    let mut seen = Vec::new();
    Some(resolve_from(state, config, record, &mut seen))
}

/// Resolve every stored record of one type, keyed by id
///
/// An unknown type yields an empty map.
#[must_use]
pub fn resolve_collection(
    state: &StoreState,
    config: &StoreConfig,
    resource_type: &str,
) -> HashMap<String, ResolvedRecord> {
    state
        .collection(resource_type)
        .map(|collection| {
            collection
                .iter()
                .map(|(id, record)| {
                    let mut seen = Vec::new();
                    (
                        id.clone(),
                        resolve_from(state, config, record.clone(), &mut seen),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Path-addressed read accessor
///
/// `""` yields the whole store, `"type"` a resolved collection,
/// `"type/id"` a single resolved record (or [`Resolved::None`]).
#[must_use]
pub fn read(state: &StoreState, config: &StoreConfig, path: &str) -> Resolved {
    let spec = paths::parse(path);
    match (spec.resource_type, spec.id) {
        (None, _) => Resolved::Store(state.records().clone()),
        (Some(resource_type), None) => {
            Resolved::Collection(resolve_collection(state, config, &resource_type))
        }
        (Some(resource_type), Some(id)) => {
            resolve_record(state, config, &resource_type, &id)
                .map_or(Resolved::None, |resolved| Resolved::One(Box::new(resolved)))
        }
    }
}

/// Filtering read accessor
///
/// Resolves the collection for `resource_type`, applies a JSONPath
/// expression to the flattened views and returns the matches re-keyed by
/// their id.
///
/// # Errors
///
/// Returns [`QueryError::BadQuery`] when the expression fails to parse or
/// evaluate.
pub fn read_filtered(
    state: &StoreState,
    config: &StoreConfig,
    resource_type: &str,
    query: &str,
) -> Result<HashMap<String, ResolvedRecord>, QueryError> {
    use jsonpath_rust::JsonPathQuery;

    let mut resolved = resolve_collection(state, config, resource_type);
    let flattened = Value::Array(
        resolved
            .values()
            .map(|record| record.to_value(&config.reserved_key))
            .collect(),
    );
    let matches = flattened
        .path(query)
        .map_err(|reason| QueryError::BadQuery {
            query: query.to_string(),
            reason: reason.to_string(),
        })?;

    let matched_ids: Vec<String> = match matches {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.get(&config.reserved_key))
            .filter_map(|meta| meta.get("id"))
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    resolved.retain(|id, _| matched_ids.iter().any(|matched| matched == id));
    Ok(resolved)
}

/// Resolve codec output against a store
///
/// Records present in `state` resolve with relationship views; records
/// absent from it (e.g. when store writes were suppressed) come back bare.
#[must_use]
pub fn resolve_records(state: &StoreState, config: &StoreConfig, records: &Records) -> Resolved {
    match records {
        Records::One(record) => {
            let resolved = resolve_record(
                state,
                config,
                &record.meta.resource_type,
                &record.meta.id,
            )
            .unwrap_or_else(|| ResolvedRecord::bare(record.clone()));
            Resolved::One(Box::new(resolved))
        }
        Records::Collection(collection) => Resolved::Collection(
            collection
                .iter()
                .map(|(id, record)| {
                    let resolved = resolve_record(
                        state,
                        config,
                        &record.meta.resource_type,
                        &record.meta.id,
                    )
                    .unwrap_or_else(|| ResolvedRecord::bare(record.clone()));
                    (id.clone(), resolved)
                })
                .collect(),
        ),
    }
}

fn resolve_from(
    state: &StoreState,
    config: &StoreConfig,
    record: NormalizedRecord,
    seen: &mut Vec<SeenEdge>,
) -> ResolvedRecord {
    let mut related = HashMap::new();
    if config.follow_relationships_data {
        for (name, relationship) in &record.meta.relationships {
            let view = match &relationship.data {
                Some(Linkage::ToOne(identifier)) => {
                    resolve_edge(state, config, name, identifier, seen)
                }
                Some(Linkage::ToMany(identifiers)) => Related::Many(
                    identifiers
                        .iter()
                        .map(|identifier| {
                            (
                                identifier.id.clone(),
                                resolve_edge(state, config, name, identifier, seen),
                            )
                        })
                        .collect(),
                ),
                // Explicit null and data-less relationship stubs stay
                // present but unresolved.
                Some(Linkage::Empty) | None => Related::Empty,
            };
            related.insert(name.clone(), view);
        }
    }
    ResolvedRecord { record, related }
}

fn resolve_edge(
    state: &StoreState,
    config: &StoreConfig,
    relation: &str,
    identifier: &ResourceIdentifier,
    seen: &mut Vec<SeenEdge>,
) -> Related {
    if !identifier.is_complete() {
        return Related::Empty;
    }
    let edge = (
        relation.to_string(),
        identifier.resource_type.clone(),
        identifier.id.clone(),
    );
    if !config.recurse_relationships && seen.contains(&edge) {
        return Related::Stub(identifier.clone());
    }
    let Some(record) = state.record(&identifier.resource_type, &identifier.id) else {
        return Related::Stub(identifier.clone());
    };
    seen.push(edge);
    let resolved = resolve_from(state, config, record.clone(), seen);
    seen.pop();
    Related::One(Box::new(resolved))
}
