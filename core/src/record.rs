//! Normalized record types
//!
//! A normalized record is the store-ready form of one resource: an open
//! attribute map plus a typed metadata block ([`RecordMeta`]). Keeping the
//! metadata in its own field (instead of a reserved key on the same level
//! as the attributes) removes any chance of runtime key collisions; the
//! wire-compatible flattened shape is produced at an explicit conversion
//! boundary ([`NormalizedRecord::to_value`] / [`NormalizedRecord::from_value`]).

use crate::document::{Document, Relationship, ResourceIdentifier};
use crate::error::RecordError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Metadata block of a normalized record
///
/// Serialized under the configured reserved key (default `_jv`) in the
/// flattened external shape.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct RecordMeta {
    /// Resource type
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub resource_type: String,
    /// Resource id
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Named relationships carried over from the wire format
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub relationships: HashMap<String, Relationship>,
    /// Resource links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Value>,
    /// Resource metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    /// Original wire payload, attached when `preserve_json` is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<Document>,
}

/// One resource in normalized form
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct NormalizedRecord {
    /// Resource attributes, hoisted out of the wire `attributes` member
    pub attributes: Map<String, Value>,
    /// Bookkeeping metadata
    pub meta: RecordMeta,
}

/// A single-type collection of normalized records, keyed by id
pub type RecordCollection = HashMap<String, NormalizedRecord>;

/// The two-level store shape: type, then id, then record
pub type StoreShape = HashMap<String, RecordCollection>;

impl NormalizedRecord {
    /// Create an empty record with the given identifier
    #[must_use]
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            attributes: Map::new(),
            meta: RecordMeta {
                resource_type: resource_type.into(),
                id: id.into(),
                ..RecordMeta::default()
            },
        }
    }

    /// Set an attribute, builder style
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// The record's identifier
    #[must_use]
    pub fn identifier(&self) -> ResourceIdentifier {
        ResourceIdentifier::new(self.meta.resource_type.clone(), self.meta.id.clone())
    }

    /// Whether both type and id are known (empty strings count as absent)
    #[must_use]
    pub fn has_identifier(&self) -> bool {
        !self.meta.resource_type.is_empty() && !self.meta.id.is_empty()
    }

    /// Whether `name` is one of the record's attributes
    #[must_use]
    pub fn is_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Whether `name` is one of the record's relationships
    #[must_use]
    pub fn is_rel(&self, name: &str) -> bool {
        self.meta.relationships.contains_key(name)
    }

    /// The record's attribute set
    #[must_use]
    pub const fn attrs(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Deep-merge another record into this one, incoming values winning
    ///
    /// Attributes are merged value-wise ([`deep_merge`]); relationships are
    /// merged name-wise; non-empty identifier fields and present
    /// links/meta/json blocks on the incoming record replace the existing
    /// ones.
    pub fn merge_from(&mut self, incoming: Self) {
        for (name, value) in incoming.attributes {
            match self.attributes.get_mut(&name) {
                Some(existing) => deep_merge(existing, value),
                None => {
                    self.attributes.insert(name, value);
                }
            }
        }
        if !incoming.meta.resource_type.is_empty() {
            self.meta.resource_type = incoming.meta.resource_type;
        }
        if !incoming.meta.id.is_empty() {
            self.meta.id = incoming.meta.id;
        }
        self.meta.relationships.extend(incoming.meta.relationships);
        if incoming.meta.links.is_some() {
            self.meta.links = incoming.meta.links;
        }
        if incoming.meta.meta.is_some() {
            self.meta.meta = incoming.meta.meta;
        }
        if incoming.meta.json.is_some() {
            self.meta.json = incoming.meta.json;
        }
    }

    /// Flatten to the wire-compatible external shape
    ///
    /// Attribute keys land at the top level; type, id, relationships, links
    /// and metadata land in one object under `reserved_key`.
    ///
    /// # Panics
    ///
    /// Does not panic: [`RecordMeta`] serialization is infallible for the
    /// types it contains.
    #[must_use]
    pub fn to_value(&self, reserved_key: &str) -> Value {
        let mut flat = self.attributes.clone();
        let meta = serde_json::to_value(&self.meta).unwrap_or_else(|_| Value::Object(Map::new()));
        flat.insert(reserved_key.to_string(), meta);
        Value::Object(flat)
    }

    /// Parse a flattened external value back into a normalized record
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::NotAnObject`] if `value` is not a JSON object
    /// and [`RecordError::MissingMeta`] if the reserved metadata block is
    /// absent or malformed — a flattened record without its metadata block
    /// must fail fast rather than be stored as garbage.
    pub fn from_value(value: &Value, reserved_key: &str) -> Result<Self, RecordError> {
        let Value::Object(object) = value else {
            return Err(RecordError::NotAnObject {
                value: value.clone(),
            });
        };

        let mut attributes = object.clone();
        let meta_value = attributes
            .remove(reserved_key)
            .ok_or_else(|| RecordError::MissingMeta {
                reserved_key: reserved_key.to_string(),
                value: value.clone(),
            })?;
        let meta: RecordMeta =
            serde_json::from_value(meta_value).map_err(|_| RecordError::MissingMeta {
                reserved_key: reserved_key.to_string(),
                value: value.clone(),
            })?;

        Ok(Self { attributes, meta })
    }
}

/// Output of the codec: one record or a single-type collection
///
/// The distinction is preserved through denormalization: a collection of
/// size 1 still emits an array on the wire, only a genuinely single input
/// takes the single-object path.
#[derive(Clone, Debug, PartialEq)]
pub enum Records {
    /// A single record
    One(NormalizedRecord),
    /// A collection keyed by id
    Collection(RecordCollection),
}

impl Records {
    /// Iterate over all contained records
    pub fn iter(&self) -> Box<dyn Iterator<Item = &NormalizedRecord> + '_> {
        match self {
            Self::One(record) => Box::new(std::iter::once(record)),
            Self::Collection(collection) => Box::new(collection.values()),
        }
    }

    /// Number of contained records
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Collection(collection) => collection.len(),
        }
    }

    /// Whether no records are contained
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Deep-merge `incoming` into `base`, incoming values winning
///
/// Objects merge key-wise, arrays merge index-wise (extra incoming
/// elements are appended), scalars are overwritten.
pub fn deep_merge(base: &mut Value, incoming: Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(incoming_map)) => {
            for (key, value) in incoming_map {
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(base_items), Value::Array(incoming_items)) => {
            let mut incoming_iter = incoming_items.into_iter();
            for existing in base_items.iter_mut() {
                match incoming_iter.next() {
                    Some(value) => deep_merge(existing, value),
                    None => break,
                }
            }
            base_items.extend(incoming_iter);
        }
        (base, incoming) => *base = incoming,
    }
}
