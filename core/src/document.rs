//! JSON:API wire format types
//!
//! Serde representations of the JSON:API document structure exchanged with
//! the backend: documents, resource objects, relationship objects and
//! resource linkage. These types are transport-agnostic; the codec in
//! [`crate::codec`] converts them to and from normalized records.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A `(type, id)` pair uniquely addressing a resource
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ResourceIdentifier {
    /// Resource type
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Resource id
    pub id: String,
}

impl ResourceIdentifier {
    /// Create a new identifier
    #[must_use]
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// Whether both type and id are present (empty strings count as absent)
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.resource_type.is_empty() && !self.id.is_empty()
    }
}

impl std::fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.resource_type, self.id)
    }
}

/// A JSON:API link: either a bare URL string or a `{href}` object
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Link {
    /// Plain URL string
    Url(String),
    /// Link object with an `href` member
    Object {
        /// Target URL
        href: String,
        /// Link metadata
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta: Option<Value>,
    },
}

impl Link {
    /// The link target URL regardless of representation
    #[must_use]
    pub fn href(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::Object { href, .. } => href,
        }
    }
}

/// Links member of a relationship object
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct RelationshipLinks {
    /// Link to the related resource(s)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related: Option<Link>,
    /// Link to the relationship itself
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<Link>,
}

/// Resource linkage: the `data` member of a relationship object
///
/// `Empty` models an explicit `"data": null` (an empty to-one
/// relationship), which must stay distinguishable from an absent `data`
/// member (`Option::<Linkage>::None` on [`Relationship`]).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Linkage {
    /// To-many linkage
    ToMany(Vec<ResourceIdentifier>),
    /// To-one linkage
    ToOne(ResourceIdentifier),
    /// Explicit null: an empty to-one relationship
    Empty,
}

impl Linkage {
    /// All identifiers referenced by this linkage
    #[must_use]
    pub fn identifiers(&self) -> Vec<&ResourceIdentifier> {
        match self {
            Self::ToMany(ids) => ids.iter().collect(),
            Self::ToOne(id) => vec![id],
            Self::Empty => Vec::new(),
        }
    }
}

/// A relationship object: linkage data and/or related links
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Relationship {
    /// Resource linkage; `Some(Linkage::Empty)` is an explicit null
    #[serde(
        default,
        deserialize_with = "deserialize_linkage",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<Linkage>,
    /// Relationship links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<RelationshipLinks>,
    /// Relationship metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl Relationship {
    /// Relationship with to-one linkage
    #[must_use]
    pub fn to_one(identifier: ResourceIdentifier) -> Self {
        Self {
            data: Some(Linkage::ToOne(identifier)),
            ..Self::default()
        }
    }

    /// Relationship with to-many linkage
    #[must_use]
    pub fn to_many(identifiers: Vec<ResourceIdentifier>) -> Self {
        Self {
            data: Some(Linkage::ToMany(identifiers)),
            ..Self::default()
        }
    }

    /// URL of the `links.related` member, if any
    #[must_use]
    pub fn related_href(&self) -> Option<&str> {
        self.links
            .as_ref()
            .and_then(|links| links.related.as_ref())
            .map(Link::href)
    }
}

// A present `"data": null` must become Some(Linkage::Empty), not None.
// Plain Option deserialization would swallow the null before the untagged
// enum gets a chance to match it.
fn deserialize_linkage<'de, D>(deserializer: D) -> Result<Option<Linkage>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Linkage::deserialize(deserializer).map(Some)
}

/// One resource object in wire format
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourceObject {
    /// Resource type
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub resource_type: String,
    /// Resource id; may be absent on client-generated resources
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Resource attributes
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, Value>,
    /// Named relationships
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub relationships: HashMap<String, Relationship>,
    /// Resource links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Value>,
    /// Resource metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl ResourceObject {
    /// Create a resource object with type and id only
    #[must_use]
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
            ..Self::default()
        }
    }

    /// The resource's identifier
    #[must_use]
    pub fn identifier(&self) -> ResourceIdentifier {
        ResourceIdentifier::new(self.resource_type.clone(), self.id.clone())
    }
}

/// Primary data of a document: one resource or an array of them
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PrimaryData {
    /// Array of resource objects
    Many(Vec<ResourceObject>),
    /// Single resource object
    One(ResourceObject),
}

/// A complete JSON:API document
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Primary data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PrimaryData>,
    /// Side-loaded resources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub included: Option<Vec<ResourceObject>>,
    /// Document metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    /// Document links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Value>,
}

impl Document {
    /// Document wrapping a single resource
    #[must_use]
    pub fn one(resource: ResourceObject) -> Self {
        Self {
            data: Some(PrimaryData::One(resource)),
            ..Self::default()
        }
    }

    /// Document wrapping an array of resources
    #[must_use]
    pub fn many(resources: Vec<ResourceObject>) -> Self {
        Self {
            data: Some(PrimaryData::Many(resources)),
            ..Self::default()
        }
    }

    /// Whether the document carries primary resource data
    #[must_use]
    pub const fn has_data(&self) -> bool {
        self.data.is_some()
    }
}
