//! Resource path parsing and construction
//!
//! Actions and accessors address resources with `type`, `type/id` or
//! `type/id/relationship` path strings. Segments are percent-encoded when
//! paths are built and decoded when they are parsed.

use crate::document::ResourceIdentifier;

/// Parsed form of a resource path string
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathSpec {
    /// First segment: resource type
    pub resource_type: Option<String>,
    /// Second segment: resource id
    pub id: Option<String>,
    /// Third segment: relationship name
    pub relationship: Option<String>,
}

impl PathSpec {
    /// The identifier addressed by this path, when type and id are present
    #[must_use]
    pub fn identifier(&self) -> Option<ResourceIdentifier> {
        match (&self.resource_type, &self.id) {
            (Some(resource_type), Some(id)) => {
                Some(ResourceIdentifier::new(resource_type.clone(), id.clone()))
            }
            _ => None,
        }
    }
}

/// Parse a `type`, `type/id` or `type/id/relationship` path
///
/// Empty segments (including a leading or trailing slash) are treated as
/// absent. Segments are percent-decoded; segments that fail to decode are
/// kept verbatim.
#[must_use]
pub fn parse(path: &str) -> PathSpec {
    let mut segments = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(decode);

    PathSpec {
        resource_type: segments.next(),
        id: segments.next(),
        relationship: segments.next(),
    }
}

/// Build a relative URL path for a resource
///
/// Segments are percent-encoded; empty segments are skipped.
#[must_use]
pub fn build(segments: &[&str]) -> String {
    segments
        .iter()
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn decode(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_else(|_| segment.to_string())
}
