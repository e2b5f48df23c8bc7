//! # jsonapi-store Core
//!
//! Data layer for the jsonapi-store cache: the record codec, the
//! relationship resolver and the keyed store state.
//!
//! ## Core Concepts
//!
//! - **Wire document** ([`document`]): the JSON:API shapes exchanged with
//!   the backend (`{type, id, attributes, relationships}`)
//! - **Normalized record** ([`record`]): the store-ready form — attributes
//!   hoisted into an open map, bookkeeping in a typed metadata block
//! - **Codec** ([`codec`]): pure conversions wire ⇄ normalized ⇄ store shape
//! - **Store state** ([`state`]): `type -> id -> record` plus the action
//!   status sub-map, mutated only through its mutation methods
//! - **Resolver** ([`resolver`]): on-demand relationship views with
//!   seen-path cycle detection; the only supported way to read the store
//!
//! ## Example
//!
//! ```
//! use jsonapi_store_core::codec;
//! use jsonapi_store_core::config::StoreConfig;
//! use jsonapi_store_core::document::Document;
//! use jsonapi_store_core::resolver;
//! use jsonapi_store_core::state::StoreState;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StoreConfig::default();
//! let doc: Document = serde_json::from_value(serde_json::json!({
//!     "data": { "type": "widgets", "id": "1", "attributes": { "name": "foo" } }
//! }))?;
//!
//! let records = codec::normalize(doc.data.as_ref());
//! let mut state = StoreState::new();
//! state.add_records(codec::to_store_shape(&records, &config)?, config.merge_records);
//!
//! let view = resolver::read(&state, &config, "widgets/1");
//! assert_eq!(
//!     view.as_one().map(|r| r.record.attributes["name"].clone()),
//!     Some(serde_json::json!("foo"))
//! );
//! # Ok(())
//! # }
//! ```

/// Record codec: wire ⇄ normalized ⇄ store shape conversions
pub mod codec;

/// Store configuration
pub mod config;

/// JSON:API wire format types
pub mod document;

/// Error types
pub mod error;

/// Resource path parsing and construction
pub mod paths;

/// Normalized record types
pub mod record;

/// Relationship resolver and read accessors
pub mod resolver;

/// Store state and mutations
pub mod state;

// Re-export commonly used types
pub use config::StoreConfig;
pub use document::{
    Document, Link, Linkage, PrimaryData, Relationship, RelationshipLinks, ResourceIdentifier,
    ResourceObject,
};
pub use error::{QueryError, RecordError};
pub use record::{NormalizedRecord, RecordCollection, RecordMeta, Records, StoreShape};
pub use resolver::{Related, Resolved, ResolvedRecord};
pub use state::{ActionStatus, StatusEntry, StoreState};
