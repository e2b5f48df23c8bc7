//! # jsonapi-store Client
//!
//! Action orchestrator for the jsonapi-store cache: wraps each network
//! operation with a sequence id and a `LOADING -> SUCCESS | ERROR` status
//! lifecycle, normalizes responses through the core codec, applies them to
//! the shared store and hands back resolved relationship views.
//!
//! ## Example
//!
//! ```no_run
//! use jsonapi_store_client::ResourceStore;
//! use jsonapi_store_core::config::StoreConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = ResourceStore::from_url("https://api.example.com/v1", StoreConfig::default());
//!
//!     let handle = store.get("widgets/1");
//!     println!("action {} in flight", handle.id());
//!
//!     let widget = handle.await?;
//!     println!("resolved: {widget:?}");
//!     Ok(())
//! }
//! ```

/// Orchestrated actions and their argument shapes
pub mod actions;

/// The `ResourceStore` facade
pub mod client;

/// Error types
pub mod error;

/// Action handles and status lookup
pub mod status;

/// Transport boundary and the reqwest-backed implementation
pub mod transport;

// Re-export main types for convenience
pub use actions::{clean_patch, ActionArgs, RelatedResults, RequestOverride, Target};
pub use client::ResourceStore;
pub use error::StoreError;
pub use status::{ActionHandle, AsActionId};
pub use transport::{
    HttpTransport, Method, Transport, TransportError, TransportRequest, TransportResponse,
};
