//! # jsonapi-store Testing
//!
//! Testing utilities for the jsonapi-store data layer:
//! - [`MockTransport`]: scripted transport responses with request capture
//! - [`fixtures`]: JSON:API document builders for common test shapes
//!
//! ## Example
//!
//! ```
//! use jsonapi_store_client::ResourceStore;
//! use jsonapi_store_core::config::StoreConfig;
//! use jsonapi_store_testing::{fixtures, MockTransport};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Arc::new(MockTransport::new());
//! transport.enqueue_document(fixtures::widget_document());
//!
//! let store = ResourceStore::new(transport.clone(), StoreConfig::default());
//! store.get("widgets/1").await?;
//!
//! assert_eq!(transport.requests().len(), 1);
//! # Ok(())
//! # }
//! ```

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities panic on misuse by design

use async_trait::async_trait;
use jsonapi_store_client::transport::{
    Transport, TransportError, TransportRequest, TransportResponse,
};
use jsonapi_store_core::document::Document;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Scripted transport for orchestrator tests
///
/// Responses are served in FIFO order; every request is captured for
/// later assertion. An exhausted script yields a `RequestFailed` error,
/// which makes missing expectations loud in tests.
#[derive(Clone, Default)]
pub struct MockTransport {
    script: Arc<Mutex<VecDeque<Result<TransportResponse, TransportError>>>>,
    requests: Arc<Mutex<Vec<TransportRequest>>>,
}

impl MockTransport {
    /// Create a transport with an empty script
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw response
    pub fn enqueue(&self, response: TransportResponse) {
        self.script.lock().unwrap().push_back(Ok(response));
    }

    /// Queue a 200 response carrying a document
    pub fn enqueue_document(&self, document: Document) {
        self.enqueue(TransportResponse {
            status: 200,
            document: Some(document),
        });
    }

    /// Queue a 200 response carrying a document parsed from JSON
    pub fn enqueue_json(&self, value: serde_json::Value) {
        self.enqueue_document(serde_json::from_value(value).unwrap());
    }

    /// Queue a success response with the given status and no body
    pub fn enqueue_empty(&self, status: u16) {
        self.enqueue(TransportResponse {
            status,
            document: None,
        });
    }

    /// Queue a transport error
    pub fn enqueue_error(&self, error: TransportError) {
        self.script.lock().unwrap().push_back(Err(error));
    }

    /// All requests seen so far, in order
    #[must_use]
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Reset script and captured requests (for test isolation)
    pub fn clear(&self) {
        self.script.lock().unwrap().clear();
        self.requests.lock().unwrap().clear();
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportError::RequestFailed(
                    "mock transport script exhausted".to_string(),
                ))
            })
    }
}

/// JSON:API document builders for common test shapes
pub mod fixtures {
    use jsonapi_store_core::document::Document;
    use serde_json::json;

    /// `{data: widgets/1 {name: "foo"}}`
    #[must_use]
    pub fn widget_document() -> Document {
        serde_json::from_value(json!({
            "data": {
                "type": "widgets",
                "id": "1",
                "attributes": { "name": "foo" }
            }
        }))
        .unwrap()
    }

    /// A widgets collection with ids 1 and 2
    #[must_use]
    pub fn widget_collection_document() -> Document {
        serde_json::from_value(json!({
            "data": [
                { "type": "widgets", "id": "1", "attributes": { "name": "foo" } },
                { "type": "widgets", "id": "2", "attributes": { "name": "bar" } }
            ]
        }))
        .unwrap()
    }

    /// widgets/1 relating to people/7, with people/7 side-loaded
    #[must_use]
    pub fn widget_with_author_document() -> Document {
        serde_json::from_value(json!({
            "data": {
                "type": "widgets",
                "id": "1",
                "attributes": { "name": "foo" },
                "relationships": {
                    "author": { "data": { "type": "people", "id": "7" } }
                }
            },
            "included": [
                { "type": "people", "id": "7", "attributes": { "name": "ann" } }
            ]
        }))
        .unwrap()
    }
}
