//! Transport boundary
//!
//! The orchestrator talks to the backend through the [`Transport`] trait: a
//! single `request -> response | error` capability. [`HttpTransport`] is
//! the provided reqwest-backed implementation; tests inject scripted
//! implementations instead. Timeouts, retries and authentication are the
//! transport's business, not this layer's.

use async_trait::async_trait;
use jsonapi_store_core::document::Document;
use reqwest::Client;
use thiserror::Error;

/// HTTP method of a transport request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Patch => write!(f, "PATCH"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// One request handed to the transport
#[derive(Clone, Debug, PartialEq)]
pub struct TransportRequest {
    /// HTTP method
    pub method: Method,
    /// Request URL; relative paths are resolved against the transport's
    /// base URL
    pub url: String,
    /// JSON:API document body, if any
    pub document: Option<Document>,
    /// Query parameters
    pub params: Vec<(String, String)>,
    /// Extra headers
    pub headers: Vec<(String, String)>,
}

impl TransportRequest {
    /// Build a request with no body
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            document: None,
            params: Vec::new(),
            headers: Vec::new(),
        }
    }

    /// Attach a document body
    #[must_use]
    pub fn with_document(mut self, document: Document) -> Self {
        self.document = Some(document);
        self
    }

    /// Attach query parameters
    #[must_use]
    pub fn with_params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }

    /// Attach extra headers
    #[must_use]
    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }
}

/// Successful transport response
#[derive(Clone, Debug, PartialEq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Parsed JSON:API document, when the body was non-empty
    pub document: Option<Document>,
}

/// Errors surfaced by the transport
///
/// These propagate through the orchestrator unchanged: status `ERROR` is
/// recorded for the action, then the error is re-raised as-is.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Request could not be sent
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// Response body could not be parsed as a JSON:API document
    #[error("response parsing failed: {0}")]
    ResponseParseFailed(String),

    /// Server returned a non-success status
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error body from the server
        message: String,
    },
}

/// Abstract `request(config) -> response | error` capability
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one request
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] on network, protocol or decode failure.
    async fn request(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// reqwest-backed transport speaking JSON:API over HTTP
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport with the given API base URL
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let url = self.resolve_url(&request.url);
        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Patch => self.client.patch(&url),
            Method::Delete => self.client.delete(&url),
        };
        builder = builder.header("content-type", "application/vnd.api+json");
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(document) = &request.document {
            builder = builder.json(document);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(TransportError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let document = if body.trim().is_empty() {
            None
        } else {
            Some(
                serde_json::from_str::<Document>(&body)
                    .map_err(|e| TransportError::ResponseParseFailed(e.to_string()))?,
            )
        };

        Ok(TransportResponse {
            status: status.as_u16(),
            document,
        })
    }
}
