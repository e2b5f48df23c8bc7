//! Error types for the core data layer

use serde_json::Value;
use thiserror::Error;

/// Errors raised while normalizing, denormalizing or mutating records
#[derive(Debug, Error)]
pub enum RecordError {
    /// Resource type and id could not be determined from the input
    ///
    /// Fatal to the single operation that raised it; the store is left
    /// untouched. Carries the offending value for diagnostics.
    #[error("unable to determine resource type and id from: {value}")]
    Unidentifiable {
        /// The value the operation could not identify
        value: Value,
    },

    /// A flattened record value is missing its reserved metadata block
    #[error("record is missing the `{reserved_key}` metadata block: {value}")]
    MissingMeta {
        /// The configured reserved key that was expected
        reserved_key: String,
        /// The offending value
        value: Value,
    },

    /// A flattened record value is not a JSON object
    #[error("record is not a JSON object: {value}")]
    NotAnObject {
        /// The offending value
        value: Value,
    },
}

/// Errors raised by the filtering accessor
#[derive(Debug, Error)]
pub enum QueryError {
    /// The JSONPath expression failed to parse or evaluate
    #[error("JSONPath query `{query}` failed: {reason}")]
    BadQuery {
        /// The offending expression
        query: String,
        /// Parser/evaluator message
        reason: String,
    },
}
