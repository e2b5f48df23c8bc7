//! Error types for the action orchestrator

use crate::transport::TransportError;
use jsonapi_store_core::error::{QueryError, RecordError};
use thiserror::Error;

/// Errors raised by orchestrated actions
///
/// Every failing action records status `ERROR` for its sequence id before
/// the error propagates; errors are never retried and never swallowed.
/// Transport failures are re-raised unchanged (transparent wrapping, no
/// enrichment).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Type and id could not be determined, or a record was malformed
    #[error(transparent)]
    Record(#[from] RecordError),

    /// A requested relationship does not exist on the root record
    #[error("relationship `{relationship}` not found on {resource}")]
    MissingRelationship {
        /// The root resource, as `type/id`
        resource: String,
        /// The relationship name that was requested
        relationship: String,
    },

    /// The transport failed; the original error, unenriched
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A filtering accessor was given a bad query
    #[error(transparent)]
    Query(#[from] QueryError),
}
