//! Error types for the document store.

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while loading rollout documents.
///
/// `NotFound` is a distinct kind so the decision workflow can
/// special-case "no current state recorded yet" and skip straight to
/// the desired value.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document with this id exists in the named bag.
    #[error("no document '{id}' in '{bag}'")]
    NotFound { bag: String, id: String },

    /// The backing storage could not be read.
    #[error("read error: {0}")]
    Io(String),

    /// The document exists but is not a valid rollout document.
    #[error("deserialization error: {0}")]
    Deserialize(String),
}
