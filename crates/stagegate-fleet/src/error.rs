//! Error types for fleet queries and attribute lookup.

use thiserror::Error;

/// Result type alias for fleet operations.
pub type FleetResult<T> = Result<T, FleetError>;

/// Errors from peer attribute handling and group resolution.
#[derive(Debug, Error)]
pub enum FleetError {
    /// A nested attribute path hit a missing key or a non-object.
    ///
    /// Distinct from other failures so call sites can choose between
    /// propagating and treating the peer as "skip"/"null".
    #[error("attribute '{path}' not found")]
    AttributeNotFound { path: String },

    /// The calling node did not appear in its own peer query.
    #[error("node '{name}' not present in its own peer query results")]
    SelfNotFound { name: String },

    /// A state id attribute exists but is not a string or number.
    #[error("state id at '{path}' is not a string or number")]
    InvalidStateId { path: String },
}
