//! Error types for the decision engine.

use thiserror::Error;

use crate::engine::TriggerKind;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while evaluating or checking conditions.
///
/// Invalid-argument variants are raised before any predicate or
/// trigger executes. Predicate and trigger failures are not caught by
/// the engine; they abort the in-progress check and surface here with
/// the failing callback named.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The combinator operator was not `"and"` or `"or"`.
    #[error("operator must be 'and' or 'or', got '{0}'")]
    InvalidOperator(String),

    /// The trigger kind was not `"success"`, `"failure"` or `"any"`.
    #[error("trigger kind must be 'success', 'failure' or 'any', got '{0}'")]
    InvalidTriggerKind(String),

    /// The check was cancelled via its [`CancelToken`](crate::CancelToken).
    #[error("check cancelled")]
    Cancelled,

    /// A condition predicate returned an error.
    #[error("condition '{name}' failed")]
    Condition {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// An outcome trigger returned an error.
    #[error("'{kind}' trigger failed")]
    Trigger {
        kind: TriggerKind,
        #[source]
        source: anyhow::Error,
    },
}
