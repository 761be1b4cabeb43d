//! stagegate-state — rollout documents and the store that serves them.
//!
//! A rollout is described by a pair of JSON documents keyed by release
//! identifier: the "current" one and the "desired" one. Each document
//! carries an opaque payload, the named conditions gating the
//! transition, and the retry policy for the check. This crate owns
//! the document types and the [`DocumentStore`] boundary; it knows
//! nothing about condition evaluation.

pub mod error;
pub mod store;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use store::{DocumentStore, FileStore, MemoryStore};
pub use types::{ConditionSpec, RolloutDoc, StateKind};
