//! stagegate-core — the staged-rollout decision engine.
//!
//! Given a "current" value and a "desired" value, the engine decides
//! which of the two is authoritative right now. It evaluates a set of
//! named boolean conditions under a combinator (`and` / `or`), retries
//! with randomized backoff when the verdict is false, and dispatches
//! outcome triggers once the verdict is final.
//!
//! # Components
//!
//! - **`engine`** — `DecisionEngine` (condition registry, evaluate, check)
//! - **`retry`** — backoff computation, sleeper injection, cancellation
//! - **`error`** — `EngineError` and the crate result alias
//!
//! # Convergence model
//!
//! The engine is a single-process decision function. Fleet-wide
//! agreement comes from many nodes independently running the same
//! check against live peer state, not from coordination. The loop is
//! synchronous and blocking; callers wanting concurrency run separate
//! checks on their own threads.

pub mod engine;
pub mod error;
pub mod retry;

pub use engine::{
    CheckOutcome, CheckPolicy, Choice, Combinator, DecisionEngine, Evaluation, Predicate, Trigger,
    TriggerKind,
};
pub use error::{EngineError, EngineResult};
pub use retry::{CancelToken, NoopSleeper, Sleeper, ThreadSleeper, backoff_delay};
