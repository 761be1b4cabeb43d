//! stagegate-fleet — fleet-facing half of the staged-rollout decision.
//!
//! Builds the condition predicates the decision engine consumes: a
//! peer query is grouped by a chosen attribute into deploy groups, and
//! a node may advance when it sits in the first group or when every
//! peer in the immediately preceding group has reached the desired
//! state. Also hosts the decision workflow that wires documents, peer
//! predicates, and the engine together for one rollout tick.
//!
//! # Components
//!
//! - **`attr`** — nested attribute-path lookup over peer attributes
//! - **`query`** — `Peer`, the `PeerQuery` seam, and a static impl
//! - **`gate`** — the peer-group predicate (`PeerGroupGate`)
//! - **`workflow`** — `Coordinator`, the per-tick decision wrapper

pub mod attr;
pub mod error;
pub mod gate;
pub mod query;
pub mod workflow;

pub use attr::{attribute_at, state_path};
pub use error::{FleetError, FleetResult};
pub use gate::PeerGroupGate;
pub use query::{Peer, PeerQuery, StaticFleet};
pub use workflow::Coordinator;
