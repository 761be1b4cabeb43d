//! Peer query seam.
//!
//! The predicate builder needs a fresh view of the fleet on every
//! invocation. What "the fleet" is — a service registry, an inventory
//! API, a file of fixtures — belongs to the embedding application;
//! this module only defines the seam and a static implementation for
//! tests and file-driven runs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One node as seen by a peer query: an identity plus a JSON
/// attribute document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peer {
    /// Unique node identity within the fleet.
    pub name: String,
    /// Nested attribute document (grouping keys, rollout state ids).
    #[serde(default)]
    pub attributes: Value,
}

/// Queries the fleet for peers.
///
/// The query string is opaque to the decision engine; implementations
/// interpret it however their backing search mechanism does. Each call
/// must reflect live state — no caching.
pub trait PeerQuery: Send + Sync {
    /// Run `query` and return the matching peers.
    fn search(&self, query: &str) -> anyhow::Result<Vec<Peer>>;
}

/// A fixed peer set that matches every query.
#[derive(Debug, Clone, Default)]
pub struct StaticFleet {
    peers: Vec<Peer>,
}

impl StaticFleet {
    /// Create a fleet from a fixed peer list.
    pub fn new(peers: Vec<Peer>) -> Self {
        Self { peers }
    }
}

impl PeerQuery for StaticFleet {
    fn search(&self, _query: &str) -> anyhow::Result<Vec<Peer>> {
        Ok(self.peers.clone())
    }
}
