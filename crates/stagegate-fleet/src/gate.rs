//! Peer-group gate — the staged-rollout condition predicate.
//!
//! Peers are bucketed into deploy groups by a grouping attribute and
//! the groups advance in sorted order: the first group always
//! proceeds, every later group waits until the whole preceding group
//! has reached the desired state.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use stagegate_core::Predicate;
use stagegate_state::StateKind;

use crate::attr::{attribute_at, state_path};
use crate::error::FleetError;
use crate::query::PeerQuery;

/// Builds the advance/hold verdict for one named condition.
///
/// Invoking the gate re-queries the fleet, so every retry attempt of a
/// check sees live peer state.
#[derive(Debug, Clone)]
pub struct PeerGroupGate {
    /// Peer search query, passed through to the [`PeerQuery`].
    pub query: String,
    /// Attribute path that buckets peers into deploy groups.
    pub group_by: Vec<String>,
    /// Rollout state name whose `current` marker is inspected.
    pub state_name: String,
    /// Marker value a peer must have reached to count as done.
    pub target: Value,
    /// Identity of the calling node within the peer set.
    pub self_name: String,
}

impl PeerGroupGate {
    /// Run the peer query and decide whether the caller may advance.
    ///
    /// Peers missing the grouping attribute are skipped entirely; a
    /// peer whose current-state marker is unreadable or null counts
    /// as not-done. The caller must appear in its own query results,
    /// otherwise this is a [`FleetError::SelfNotFound`] error rather
    /// than a silent false.
    pub fn evaluate(&self, fleet: &dyn PeerQuery) -> anyhow::Result<bool> {
        let peers = fleet.search(&self.query)?;
        let current_path = state_path(&self.state_name, StateKind::Current);

        let mut groups: BTreeMap<String, BTreeMap<String, Option<Value>>> = BTreeMap::new();
        let mut my_group: Option<String> = None;

        for peer in &peers {
            let Ok(group_value) = attribute_at(&peer.attributes, &self.group_by) else {
                continue;
            };
            let key = group_key(group_value);

            let current = attribute_at(&peer.attributes, &current_path)
                .ok()
                .filter(|v| !v.is_null())
                .cloned();

            if peer.name == self.self_name {
                my_group = Some(key.clone());
            }
            groups.entry(key).or_default().insert(peer.name.clone(), current);
        }

        let my_group = my_group.ok_or_else(|| FleetError::SelfNotFound {
            name: self.self_name.clone(),
        })?;

        // The immediately preceding group in sorted key order.
        match groups.range(..my_group.clone()).next_back() {
            None => {
                debug!(group = %my_group, "first deploy group, advancing unconditionally");
                Ok(true)
            }
            Some((prev_key, prev_group)) => {
                let done = prev_group
                    .values()
                    .all(|state| state.as_ref() == Some(&self.target));
                debug!(
                    group = %my_group,
                    previous = %prev_key,
                    previous_size = prev_group.len(),
                    done,
                    "previous deploy group inspected"
                );
                Ok(done)
            }
        }
    }

    /// Adapt the gate into an engine [`Predicate`].
    pub fn into_predicate(self, fleet: Arc<dyn PeerQuery>) -> Predicate {
        Box::new(move || self.evaluate(fleet.as_ref()))
    }
}

/// Sort key for a grouping attribute value: strings sort as
/// themselves, anything else by its JSON rendering.
fn group_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Peer, StaticFleet};
    use serde_json::json;

    const STATE: &str = "test-application";

    fn peer(name: &str, group: &str, current: Value) -> Peer {
        Peer {
            name: name.to_string(),
            attributes: json!({
                "group": group,
                "stagegate": { "state": { STATE: { "current": current } } }
            }),
        }
    }

    fn gate(self_name: &str) -> PeerGroupGate {
        PeerGroupGate {
            query: "group:*".to_string(),
            group_by: vec!["group".to_string()],
            state_name: STATE.to_string(),
            target: json!("2"),
            self_name: self_name.to_string(),
        }
    }

    #[test]
    fn first_group_advances_unconditionally() {
        let fleet = StaticFleet::new(vec![
            peer("node-a", "alpha", json!("1")),
            peer("node-b", "beta", json!(null)),
            peer("node-c", "beta", json!("1")),
        ]);
        assert!(gate("node-a").evaluate(&fleet).unwrap());
    }

    #[test]
    fn later_group_advances_when_previous_group_is_done() {
        let fleet = StaticFleet::new(vec![
            peer("node-a", "alpha", json!("2")),
            peer("node-b", "alpha", json!("2")),
            peer("node-c", "beta", json!("1")),
        ]);
        assert!(gate("node-c").evaluate(&fleet).unwrap());
    }

    #[test]
    fn later_group_holds_when_any_previous_peer_lags() {
        let fleet = StaticFleet::new(vec![
            peer("node-a", "alpha", json!("2")),
            peer("node-b", "alpha", json!("1")),
            peer("node-c", "beta", json!("1")),
        ]);
        assert!(!gate("node-c").evaluate(&fleet).unwrap());
    }

    #[test]
    fn null_current_state_counts_as_not_done() {
        let fleet = StaticFleet::new(vec![
            peer("node-a", "alpha", json!(null)),
            peer("node-b", "beta", json!("1")),
        ]);
        assert!(!gate("node-b").evaluate(&fleet).unwrap());
    }

    #[test]
    fn only_the_immediately_preceding_group_matters() {
        // alpha lags, but gamma only looks at beta.
        let fleet = StaticFleet::new(vec![
            peer("node-a", "alpha", json!("1")),
            peer("node-b", "beta", json!("2")),
            peer("node-c", "gamma", json!("1")),
        ]);
        assert!(gate("node-c").evaluate(&fleet).unwrap());
    }

    #[test]
    fn peers_without_the_grouping_attribute_are_skipped() {
        let ungrouped = Peer {
            name: "node-x".to_string(),
            attributes: json!({ "fqdn": "x.example.com" }),
        };
        let fleet = StaticFleet::new(vec![
            peer("node-a", "alpha", json!("2")),
            ungrouped,
            peer("node-b", "beta", json!("1")),
        ]);
        // node-x never lands in alpha, so alpha stays unanimous.
        assert!(gate("node-b").evaluate(&fleet).unwrap());
    }

    #[test]
    fn mismatched_marker_type_is_not_done() {
        // Number 2 is not the string "2".
        let fleet = StaticFleet::new(vec![
            peer("node-a", "alpha", json!(2)),
            peer("node-b", "beta", json!("1")),
        ]);
        assert!(!gate("node-b").evaluate(&fleet).unwrap());
    }

    #[test]
    fn missing_self_is_an_error() {
        let fleet = StaticFleet::new(vec![peer("node-a", "alpha", json!("2"))]);
        let err = gate("node-z").evaluate(&fleet).unwrap_err();
        let fleet_err = err.downcast_ref::<FleetError>().unwrap();
        assert!(matches!(fleet_err, FleetError::SelfNotFound { name } if name == "node-z"));
    }

    #[test]
    fn predicate_adapter_requeries_per_invocation() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct CountingFleet {
            calls: AtomicUsize,
            inner: StaticFleet,
        }

        impl PeerQuery for CountingFleet {
            fn search(&self, query: &str) -> anyhow::Result<Vec<Peer>> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                self.inner.search(query)
            }
        }

        let fleet = Arc::new(CountingFleet {
            calls: AtomicUsize::new(0),
            inner: StaticFleet::new(vec![peer("node-a", "alpha", json!("2"))]),
        });
        let mut predicate = gate("node-a").into_predicate(fleet.clone());

        assert!(predicate().unwrap());
        assert!(predicate().unwrap());
        assert_eq!(fleet.calls.load(Ordering::SeqCst), 2);
    }
}
