//! Decision workflow — one rollout tick for one node.
//!
//! Loads the desired and current rollout documents keyed by the ids in
//! the node's own attributes, wires one peer-group gate per named
//! condition into a decision engine, and returns the payload the node
//! should treat as authoritative.

use std::sync::Arc;

use rand::RngCore;
use serde_json::Value;
use tracing::{debug, info};

use stagegate_core::{CheckPolicy, DecisionEngine, Evaluation, NoopSleeper, Sleeper};
use stagegate_state::{ConditionSpec, DocumentStore, RolloutDoc, StateKind, StoreError};

use crate::attr::{attribute_at, state_path};
use crate::error::{FleetError, FleetResult};
use crate::gate::PeerGroupGate;
use crate::query::{Peer, PeerQuery};

/// Per-node rollout decision wrapper.
///
/// Each node runs its own coordinator against the same documents and
/// the same fleet; convergence comes from repeated independent checks,
/// not from any shared state.
pub struct Coordinator {
    node: Peer,
    state_name: String,
    store: Arc<dyn DocumentStore>,
    fleet: Arc<dyn PeerQuery>,
    sleeper: Option<Arc<dyn Sleeper + Send + Sync>>,
    rng: Option<Box<dyn CloneRng>>,
}

impl Coordinator {
    /// Create a coordinator for one node and one named rollout state.
    pub fn new(
        node: Peer,
        state_name: impl Into<String>,
        store: Arc<dyn DocumentStore>,
        fleet: Arc<dyn PeerQuery>,
    ) -> Self {
        Self {
            node,
            state_name: state_name.into(),
            store,
            fleet,
            sleeper: None,
            rng: None,
        }
    }

    /// Replace the backoff sleeper used between retry attempts.
    pub fn with_sleeper(mut self, sleeper: impl Sleeper + Send + Sync + 'static) -> Self {
        self.sleeper = Some(Arc::new(sleeper));
        self
    }

    /// Suppress backoff sleeps (deterministic tests).
    pub fn without_sleep(self) -> Self {
        self.with_sleeper(NoopSleeper)
    }

    /// Replace the backoff jitter source (e.g. a seeded `StdRng`).
    pub fn with_rng(mut self, rng: impl RngCore + Send + Clone + 'static) -> Self {
        self.rng = Some(Box::new(rng));
        self
    }

    /// Read the release id this node records for `kind`, as the store
    /// key string. Numbers render as their bare JSON text.
    ///
    /// The id lives at `stagegate.state.<state_name>.<kind>` in the
    /// node's attributes. Missing or null ids are
    /// [`FleetError::AttributeNotFound`].
    pub fn state_id(&self, kind: StateKind) -> FleetResult<String> {
        Ok(match self.state_marker(kind)? {
            Value::String(s) => s,
            other => other.to_string(),
        })
    }

    /// The raw id value as the node records it. Only strings and
    /// numbers are valid ids.
    fn state_marker(&self, kind: StateKind) -> FleetResult<Value> {
        let path = state_path(&self.state_name, kind);
        let value = attribute_at(&self.node.attributes, &path)?;
        match value {
            Value::String(_) | Value::Number(_) => Ok(value.clone()),
            Value::Null => Err(FleetError::AttributeNotFound {
                path: path.join("."),
            }),
            _ => Err(FleetError::InvalidStateId {
                path: path.join("."),
            }),
        }
    }

    /// Decide which payload is authoritative for this node right now.
    ///
    /// Loads the desired document, then the current one. A node with
    /// no current state recorded (missing id attribute or missing
    /// document) adopts the desired payload directly, without
    /// evaluating any condition. Otherwise the desired document's
    /// conditions run through the engine under the `"or"` combinator
    /// with the document's retry policy, and the chosen payload is
    /// returned.
    pub fn check(&self) -> anyhow::Result<Value> {
        let desired_id = self.state_id(StateKind::Desired)?;
        let desired = self.store.load(&self.state_name, &desired_id)?;

        let Some(current) = self.current_doc()? else {
            info!(
                state = %self.state_name,
                node = %self.node.name,
                desired = %desired_id,
                "no current state recorded, adopting desired"
            );
            return Ok(desired.data);
        };

        let RolloutDoc {
            data: desired_data,
            conditions,
            retry_count,
            random_wait,
            ..
        } = desired;

        let mut engine = DecisionEngine::new(current.data, desired_data);
        if let Some(sleeper) = &self.sleeper {
            engine = engine.with_sleeper(sleeper.clone());
        }
        if let Some(rng) = &self.rng {
            engine = engine.with_rng(rng.clone_box());
        }

        // Gates compare against the raw current markers peers record,
        // so the target keeps the id's original JSON type; the string
        // form is only the store key.
        let target = self.state_marker(StateKind::Desired)?;
        for (name, spec) in conditions {
            debug!(condition = %name, query = %spec.query, "registering peer-group gate");
            let gate = self.gate(spec, target.clone());
            engine.condition(name, gate.into_predicate(self.fleet.clone()));
        }

        let policy = CheckPolicy {
            operator: "or".to_string(),
            retry_count,
            random_wait_secs: random_wait,
        };
        let outcome = engine.check(&policy)?;
        info!(
            state = %self.state_name,
            node = %self.node.name,
            choice = ?outcome.choice,
            detail = ?outcome.detail,
            "rollout decision resolved"
        );
        Ok(engine.into_value(outcome.choice))
    }

    /// Single-shot diagnostic pass: evaluate the desired document's
    /// conditions once under `operator`.
    ///
    /// No retries, no triggers, no value resolution — just the verdict
    /// and the per-condition detail, for inspecting why a node holds.
    pub fn evaluate(&self, operator: &str) -> anyhow::Result<Evaluation> {
        let desired_id = self.state_id(StateKind::Desired)?;
        let desired = self.store.load(&self.state_name, &desired_id)?;

        let target = self.state_marker(StateKind::Desired)?;
        let mut engine = DecisionEngine::new(Value::Null, Value::Null);
        for (name, spec) in desired.conditions {
            let gate = self.gate(spec, target.clone());
            engine.condition(name, gate.into_predicate(self.fleet.clone()));
        }
        Ok(engine.evaluate(operator)?)
    }

    fn gate(&self, spec: ConditionSpec, target: Value) -> PeerGroupGate {
        PeerGroupGate {
            query: spec.query,
            group_by: spec.attribute,
            state_name: self.state_name.clone(),
            target,
            self_name: self.node.name.clone(),
        }
    }

    /// The current document, or `None` when this node has no current
    /// state recorded yet (missing id attribute, or the id points at
    /// a document the store does not have).
    fn current_doc(&self) -> anyhow::Result<Option<RolloutDoc>> {
        let id = match self.state_id(StateKind::Current) {
            Ok(id) => id,
            Err(FleetError::AttributeNotFound { .. }) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match self.store.load(&self.state_name, &id) {
            Ok(doc) => Ok(Some(doc)),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Object-safe clonable RNG; each check hands the engine its own copy
/// so repeated checks on one coordinator stay independent.
trait CloneRng: RngCore + Send {
    fn clone_box(&self) -> Box<dyn CloneRng>;
}

impl<R: RngCore + Send + Clone + 'static> CloneRng for R {
    fn clone_box(&self) -> Box<dyn CloneRng> {
        Box::new(self.clone())
    }
}
