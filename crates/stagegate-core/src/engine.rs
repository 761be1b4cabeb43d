//! Decision engine — evaluates named conditions against a combinator
//! and resolves to the current or desired value.
//!
//! The engine owns the retry loop, verdict computation, and trigger
//! dispatch. Predicates are opaque callbacks; the engine performs no
//! I/O of its own.

use std::collections::BTreeMap;
use std::str::FromStr;

use rand::RngCore;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::retry::{CancelToken, Sleeper, ThreadSleeper, backoff_delay};

/// A named condition check. Invoked synchronously, once per
/// evaluation, in registration order. May perform arbitrary I/O.
pub type Predicate = Box<dyn FnMut() -> anyhow::Result<bool> + Send>;

/// An outcome callback. Invoked synchronously after the verdict is
/// final, in registration order, with no isolation between triggers.
pub type Trigger = Box<dyn FnMut() -> anyhow::Result<()> + Send>;

/// How condition results fold into a single verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// `"and"` — true iff every condition is true (vacuously true).
    All,
    /// `"or"` — true iff any condition is true (vacuously false).
    AnyOf,
}

impl FromStr for Combinator {
    type Err = EngineError;

    fn from_str(s: &str) -> EngineResult<Self> {
        match s {
            "and" => Ok(Self::All),
            "or" => Ok(Self::AnyOf),
            other => Err(EngineError::InvalidOperator(other.to_string())),
        }
    }
}

/// Which outcome a trigger fires on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    /// Fires when the final verdict is true.
    Success,
    /// Fires when the final verdict is false.
    Failure,
    /// Fires on both outcomes, after the outcome-specific triggers.
    Any,
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Any => "any",
        };
        f.write_str(s)
    }
}

impl FromStr for TriggerKind {
    type Err = EngineError;

    fn from_str(s: &str) -> EngineResult<Self> {
        match s {
            "success" => Ok(Self::Success),
            "failure" => Ok(Self::Failure),
            "any" => Ok(Self::Any),
            other => Err(EngineError::InvalidTriggerKind(other.to_string())),
        }
    }
}

/// Result of a single evaluation pass over all conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// The combinator applied to all condition results.
    pub verdict: bool,
    /// Per-condition results, keyed by condition name.
    ///
    /// Duplicate condition names overwrite earlier entries
    /// (last-write-wins); callers should use unique names.
    pub detail: BTreeMap<String, bool>,
}

/// Which of the engine's two values the check resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    /// Conditions unmet — the current value stays authoritative.
    Current,
    /// Conditions met — advance to the desired value.
    Desired,
}

/// Result of a retrying check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    /// The resolved value, as a choice between current and desired.
    pub choice: Choice,
    /// Detail map from the final evaluation attempt only.
    pub detail: BTreeMap<String, bool>,
}

/// Retry policy for [`DecisionEngine::check`].
#[derive(Debug, Clone)]
pub struct CheckPolicy {
    /// Combinator operator: `"and"` or `"or"`.
    pub operator: String,
    /// Number of retries after the first attempt. Zero means a single
    /// evaluation, no retries.
    pub retry_count: u32,
    /// Upper bound (exclusive) of the random jitter added to each
    /// backoff delay, in seconds.
    pub random_wait_secs: u64,
}

impl Default for CheckPolicy {
    fn default() -> Self {
        Self {
            operator: "and".to_string(),
            retry_count: 0,
            random_wait_secs: 60,
        }
    }
}

/// Table of outcome triggers, one ordered bucket per kind.
#[derive(Default)]
struct TriggerTable {
    success: Vec<Trigger>,
    failure: Vec<Trigger>,
    any: Vec<Trigger>,
}

impl TriggerTable {
    fn bucket_mut(&mut self, kind: TriggerKind) -> &mut Vec<Trigger> {
        match kind {
            TriggerKind::Success => &mut self.success,
            TriggerKind::Failure => &mut self.failure,
            TriggerKind::Any => &mut self.any,
        }
    }
}

/// Decides between a current and a desired value based on a set of
/// named conditions.
///
/// Created fresh per decision. Conditions and triggers persist across
/// calls, so re-invoking [`check`](Self::check) on the same instance
/// re-evaluates the same registry. The current and desired values are
/// never mutated by the engine.
pub struct DecisionEngine<T> {
    current: T,
    desired: T,
    conditions: Vec<(String, Predicate)>,
    triggers: TriggerTable,
    sleeper: Box<dyn Sleeper + Send>,
    rng: Box<dyn RngCore + Send>,
    cancel: Option<CancelToken>,
}

impl<T> DecisionEngine<T> {
    /// Create an engine over a current and a desired value.
    pub fn new(current: T, desired: T) -> Self {
        Self {
            current,
            desired,
            conditions: Vec::new(),
            triggers: TriggerTable::default(),
            sleeper: Box::new(ThreadSleeper),
            rng: Box::new(StdRng::from_entropy()),
            cancel: None,
        }
    }

    /// Replace the sleeper used between retry attempts.
    pub fn with_sleeper(mut self, sleeper: impl Sleeper + Send + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    /// Suspend sleeping entirely. Attempt counting and backoff
    /// computation are unaffected.
    pub fn without_sleep(self) -> Self {
        self.with_sleeper(crate::retry::NoopSleeper)
    }

    /// Replace the jitter source (e.g. a seeded `StdRng` in tests).
    pub fn with_rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    /// Attach a cancellation token, consulted before each evaluation
    /// and before each sleep.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The current value.
    pub fn current(&self) -> &T {
        &self.current
    }

    /// The desired value.
    pub fn desired(&self) -> &T {
        &self.desired
    }

    /// Resolve a [`Choice`] to the value it names.
    pub fn value(&self, choice: Choice) -> &T {
        match choice {
            Choice::Current => &self.current,
            Choice::Desired => &self.desired,
        }
    }

    /// Consume the engine, resolving a [`Choice`] to an owned value.
    pub fn into_value(self, choice: Choice) -> T {
        match choice {
            Choice::Current => self.current,
            Choice::Desired => self.desired,
        }
    }

    /// Register a named condition.
    ///
    /// Names are not checked for uniqueness; duplicates are legal and
    /// the detail map keeps the last result (see [`Evaluation`]).
    pub fn condition(
        &mut self,
        name: impl Into<String>,
        predicate: impl FnMut() -> anyhow::Result<bool> + Send + 'static,
    ) {
        self.conditions.push((name.into(), Box::new(predicate)));
    }

    /// Register an outcome trigger.
    pub fn trigger(
        &mut self,
        kind: TriggerKind,
        trigger: impl FnMut() -> anyhow::Result<()> + Send + 'static,
    ) {
        self.triggers.bucket_mut(kind).push(Box::new(trigger));
    }

    /// Evaluate every registered condition once, in registration
    /// order, and fold the results under `operator`.
    ///
    /// Every predicate always runs, even after the verdict is already
    /// determined; the detail map captures each condition's result so
    /// operators can see which criterion failed. An invalid operator
    /// errors before any predicate is invoked. A predicate error
    /// propagates immediately and aborts the pass.
    pub fn evaluate(&mut self, operator: &str) -> EngineResult<Evaluation> {
        let operator: Combinator = operator.parse()?;
        self.run_conditions(operator)
    }

    /// Repeatedly evaluate until the verdict is true or the retry
    /// budget is exhausted, then dispatch triggers and resolve.
    ///
    /// Evaluation runs at most `retry_count + 1` times and exactly
    /// once when `retry_count` is zero. The loop stops at the first
    /// true verdict. Between failed attempts with budget remaining it
    /// sleeps for [`backoff_delay`]. A true final verdict resolves to
    /// [`Choice::Desired`] and fires success-then-any triggers; a
    /// false one resolves to [`Choice::Current`] and fires
    /// failure-then-any.
    pub fn check(&mut self, policy: &CheckPolicy) -> EngineResult<CheckOutcome> {
        let operator: Combinator = policy.operator.parse()?;
        let mut attempts: u32 = 0;

        let evaluation = loop {
            self.ensure_live()?;
            attempts += 1;
            let remaining = i64::from(policy.retry_count) - i64::from(attempts) + 1;

            let evaluation = self.run_conditions(operator)?;
            if evaluation.verdict {
                break evaluation;
            }
            if remaining <= 0 {
                break evaluation;
            }

            let delay = backoff_delay(attempts, policy.random_wait_secs, self.rng.as_mut());
            debug!(
                attempt = attempts,
                remaining,
                delay_secs = delay.as_secs(),
                "conditions unmet, backing off"
            );
            self.ensure_live()?;
            self.sleeper.sleep(delay);
        };

        if evaluation.verdict {
            info!(attempts, "conditions met, advancing to desired");
            self.run_triggers(TriggerKind::Success)?;
            Ok(CheckOutcome {
                choice: Choice::Desired,
                detail: evaluation.detail,
            })
        } else {
            warn!(attempts, "conditions unmet, holding current");
            self.run_triggers(TriggerKind::Failure)?;
            Ok(CheckOutcome {
                choice: Choice::Current,
                detail: evaluation.detail,
            })
        }
    }

    fn run_conditions(&mut self, operator: Combinator) -> EngineResult<Evaluation> {
        let mut detail = BTreeMap::new();
        for (name, predicate) in &mut self.conditions {
            let result = predicate().map_err(|source| EngineError::Condition {
                name: name.clone(),
                source,
            })?;
            debug!(condition = %name, result, "condition evaluated");
            detail.insert(name.clone(), result);
        }

        let verdict = match operator {
            Combinator::All => detail.values().all(|v| *v),
            Combinator::AnyOf => detail.values().any(|v| *v),
        };
        Ok(Evaluation { verdict, detail })
    }

    /// Fire the outcome bucket, then the `any` bucket, in registration
    /// order. A trigger error propagates and aborts the fan-out.
    fn run_triggers(&mut self, outcome: TriggerKind) -> EngineResult<()> {
        for kind in [outcome, TriggerKind::Any] {
            for trigger in self.triggers.bucket_mut(kind) {
                trigger().map_err(|source| EngineError::Trigger { kind, source })?;
            }
        }
        Ok(())
    }

    fn ensure_live(&self) -> EngineResult<()> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(EngineError::Cancelled),
            _ => Ok(()),
        }
    }
}
