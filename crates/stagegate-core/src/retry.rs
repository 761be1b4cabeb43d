//! Retry plumbing — backoff computation, sleep injection, cancellation.
//!
//! The check loop blocks the calling thread between attempts. Both the
//! sleep and the jitter source are injected so tests can substitute a
//! no-op sleeper and a seeded RNG instead of relying on process-wide
//! state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rand::{Rng, RngCore};

/// Blocking delay used between retry attempts.
pub trait Sleeper {
    /// Block the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Default sleeper — a true blocking `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Sleeper that returns immediately, for deterministic tests.
///
/// Attempt counting and backoff computation are unchanged; only the
/// actual delay is suppressed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSleeper;

impl Sleeper for NoopSleeper {
    fn sleep(&self, _duration: Duration) {}
}

impl<S: Sleeper + ?Sized> Sleeper for Arc<S> {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

/// Compute the delay before the next retry attempt.
///
/// The delay is `1 + attempts * 2` seconds plus a uniformly random
/// jitter in `[0, random_wait_secs)`. It grows with the total attempt
/// count, not the remaining retry budget, and is computed fresh on
/// every attempt.
pub fn backoff_delay(attempts: u32, random_wait_secs: u64, rng: &mut dyn RngCore) -> Duration {
    let base = 1 + u64::from(attempts) * 2;
    let jitter = if random_wait_secs == 0 {
        0
    } else {
        rng.gen_range(0..random_wait_secs)
    };
    Duration::from_secs(base + jitter)
}

/// Cooperative cancellation flag for an in-progress check.
///
/// The engine consults the token before each evaluation and before
/// each sleep. Cancellation is optional; an engine without a token
/// runs to completion, bounded only by its retry count.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of any check holding this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
