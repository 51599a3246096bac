//! Interaction pacing.
//!
//! [`RateGate`] is the only component that sleeps for timing reasons. Every
//! paced step (yielding a result entry, retrying an extraction) acquires the
//! gate first. One gate can be shared between sessions through an `Arc` to
//! bound the total request rate of a run.

use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum, optionally jittered interval between operations.
#[derive(Debug)]
pub struct RateGate {
    interval: Duration,
    jitter: Duration,
    next_slot: Mutex<Option<Instant>>,
    acquisitions: AtomicU64,
}

impl RateGate {
    /// Create a gate with a fixed interval and no jitter.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self::with_jitter(interval, Duration::ZERO)
    }

    /// Create a gate whose interval is extended by a random offset in `[0, jitter]`.
    #[must_use]
    pub fn with_jitter(interval: Duration, jitter: Duration) -> Self {
        Self {
            interval,
            jitter,
            next_slot: Mutex::new(None),
            acquisitions: AtomicU64::new(0),
        }
    }

    /// Wait until the next slot is free.
    ///
    /// The first acquisition passes immediately. Concurrent callers are
    /// served in turn, each at least one interval after the previous one.
    /// Never fails.
    pub async fn acquire(&self) {
        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let at = next_slot.map_or(now, |slot| slot.max(now));
            *next_slot = Some(at + self.interval + self.sample_jitter());
            at
        };

        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep_until(slot).await;
    }

    /// Number of completed or in-flight acquisitions.
    #[must_use]
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }

    /// Configured base interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn sample_jitter(&self) -> Duration {
        let max_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}
