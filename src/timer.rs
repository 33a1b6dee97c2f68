//! Cancellable per-machine timeout slot.

use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, Sleep};

/// Deadline used when `now + duration` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// A single reusable timer, armed with the generation of the state that
/// scheduled it.
///
/// At most one timeout is pending per machine, so one `Sleep` is reset on
/// every arm instead of spawning a task per timeout. A disarmed slot never
/// completes, which disables its `select!` branch.
#[derive(Debug)]
pub(crate) struct TimeoutSlot {
    sleep: Pin<Box<Sleep>>,
    armed: Option<u64>,
}

impl TimeoutSlot {
    pub(crate) fn new() -> Self {
        Self {
            sleep: Box::pin(tokio::time::sleep_until(Instant::now())),
            armed: None,
        }
    }

    /// Schedules expiry after `duration`, replacing any pending one.
    ///
    /// Durations past the representable range are clamped to a far-future
    /// deadline.
    pub(crate) fn arm(&mut self, duration: Duration, generation: u64) {
        let now = Instant::now();
        let deadline = now
            .checked_add(duration)
            .unwrap_or_else(|| now + FAR_FUTURE);
        self.sleep.as_mut().reset(deadline);
        self.armed = Some(generation);
    }

    /// Disarms the slot, returning the generation that was pending.
    pub(crate) fn cancel(&mut self) -> Option<u64> {
        self.armed.take()
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Resolves with the armed generation once the deadline passes.
    ///
    /// Cancel-safe: dropping the future before it resolves leaves the slot
    /// armed. Pending forever while disarmed.
    pub(crate) async fn expired(&mut self) -> u64 {
        let Some(generation) = self.armed else {
            return std::future::pending().await;
        };
        self.sleep.as_mut().await;
        self.armed = None;
        generation
    }
}
