//! Tick Debouncing
//!
//! Change signals from the renderer arrive at arbitrary rates (every layout
//! pass during a scroll fling, for instance). The scheduler turns that stream
//! into at most one pending tick, due no earlier than `MIN_INTERVAL` after
//! the previous tick started. Signals arriving while a tick is pending are
//! absorbed; the pending tick reads the list when it fires, so it always
//! reflects the latest state.
//!
//! The scheduler only does the bookkeeping. The owner task awaits
//! [`TickScheduler::deadline`] and calls [`TickScheduler::begin_tick`] when it
//! runs the tick.

use std::time::Duration;

use tokio::time::Instant;

/// Default minimum spacing between two ticks
pub const MIN_REPORT_INTERVAL: Duration = Duration::from_millis(500);

/// Single-pending-tick debounce state
#[derive(Clone, Debug)]
pub struct TickScheduler {
    min_interval: Duration,
    last_tick: Option<Instant>,
    pending: Option<Instant>,
    coalesced: u64,
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new(MIN_REPORT_INTERVAL)
    }
}

impl TickScheduler {
    /// Create a scheduler with the given minimum interval
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_tick: None,
            pending: None,
            coalesced: 0,
        }
    }

    /// Record a change signal
    ///
    /// Returns the newly armed deadline, or `None` if a tick was already
    /// pending and the signal was coalesced into it. The deadline may already
    /// be in the past, in which case the tick should run immediately.
    pub fn on_signal(&mut self, now: Instant) -> Option<Instant> {
        if self.pending.is_some() {
            self.coalesced += 1;
            return None;
        }
        let due = match self.last_tick {
            Some(last) => (last + self.min_interval).max(now),
            None => now,
        };
        self.pending = Some(due);
        Some(due)
    }

    /// When the pending tick is due, if any
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending
    }

    /// Whether a tick is pending
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether the pending tick is due at `now`
    #[must_use]
    pub fn is_due(&self, now: Instant) -> bool {
        self.pending.is_some_and(|due| due <= now)
    }

    /// Mark the pending tick as running at `now`
    pub fn begin_tick(&mut self, now: Instant) {
        self.pending = None;
        self.last_tick = Some(now);
    }

    /// Drop the pending tick, returning whether there was one
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// When the last tick started
    #[must_use]
    pub fn last_tick(&self) -> Option<Instant> {
        self.last_tick
    }

    /// Number of signals absorbed into an already pending tick
    #[must_use]
    pub fn coalesced(&self) -> u64 {
        self.coalesced
    }

    /// Configured minimum interval
    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}
