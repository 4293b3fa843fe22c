//! Single-slot round timer for Rollhouse rooms.
//!
//! A room has exactly one thing it can be waiting for at a time: the next
//! roll, or the end of a post-bust grace period. [`RoundTimer`] holds that
//! one continuation. Scheduling a new continuation cancels the old one
//! first, so a room can never end up with two roll cycles running.
//!
//! # Integration
//!
//! The timer sits inside a room actor's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         cmd = commands.recv() => { /* may call timer.schedule / cancel */ }
//!         fired = timer.wait() => { /* run the continuation */ }
//!     }
//! }
//! ```
//!
//! [`RoundTimer::wait`] is cancel-safe: if another `select!` branch wins,
//! the pending continuation stays in the slot untouched. With nothing
//! scheduled, `wait` pends forever.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::{self, Instant};
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Scheduled / fired values
// ---------------------------------------------------------------------------

/// When a scheduled continuation is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FireTime {
    /// Tokio instant the timer sleeps until.
    pub deadline: Instant,
    /// The same moment as Unix epoch milliseconds, for clients that render
    /// a countdown.
    pub epoch_ms: u64,
}

/// A continuation that came due, returned by [`RoundTimer::wait`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired<K> {
    /// What was scheduled.
    pub kind: K,
    /// Sequence number of the schedule call that produced it (starts at 1).
    pub seq: u64,
    /// How far past the deadline the timer actually woke up.
    pub late_by: Duration,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Counters for one timer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerMetrics {
    /// Calls to `schedule`.
    pub scheduled: u64,
    /// Continuations that came due and were handed out by `wait`.
    pub fired: u64,
    /// Continuations dropped by `cancel`, or replaced by a newer `schedule`.
    pub cancelled: u64,
}

// ---------------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------------

struct Slot<K> {
    kind: K,
    seq: u64,
    deadline: Instant,
}

/// Holds at most one scheduled continuation of type `K`.
pub struct RoundTimer<K> {
    slot: Option<Slot<K>>,
    next_seq: u64,
    metrics: TimerMetrics,
}

impl<K: std::fmt::Debug> RoundTimer<K> {
    /// Creates an empty timer.
    pub fn new() -> Self {
        Self {
            slot: None,
            next_seq: 1,
            metrics: TimerMetrics::default(),
        }
    }

    /// Schedules `kind` to come due after `delay`, cancelling whatever was
    /// scheduled before.
    pub fn schedule(&mut self, kind: K, delay: Duration) -> FireTime {
        if let Some(previous) = self.cancel() {
            debug!(?previous, "replaced pending continuation");
        }

        let deadline = Instant::now() + delay;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.metrics.scheduled += 1;

        trace!(seq, ?kind, delay_ms = delay.as_millis() as u64, "continuation scheduled");
        self.slot = Some(Slot { kind, seq, deadline });

        FireTime {
            deadline,
            epoch_ms: epoch_ms_after(delay),
        }
    }

    /// Drops the pending continuation, if any, and returns it.
    pub fn cancel(&mut self) -> Option<K> {
        let slot = self.slot.take()?;
        self.metrics.cancelled += 1;
        trace!(seq = slot.seq, kind = ?slot.kind, "continuation cancelled");
        Some(slot.kind)
    }

    /// Waits until the pending continuation is due and hands it out,
    /// leaving the slot empty. Pends forever while nothing is scheduled.
    pub async fn wait(&mut self) -> Fired<K> {
        let Some(deadline) = self.slot.as_ref().map(|s| s.deadline) else {
            return std::future::pending().await;
        };

        time::sleep_until(deadline).await;

        // Nothing can touch the slot while we hold `&mut self`.
        let Some(slot) = self.slot.take() else {
            return std::future::pending().await;
        };
        self.metrics.fired += 1;
        let late_by = Instant::now().saturating_duration_since(slot.deadline);
        trace!(seq = slot.seq, kind = ?slot.kind, late_ms = late_by.as_millis() as u64, "continuation fired");

        Fired {
            kind: slot.kind,
            seq: slot.seq,
            late_by,
        }
    }

    /// `true` while a continuation is scheduled.
    pub fn is_pending(&self) -> bool {
        self.slot.is_some()
    }

    /// The scheduled continuation, if any.
    pub fn pending(&self) -> Option<&K> {
        self.slot.as_ref().map(|s| &s.kind)
    }

    /// Time left until the pending continuation is due.
    pub fn remaining(&self) -> Option<Duration> {
        self.slot
            .as_ref()
            .map(|s| s.deadline.saturating_duration_since(Instant::now()))
    }

    /// Snapshot of the counters.
    pub fn metrics(&self) -> &TimerMetrics {
        &self.metrics
    }
}

impl<K: std::fmt::Debug> Default for RoundTimer<K> {
    fn default() -> Self {
        Self::new()
    }
}

fn epoch_ms_after(delay: Duration) -> u64 {
    (SystemTime::now() + delay)
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
