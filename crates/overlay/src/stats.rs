//! Overlay statistics.
//!
//! Observability only; nothing reads these counters to make a decision.

use core::sync::atomic::{AtomicU32, Ordering};

/// Live counters, bumped from any context.
#[derive(Default)]
pub struct OverlayStats {
    kickoffs: AtomicU32,
    piggybacks: AtomicU32,
    coalesce_timeouts: AtomicU32,
    coalesce_preemptions: AtomicU32,
    abandoned: AtomicU32,
    cancelled_waits: AtomicU32,
}

/// Point-in-time copy of [`OverlayStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatsSnapshot {
    /// Hardware triggers issued.
    pub kickoffs: u32,
    /// Requests that rode along on an owed trigger.
    pub piggybacks: u32,
    /// Coalescing windows that ran to their deadline.
    pub coalesce_timeouts: u32,
    /// Coalescing windows fired early by a piggyback.
    pub coalesce_preemptions: u32,
    /// Update cycles dropped on allocation or format failure.
    pub abandoned: u32,
    /// Waits ended by a termination request.
    pub cancelled_waits: u32,
}

fn bump(counter: &AtomicU32) {
    // Wrapping is fine for observability counters.
    counter.fetch_add(1, Ordering::Relaxed);
}

impl OverlayStats {
    /// All counters at zero.
    pub const fn new() -> Self {
        Self {
            kickoffs: AtomicU32::new(0),
            piggybacks: AtomicU32::new(0),
            coalesce_timeouts: AtomicU32::new(0),
            coalesce_preemptions: AtomicU32::new(0),
            abandoned: AtomicU32::new(0),
            cancelled_waits: AtomicU32::new(0),
        }
    }

    pub(crate) fn kickoff(&self) {
        bump(&self.kickoffs);
    }

    pub(crate) fn piggyback(&self) {
        bump(&self.piggybacks);
    }

    pub(crate) fn coalesce_timeout(&self) {
        bump(&self.coalesce_timeouts);
    }

    pub(crate) fn coalesce_preemption(&self) {
        bump(&self.coalesce_preemptions);
    }

    pub(crate) fn abandoned(&self) {
        bump(&self.abandoned);
    }

    pub(crate) fn cancelled_wait(&self) {
        bump(&self.cancelled_waits);
    }

    /// Copy every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            kickoffs: self.kickoffs.load(Ordering::Relaxed),
            piggybacks: self.piggybacks.load(Ordering::Relaxed),
            coalesce_timeouts: self.coalesce_timeouts.load(Ordering::Relaxed),
            coalesce_preemptions: self.coalesce_preemptions.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            cancelled_waits: self.cancelled_waits.load(Ordering::Relaxed),
        }
    }
}
