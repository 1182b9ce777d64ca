//! Per-worker admission slots.
//!
//! A job may only enter `RemoteRunning` after reserving one of its worker's
//! slots. Reservation is a single compare-and-swap, so two admissions can never
//! both observe the last free slot.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Concurrency counter for one worker.
#[derive(Debug)]
pub struct WorkerSlots {
    limit: usize,
    in_use: AtomicUsize,
}

impl WorkerSlots {
    /// Create slots for a worker allowing `limit` simultaneous fetches (at least 1).
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            in_use: AtomicUsize::new(0),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of slots currently reserved.
    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Acquire)
    }

    /// Free slots (limit - in_use).
    pub fn available(&self) -> usize {
        self.limit.saturating_sub(self.in_use())
    }

    /// Reserve one slot. Returns false when the worker is at its limit.
    pub fn try_reserve(&self) -> bool {
        let mut current = self.in_use.load(Ordering::Relaxed);
        loop {
            if current >= self.limit {
                return false;
            }
            match self.in_use.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Return one slot. Releasing with nothing reserved is a no-op.
    pub fn release(&self) {
        let _ = self
            .in_use
            .fetch_update(Ordering::AcqRel, Ordering::Relaxed, |n| n.checked_sub(1));
    }
}
