//! Global atomic counters for engine activity.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. after a batch).

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::{Outcome, OutcomeStatus};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters.
pub struct Metrics {
    units_started: AtomicU64,
    attempts: AtomicU64,
    accepted: AtomicU64,
    accepted_with_warnings: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            units_started: AtomicU64::new(0),
            attempts: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
            accepted_with_warnings: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            cancelled: AtomicU64::new(0),
        }
    }

    pub fn inc_units_started(&self) {
        self.units_started.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "units_started", "counter incremented");
    }

    /// One generator call issued.
    pub fn inc_attempts(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "attempts", "counter incremented");
    }

    /// Count a terminal outcome.
    pub fn record_outcome(&self, outcome: &Outcome) {
        let counter = match outcome.status {
            OutcomeStatus::Accepted => &self.accepted,
            OutcomeStatus::AcceptedWithWarnings => &self.accepted_with_warnings,
            OutcomeStatus::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        if outcome.is_cancelled() {
            self.cancelled.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            units_started = self.units_started(),
            attempts = self.attempts(),
            accepted = self.accepted(),
            accepted_with_warnings = self.accepted_with_warnings(),
            failed = self.failed(),
            cancelled = self.cancelled(),
        );
    }

    pub fn units_started(&self) -> u64 {
        self.units_started.load(Ordering::Relaxed)
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn accepted_with_warnings(&self) -> u64 {
        self.accepted_with_warnings.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn cancelled(&self) -> u64 {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.units_started.store(0, Ordering::Relaxed);
        self.attempts.store(0, Ordering::Relaxed);
        self.accepted.store(0, Ordering::Relaxed);
        self.accepted_with_warnings.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.cancelled.store(0, Ordering::Relaxed);
    }
}
