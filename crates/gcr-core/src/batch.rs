//! Bounded-concurrency batch execution.
//!
//! Each unit runs the engine on its own tokio task with its own artifact
//! store; units share nothing mutable. A unit that fails, is cancelled or
//! panics is recorded in the report and never affects its siblings. The only
//! error a batch can return is a configuration error, raised before any unit
//! starts.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{ConfigError, Outcome, OutcomeStatus, Result, Spec};
use crate::engine::GcrEngine;
use crate::metrics::METRICS;
use crate::obs::emit_batch_finished;

/// One unit of a batch, identified by its spec id.
#[derive(Debug, Clone)]
pub struct BatchUnit {
    spec: Spec,
    cancel: CancellationToken,
}

impl BatchUnit {
    /// A unit with its own, independent cancellation token.
    pub fn new(spec: Spec) -> Self {
        Self {
            spec,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn unit_id(&self) -> &str {
        &self.spec.id
    }

    pub fn spec(&self) -> &Spec {
        &self.spec
    }

    /// Token checked by the engine before every generator call.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl From<Spec> for BatchUnit {
    fn from(spec: Spec) -> Self {
        Self::new(spec)
    }
}

/// A failed unit and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedUnit {
    pub unit_id: String,
    pub reason: String,
}

/// Final report of a batch. Every submitted unit has an outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub outcomes: BTreeMap<String, Outcome>,
    pub accepted: usize,
    pub accepted_with_warnings: usize,
    pub failed: usize,
    /// Sorted by unit id.
    pub failed_units: Vec<FailedUnit>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchReport {
    pub fn from_outcomes(
        outcomes: BTreeMap<String, Outcome>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let mut accepted = 0;
        let mut accepted_with_warnings = 0;
        let mut failed_units = Vec::new();

        for (unit_id, outcome) in &outcomes {
            match outcome.status {
                OutcomeStatus::Accepted => accepted += 1,
                OutcomeStatus::AcceptedWithWarnings => accepted_with_warnings += 1,
                OutcomeStatus::Failed => failed_units.push(FailedUnit {
                    unit_id: unit_id.clone(),
                    reason: outcome
                        .reason()
                        .unwrap_or_else(|| "unknown failure".to_string()),
                }),
            }
        }

        Self {
            batch_id: Uuid::new_v4(),
            failed: failed_units.len(),
            outcomes,
            accepted,
            accepted_with_warnings,
            failed_units,
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn outcome(&self, unit_id: &str) -> Option<&Outcome> {
        self.outcomes.get(unit_id)
    }

    /// No unit failed (warnings allowed).
    pub fn all_accepted(&self) -> bool {
        self.failed == 0
    }

    /// Every unit accepted outright, without warnings.
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.accepted_with_warnings == 0
    }

    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }
}

/// Runs the engine over many independent units.
pub struct BatchCoordinator {
    engine: Arc<GcrEngine>,
    root: CancellationToken,
}

impl BatchCoordinator {
    pub fn new(engine: Arc<GcrEngine>) -> Self {
        Self {
            engine,
            root: CancellationToken::new(),
        }
    }

    pub fn engine(&self) -> &GcrEngine {
        &self.engine
    }

    /// A unit whose token is a child of this coordinator's root, so
    /// [`BatchCoordinator::cancel_all`] reaches it. Cancelling the unit's own
    /// token affects only that unit.
    pub fn unit(&self, spec: Spec) -> BatchUnit {
        BatchUnit::new(spec).with_cancellation(self.root.child_token())
    }

    /// Cooperatively cancel every unit created through [`Self::unit`].
    pub fn cancel_all(&self) {
        self.root.cancel();
    }

    /// Run every unit with at most `concurrency_limit` in flight.
    ///
    /// Returns `Err` only for configuration problems, before any unit runs.
    /// Completion order is not guaranteed; the report is keyed by unit id.
    pub async fn run_batch(
        &self,
        units: Vec<BatchUnit>,
        concurrency_limit: usize,
    ) -> Result<BatchReport> {
        if concurrency_limit == 0 {
            return Err(ConfigError::ZeroConcurrency.into());
        }
        let mut seen = HashSet::new();
        for unit in &units {
            if !seen.insert(unit.unit_id()) {
                return Err(ConfigError::DuplicateUnit(unit.unit_id().to_string()).into());
            }
        }

        let started_at = Utc::now();
        info!(units = units.len(), concurrency_limit, "batch started");

        let sem = Arc::new(Semaphore::new(concurrency_limit));
        let mut tasks: Vec<(String, JoinHandle<Outcome>)> = Vec::with_capacity(units.len());

        for unit in units {
            let engine = Arc::clone(&self.engine);
            let sem = Arc::clone(&sem);
            let unit_id = unit.unit_id().to_string();

            let task = tokio::spawn(async move {
                let _permit = sem.acquire_owned().await.ok();
                engine.run_with_cancel(&unit.spec, &unit.cancel).await
            });
            tasks.push((unit_id, task));
        }

        let mut outcomes = BTreeMap::new();
        for (unit_id, task) in tasks {
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(unit_id = %unit_id, error = %e, "unit task did not complete");
                    let outcome = Outcome::panicked(unit_id.clone(), e.to_string());
                    METRICS.record_outcome(&outcome);
                    outcome
                }
            };
            outcomes.insert(unit_id, outcome);
        }

        let report = BatchReport::from_outcomes(outcomes, started_at);
        emit_batch_finished(
            report.len(),
            report.accepted,
            report.accepted_with_warnings,
            report.failed,
            report.duration_ms(),
        );
        METRICS.flush();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(unit_id: &str, status: OutcomeStatus) -> Outcome {
        let mut o = Outcome::panicked(unit_id, "stub");
        o.status = status;
        if status != OutcomeStatus::Failed {
            o.failure = None;
        }
        o
    }

    #[test]
    fn test_report_counts_by_status() {
        let mut outcomes = BTreeMap::new();
        outcomes.insert("a".to_string(), outcome("a", OutcomeStatus::Accepted));
        outcomes.insert(
            "b".to_string(),
            outcome("b", OutcomeStatus::AcceptedWithWarnings),
        );
        outcomes.insert("c".to_string(), outcome("c", OutcomeStatus::Failed));

        let report = BatchReport::from_outcomes(outcomes, Utc::now());
        assert_eq!(report.accepted, 1);
        assert_eq!(report.accepted_with_warnings, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failed_units[0].unit_id, "c");
        assert!(report.failed_units[0].reason.contains("stub"));
        assert!(!report.all_accepted());
        assert!(!report.is_clean());
    }

    #[test]
    fn test_unit_ids_come_from_spec() {
        let unit: BatchUnit = Spec::new("card-4", "lesson_card", serde_json::json!({})).into();
        assert_eq!(unit.unit_id(), "card-4");
        assert!(!unit.cancel_token().is_cancelled());
    }
}
