//! Structured observability hooks for unit and batch lifecycle events.
//!
//! Events are emitted at `info!` level (warnings for collaborator failures)
//! and carry the unit id so a single unit's run can be filtered out of a
//! batch log. Verbosity follows `RUST_LOG`; see [`crate::telemetry`].

use tracing::{debug, info, warn};

use crate::domain::{OutcomeStatus, Strategy};

/// Span covering one unit's run. Attach it with
/// [`tracing::Instrument::instrument`] rather than entering it, since the
/// run awaits across collaborator calls.
///
/// ```ignore
/// run_future.instrument(unit_span("card-3", "lesson_card")).await
/// ```
pub fn unit_span(unit_id: &str, kind: &str) -> tracing::Span {
    tracing::info_span!("gcr.unit", unit_id = %unit_id, kind = %kind)
}

pub fn emit_unit_started(unit_id: &str, max_attempts: u32, best_effort: bool) {
    info!(
        event = "unit.started",
        unit_id = %unit_id,
        max_attempts = max_attempts,
        best_effort = best_effort,
    );
}

pub fn emit_attempt_generated(unit_id: &str, attempt: u32, strategy: Option<Strategy>) {
    debug!(
        event = "attempt.generated",
        unit_id = %unit_id,
        attempt = attempt,
        strategy = %strategy.map(|s| s.to_string()).unwrap_or_else(|| "initial".to_string()),
    );
}

pub fn emit_attempt_critiqued(
    unit_id: &str,
    attempt: u32,
    overall_score: f64,
    required: f64,
    passed: bool,
) {
    info!(
        event = "attempt.critiqued",
        unit_id = %unit_id,
        attempt = attempt,
        overall_score = overall_score,
        required = required,
        passed = passed,
    );
}

/// Collaborator could not run; the unit is about to fail.
pub fn emit_collaborator_failed(unit_id: &str, collaborator: &str, attempt: u32, reason: &str) {
    warn!(
        event = "collaborator.failed",
        unit_id = %unit_id,
        collaborator = collaborator,
        attempt = attempt,
        reason = %reason,
    );
}

pub fn emit_unit_finished(unit_id: &str, status: OutcomeStatus, attempts_used: u32, duration_ms: u64) {
    info!(
        event = "unit.finished",
        unit_id = %unit_id,
        status = %status,
        attempts_used = attempts_used,
        duration_ms = duration_ms,
    );
}

pub fn emit_batch_finished(units: usize, accepted: usize, with_warnings: usize, failed: usize, duration_ms: u64) {
    info!(
        event = "batch.finished",
        units = units,
        accepted = accepted,
        accepted_with_warnings = with_warnings,
        failed = failed,
        duration_ms = duration_ms,
    );
}
