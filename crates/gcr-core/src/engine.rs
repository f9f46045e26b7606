//! The generation-critique-revision control loop.
//!
//! One [`GcrEngine::run`] drives a single unit through
//! `Init → Generating → Critiquing → {Accepted | Revising | Exhausted | Fatal | Cancelled}`,
//! with `Revising` looping back to `Generating`. Generator and critic calls
//! strictly alternate. Only quality rejections drive the loop: a collaborator
//! that cannot run ends the unit immediately and is never retried.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, Instrument};

use crate::collaborator::{Critic, Generator};
use crate::domain::{
    Artifact, ConfigError, CritiqueFailure, CritiqueResult, FailureReason, Outcome,
    OutcomeStatus, Result, RevisionGuidance, Spec, Verdict,
};
use crate::metrics::METRICS;
use crate::obs::{
    emit_attempt_critiqued, emit_attempt_generated, emit_collaborator_failed, emit_unit_finished,
    emit_unit_started, unit_span,
};
use crate::scoring::ScoringProfile;
use crate::store::ArtifactStore;
use crate::threshold::ThresholdPolicy;

/// Guidance line used when the critic rejects without saying why.
pub const UNEXPLAINED_REVISION: &str = "critic requested revision without guidance";

fn default_max_attempts() -> u32 {
    3
}

/// Per-run policy: attempt budget, threshold schedule, best-effort acceptance
/// and the optional declared weighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Accept the best artifact seen when the budget runs out instead of
    /// failing the unit.
    #[serde(default)]
    pub best_effort_allowed: bool,

    #[serde(default)]
    pub threshold: ThresholdPolicy,

    /// When set, the engine recomputes every overall score from these weights.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scoring: Option<ScoringProfile>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            best_effort_allowed: false,
            threshold: ThresholdPolicy::default(),
            scoring: None,
        }
    }
}

impl RunConfig {
    pub fn new(max_attempts: u32, threshold: ThresholdPolicy) -> Self {
        Self {
            max_attempts,
            threshold,
            ..Self::default()
        }
    }

    pub fn best_effort(mut self, allowed: bool) -> Self {
        self.best_effort_allowed = allowed;
        self
    }

    pub fn with_scoring(mut self, profile: ScoringProfile) -> Self {
        self.scoring = Some(profile);
        self
    }

    /// Threshold policy and scoring profile validate themselves on
    /// construction; only the attempt budget is left to check.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroMaxAttempts);
        }
        Ok(())
    }
}

/// Engine states. `Accepted`, `Exhausted`, `Fatal` and `Cancelled` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Init,
    Generating,
    Critiquing,
    Revising,
    Accepted,
    Exhausted,
    Fatal,
    Cancelled,
}

impl EngineState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Accepted | Self::Exhausted | Self::Fatal | Self::Cancelled
        )
    }
}

/// A critique after the engine has re-derived its verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct GateDecision {
    pub critique: CritiqueResult,
    /// Schema gate, threshold, zero veto and floor all satisfied. The
    /// critic's own verdict is not part of this.
    pub cleared: bool,
}

/// Re-derive a critique's verdict from the engine's own gates.
///
/// - a failed schema gate forces the overall score to 0;
/// - with a scoring profile the overall score is recomputed from the
///   declared weights, and a missing declared dimension is a critic failure;
/// - a zero in any dimension, a dimension under the floor, or an overall
///   score under `required` forces `RevisionRequired`.
///
/// A critic's `RevisionRequired` is never upgraded to `Pass`. Findings are
/// appended to the revision guidance whenever the result is a rejection, and
/// guidance is cleared on a pass. A rejection never leaves guidance empty.
pub fn normalize_critique(
    mut critique: CritiqueResult,
    required: f64,
    policy: &ThresholdPolicy,
    scoring: Option<&ScoringProfile>,
) -> std::result::Result<GateDecision, CritiqueFailure> {
    if !critique.schema_gate_passed {
        critique.overall_score = 0.0;
        critique.verdict = Verdict::RevisionRequired;
        if critique.revision_guidance.is_empty() {
            critique
                .revision_guidance
                .push("artifact failed the schema gate".to_string());
        }
        return Ok(GateDecision {
            critique,
            cleared: false,
        });
    }

    for d in &critique.dimensions {
        if !d.score.is_finite() || !(0.0..=1.0).contains(&d.score) {
            return Err(CritiqueFailure::new(format!(
                "dimension {} has invalid score {}",
                d.name, d.score
            )));
        }
    }

    if let Some(profile) = scoring {
        critique.overall_score = profile.aggregate(&critique).map_err(|missing| {
            CritiqueFailure::new(format!("critique omitted declared dimension {missing}"))
        })?;
    } else if !critique.overall_score.is_finite() || !(0.0..=1.0).contains(&critique.overall_score)
    {
        return Err(CritiqueFailure::new(format!(
            "invalid overall score {}",
            critique.overall_score
        )));
    }

    let mut findings: Vec<String> = critique
        .zero_dimensions()
        .map(|d| format!("dimension {} scored 0", d.name))
        .collect();
    if let Some(floor) = policy.dimension_floor() {
        findings.extend(
            critique
                .dimensions
                .iter()
                .filter(|d| !d.is_zero() && d.score < floor)
                .map(|d| format!("dimension {} scored {:.2}, below floor {:.2}", d.name, d.score, floor)),
        );
    }
    if critique.overall_score < required {
        findings.push(format!(
            "overall score {:.2} below required {:.2}",
            critique.overall_score, required
        ));
    }

    let cleared = findings.is_empty();
    if !cleared {
        critique.verdict = Verdict::RevisionRequired;
    }

    match critique.verdict {
        Verdict::Pass => critique.revision_guidance.clear(),
        Verdict::RevisionRequired => {
            for finding in findings {
                if !critique.revision_guidance.contains(&finding) {
                    critique.revision_guidance.push(finding);
                }
            }
            if critique.revision_guidance.is_empty() {
                critique
                    .revision_guidance
                    .push(UNEXPLAINED_REVISION.to_string());
            }
        }
    }

    Ok(GateDecision { critique, cleared })
}

enum Termination {
    Accepted,
    BestEffort,
    Failed(FailureReason),
}

/// Drives one unit at a time through the generation-critique-revision loop.
///
/// Cheap to share behind an `Arc`; runs hold no engine-level mutable state.
pub struct GcrEngine {
    generator: Arc<dyn Generator>,
    critic: Arc<dyn Critic>,
    config: RunConfig,
}

impl GcrEngine {
    /// Validates `config` up front so a broken policy never reaches a unit.
    pub fn new(
        generator: Arc<dyn Generator>,
        critic: Arc<dyn Critic>,
        config: RunConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            generator,
            critic,
            config,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run one unit to a terminal outcome.
    pub async fn run(&self, spec: &Spec) -> Outcome {
        self.run_with_cancel(spec, &CancellationToken::new()).await
    }

    /// Run one unit, checking `cancel` before every generator call.
    ///
    /// In-flight collaborator calls are allowed to finish; the cancellation
    /// takes effect at the top of the next iteration.
    pub async fn run_with_cancel(&self, spec: &Spec, cancel: &CancellationToken) -> Outcome {
        self.drive(spec, cancel)
            .instrument(unit_span(&spec.id, &spec.kind))
            .await
    }

    async fn drive(&self, spec: &Spec, cancel: &CancellationToken) -> Outcome {
        let started_at = Utc::now();
        let max_attempts = self.config.max_attempts;
        let policy = &self.config.threshold;

        emit_unit_started(&spec.id, max_attempts, self.config.best_effort_allowed);
        METRICS.inc_units_started();

        let mut store = ArtifactStore::new();
        let mut state = EngineState::Init;
        let mut prior: Option<Artifact> = None;
        let mut guidance: Option<RevisionGuidance> = None;
        let mut attempt = 1u32;
        let mut attempts_used = 0u32;

        let termination = loop {
            if cancel.is_cancelled() {
                transition(&spec.id, &mut state, EngineState::Cancelled);
                break Termination::Failed(FailureReason::Cancelled);
            }

            transition(&spec.id, &mut state, EngineState::Generating);
            attempts_used = attempt;
            METRICS.inc_attempts();
            let required = policy.required_threshold(attempt);

            let content = match self
                .generator
                .generate(spec, prior.as_ref(), guidance.as_ref())
                .await
            {
                Ok(content) => content,
                Err(e) => {
                    emit_collaborator_failed(&spec.id, "generator", attempt, &e.reason);
                    transition(&spec.id, &mut state, EngineState::Fatal);
                    break Termination::Failed(FailureReason::Generation {
                        attempt,
                        reason: e.reason,
                    });
                }
            };
            let artifact = Artifact::new(content, attempt);
            store.append(artifact.clone(), required);
            emit_attempt_generated(&spec.id, attempt, guidance.as_ref().map(|g| g.strategy));

            transition(&spec.id, &mut state, EngineState::Critiquing);
            let decision = match self.critic.critique(&artifact, spec).await {
                Ok(raw) => normalize_critique(raw, required, policy, self.config.scoring.as_ref()),
                Err(e) => Err(e),
            };
            let decision = match decision {
                Ok(decision) => decision,
                Err(e) => {
                    emit_collaborator_failed(&spec.id, "critic", attempt, &e.reason);
                    transition(&spec.id, &mut state, EngineState::Fatal);
                    break Termination::Failed(FailureReason::Critique {
                        attempt,
                        reason: e.reason,
                    });
                }
            };

            let passed = decision.critique.is_pass();
            emit_attempt_critiqued(
                &spec.id,
                attempt,
                decision.critique.overall_score,
                required,
                passed,
            );
            let next_guidance = RevisionGuidance::from_critique(&decision.critique);
            store.record_critique(decision.critique, decision.cleared);

            if passed {
                transition(&spec.id, &mut state, EngineState::Accepted);
                break Termination::Accepted;
            }

            if attempt >= max_attempts {
                if self.config.best_effort_allowed {
                    transition(&spec.id, &mut state, EngineState::Accepted);
                    break Termination::BestEffort;
                }
                transition(&spec.id, &mut state, EngineState::Exhausted);
                break Termination::Failed(FailureReason::Exhausted { attempts: attempt });
            }

            transition(&spec.id, &mut state, EngineState::Revising);
            attempt += 1;
            prior = Some(artifact);
            guidance = Some(next_guidance);
        };

        let outcome = self.finish(spec, store, termination, attempts_used, started_at);
        emit_unit_finished(
            &outcome.unit_id,
            outcome.status,
            outcome.attempts_used,
            outcome.duration_ms(),
        );
        METRICS.record_outcome(&outcome);
        outcome
    }

    fn finish(
        &self,
        spec: &Spec,
        store: ArtifactStore,
        termination: Termination,
        attempts_used: u32,
        started_at: chrono::DateTime<Utc>,
    ) -> Outcome {
        let (status, final_artifact, final_critique, failure, warnings) = match termination {
            Termination::Accepted => {
                let last = store.history().last();
                (
                    OutcomeStatus::Accepted,
                    last.map(|r| r.artifact.clone()),
                    last.and_then(|r| r.critique.clone()),
                    None,
                    Vec::new(),
                )
            }
            Termination::BestEffort => match store.best() {
                Some(best) => {
                    let mut warnings = vec![format!(
                        "accepted attempt {} of {} below the acceptance bar after the attempt budget was exhausted",
                        best.attempt(),
                        attempts_used
                    )];
                    if let Some(critique) = &best.critique {
                        warnings.extend(critique.revision_guidance.iter().cloned());
                    }
                    (
                        OutcomeStatus::AcceptedWithWarnings,
                        Some(best.artifact.clone()),
                        best.critique.clone(),
                        None,
                        warnings,
                    )
                }
                None => (
                    OutcomeStatus::Failed,
                    None,
                    None,
                    Some(FailureReason::Exhausted {
                        attempts: attempts_used,
                    }),
                    Vec::new(),
                ),
            },
            Termination::Failed(reason) => (
                OutcomeStatus::Failed,
                None,
                store.history().iter().rev().find_map(|r| r.critique.clone()),
                Some(reason),
                Vec::new(),
            ),
        };

        Outcome {
            unit_id: spec.id.clone(),
            status,
            final_artifact,
            final_critique,
            attempts_used,
            history: store.into_history(),
            failure,
            warnings,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

fn transition(unit_id: &str, state: &mut EngineState, next: EngineState) {
    debug!(unit_id = %unit_id, from = ?*state, to = ?next, "engine transition");
    *state = next;
}
