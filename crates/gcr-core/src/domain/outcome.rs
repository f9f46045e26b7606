//! Terminal results of a unit run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::artifact::Artifact;
use super::critique::CritiqueResult;

/// Terminal status of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeStatus {
    Accepted,
    /// Attempt budget exhausted; the best artifact seen was accepted anyway.
    AcceptedWithWarnings,
    Failed,
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accepted => write!(f, "accepted"),
            Self::AcceptedWithWarnings => write!(f, "accepted_with_warnings"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Why a unit ended `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FailureReason {
    Generation { attempt: u32, reason: String },
    Critique { attempt: u32, reason: String },
    Exhausted { attempts: u32 },
    Cancelled,
    /// The unit's task panicked inside the batch coordinator.
    Panicked { detail: String },
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generation { attempt, reason } => {
                write!(f, "generation failed on attempt {attempt}: {reason}")
            }
            Self::Critique { attempt, reason } => {
                write!(f, "critique failed on attempt {attempt}: {reason}")
            }
            Self::Exhausted { attempts } => write!(
                f,
                "max attempts exhausted without meeting threshold ({attempts} attempts exhausted)"
            ),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Panicked { detail } => write!(f, "unit task panicked: {detail}"),
        }
    }
}

/// One entry of a unit's audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttemptRecord {
    pub artifact: Artifact,

    /// Normalized critique; `None` only when the critic failed on this artifact.
    pub critique: Option<CritiqueResult>,

    /// Threshold in force for this attempt.
    pub required_threshold: f64,

    /// Whether the overall score met this attempt's own threshold.
    pub cleared_threshold: bool,
}

impl AttemptRecord {
    pub fn attempt(&self) -> u32 {
        self.artifact.attempt_number
    }

    pub fn overall_score(&self) -> Option<f64> {
        self.critique.as_ref().map(|c| c.overall_score)
    }
}

/// Terminal result of one unit's run. Created once, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Outcome {
    pub unit_id: String,
    pub status: OutcomeStatus,

    /// `None` only when `status` is `Failed`.
    pub final_artifact: Option<Artifact>,

    pub final_critique: Option<CritiqueResult>,

    pub attempts_used: u32,

    /// Ordered attempt history.
    pub history: Vec<AttemptRecord>,

    pub failure: Option<FailureReason>,

    /// Shortfall reasons reported with `AcceptedWithWarnings`.
    #[serde(default)]
    pub warnings: Vec<String>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl Outcome {
    /// Outcome for a unit whose task never returned normally.
    pub fn panicked(unit_id: impl Into<String>, detail: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            unit_id: unit_id.into(),
            status: OutcomeStatus::Failed,
            final_artifact: None,
            final_critique: None,
            attempts_used: 0,
            history: Vec::new(),
            failure: Some(FailureReason::Panicked {
                detail: detail.into(),
            }),
            warnings: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(
            self.status,
            OutcomeStatus::Accepted | OutcomeStatus::AcceptedWithWarnings
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.failure, Some(FailureReason::Cancelled))
    }

    /// Human-readable failure reason, if the unit failed.
    pub fn reason(&self) -> Option<String> {
        self.failure.as_ref().map(ToString::to_string)
    }

    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }
}
