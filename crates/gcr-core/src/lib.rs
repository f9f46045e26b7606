//! Generation-critique-revision engine.
//!
//! An artifact is produced by a [`Generator`], scored by a [`Critic`] along
//! named quality dimensions, and revised until it clears a
//! [`ThresholdPolicy`] or the attempt budget runs out. [`GcrEngine`] runs one
//! unit; [`BatchCoordinator`] runs many with bounded concurrency and per-unit
//! isolation.

pub mod adapters;
pub mod batch;
pub mod collaborator;
pub mod domain;
pub mod engine;
pub mod fakes;
pub mod metrics;
pub mod obs;
pub mod reporting;
pub mod scoring;
pub mod store;
pub mod telemetry;
pub mod threshold;

pub use adapters::{TimeoutCritic, TimeoutGenerator};
pub use batch::{BatchCoordinator, BatchReport, BatchUnit, FailedUnit};
pub use collaborator::{Critic, Generator};
pub use domain::{
    Artifact, AttemptRecord, ConfigError, CritiqueFailure, CritiqueResult, DimensionScore,
    FailureReason, GcrError, GenerationFailure, Outcome, OutcomeStatus, Result,
    RevisionGuidance, Spec, Strategy, Verdict,
};
pub use engine::{
    normalize_critique, EngineState, GateDecision, GcrEngine, RunConfig, UNEXPLAINED_REVISION,
};
pub use metrics::METRICS;
pub use reporting::{
    content_digest, read_batch_report, read_outcome_artifact, write_batch_report,
    write_outcome_artifact,
};
pub use scoring::{DimensionWeight, ScoringProfile};
pub use store::ArtifactStore;
pub use telemetry::{init_tracing, init_tracing_from_env, LogFormat};
pub use threshold::{ThresholdPolicy, ThresholdPolicyConfig, ThresholdStep};

// Re-exported so callers can build cancellable units without naming tokio-util.
pub use tokio_util::sync::CancellationToken;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
