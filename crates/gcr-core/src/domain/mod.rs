//! Domain models for the generation-critique-revision engine.
//!
//! - `Spec`: immutable description of one unit of work
//! - `Artifact`: one candidate output
//! - `CritiqueResult`: multi-dimensional verdict over one artifact
//! - `Outcome`: terminal result of one unit's run

pub mod artifact;
pub mod critique;
pub mod error;
pub mod outcome;
pub mod spec;

pub use artifact::Artifact;
pub use critique::{CritiqueResult, DimensionScore, RevisionGuidance, Strategy, Verdict};
pub use error::{ConfigError, CritiqueFailure, GcrError, GenerationFailure, Result};
pub use outcome::{AttemptRecord, FailureReason, Outcome, OutcomeStatus};
pub use spec::Spec;
