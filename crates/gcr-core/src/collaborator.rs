//! Pluggable collaborators driven by the engine.
//!
//! Implementations wrap whatever content backend the caller uses (a remote
//! model, a rules engine, a renderer). Both calls may be long-running and are
//! awaited; the engine never runs them concurrently for the same unit.

use async_trait::async_trait;

use crate::domain::{
    Artifact, CritiqueFailure, CritiqueResult, GenerationFailure, RevisionGuidance, Spec,
};

/// Produces or revises an artifact.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce artifact content for `spec`.
    ///
    /// On the first attempt `prior` and `guidance` are `None`. Afterwards both
    /// are supplied; `guidance.strategy` says whether to patch `prior`
    /// (`Refine`) or redesign and treat it only as negative context
    /// (`Reject`).
    ///
    /// A returned [`GenerationFailure`] ends the unit; the engine does not
    /// retry it.
    async fn generate(
        &self,
        spec: &Spec,
        prior: Option<&Artifact>,
        guidance: Option<&RevisionGuidance>,
    ) -> Result<serde_json::Value, GenerationFailure>;
}

/// Evaluates one artifact.
#[async_trait]
pub trait Critic: Send + Sync {
    /// Score `artifact` against `spec`.
    ///
    /// The schema gate is evaluated first; if it fails the overall score must
    /// be 0 and dimension scoring may be skipped. A returned
    /// [`CritiqueFailure`] means evaluation could not run at all and ends the
    /// unit.
    async fn critique(
        &self,
        artifact: &Artifact,
        spec: &Spec,
    ) -> Result<CritiqueResult, CritiqueFailure>;
}
