//! Collaborator adapters.
//!
//! Timeouts belong here, not in the engine: an elapsed call is reported as an
//! ordinary [`GenerationFailure`] / [`CritiqueFailure`] and ends the unit like
//! any other collaborator failure.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::collaborator::{Critic, Generator};
use crate::domain::{
    Artifact, CritiqueFailure, CritiqueResult, GenerationFailure, RevisionGuidance, Spec,
};

/// Bounds every `generate` call of the wrapped generator.
#[derive(Debug, Clone)]
pub struct TimeoutGenerator<G> {
    inner: G,
    timeout: Duration,
}

impl<G> TimeoutGenerator<G> {
    pub fn new(inner: G, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn into_inner(self) -> G {
        self.inner
    }
}

#[async_trait]
impl<G: Generator> Generator for TimeoutGenerator<G> {
    async fn generate(
        &self,
        spec: &Spec,
        prior: Option<&Artifact>,
        guidance: Option<&RevisionGuidance>,
    ) -> Result<serde_json::Value, GenerationFailure> {
        match tokio::time::timeout(self.timeout, self.inner.generate(spec, prior, guidance)).await
        {
            Ok(result) => result,
            Err(_) => {
                warn!(unit_id = %spec.id, timeout_ms = self.timeout.as_millis() as u64, "generator call timed out");
                Err(GenerationFailure::new(format!(
                    "generator timed out after {}ms",
                    self.timeout.as_millis()
                )))
            }
        }
    }
}

/// Bounds every `critique` call of the wrapped critic.
#[derive(Debug, Clone)]
pub struct TimeoutCritic<C> {
    inner: C,
    timeout: Duration,
}

impl<C> TimeoutCritic<C> {
    pub fn new(inner: C, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn into_inner(self) -> C {
        self.inner
    }
}

#[async_trait]
impl<C: Critic> Critic for TimeoutCritic<C> {
    async fn critique(
        &self,
        artifact: &Artifact,
        spec: &Spec,
    ) -> Result<CritiqueResult, CritiqueFailure> {
        match tokio::time::timeout(self.timeout, self.inner.critique(artifact, spec)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(unit_id = %spec.id, timeout_ms = self.timeout.as_millis() as u64, "critic call timed out");
                Err(CritiqueFailure::new(format!(
                    "critic timed out after {}ms",
                    self.timeout.as_millis()
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DimensionScore, Verdict};

    struct SlowGenerator(Duration);

    #[async_trait]
    impl Generator for SlowGenerator {
        async fn generate(
            &self,
            _spec: &Spec,
            _prior: Option<&Artifact>,
            _guidance: Option<&RevisionGuidance>,
        ) -> Result<serde_json::Value, GenerationFailure> {
            tokio::time::sleep(self.0).await;
            Ok(serde_json::json!({ "slow": true }))
        }
    }

    struct SlowCritic(Duration);

    #[async_trait]
    impl Critic for SlowCritic {
        async fn critique(
            &self,
            _artifact: &Artifact,
            _spec: &Spec,
        ) -> Result<CritiqueResult, CritiqueFailure> {
            tokio::time::sleep(self.0).await;
            Ok(CritiqueResult::new(
                vec![DimensionScore::new("quality", 1.0)],
                1.0,
                Verdict::Pass,
            ))
        }
    }

    fn spec() -> Spec {
        Spec::new("card-1", "lesson_card", serde_json::json!({}))
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_generation_becomes_failure() {
        let generator =
            TimeoutGenerator::new(SlowGenerator(Duration::from_secs(30)), Duration::from_secs(5));
        let err = generator.generate(&spec(), None, None).await.unwrap_err();
        assert!(err.reason.contains("timed out after 5000ms"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_generation_passes_through() {
        let generator =
            TimeoutGenerator::new(SlowGenerator(Duration::from_millis(10)), Duration::from_secs(5));
        let content = generator.generate(&spec(), None, None).await.unwrap();
        assert_eq!(content["slow"], true);
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_critique_becomes_failure() {
        let critic = TimeoutCritic::new(SlowCritic(Duration::from_secs(60)), Duration::from_secs(1));
        let artifact = Artifact::new(serde_json::json!({}), 1);
        let err = critic.critique(&artifact, &spec()).await.unwrap_err();
        assert!(err.reason.contains("critic timed out"));
    }
}
