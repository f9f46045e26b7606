//! Deterministic collaborators (testing and dry runs).
//!
//! `ScriptedGenerator` and `ScriptedCritic` are keyed by unit id so a single
//! instance can serve a whole batch. Neither touches the network.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::collaborator::{Critic, Generator};
use crate::domain::{
    Artifact, CritiqueFailure, CritiqueResult, DimensionScore, GenerationFailure,
    RevisionGuidance, Spec, Strategy, Verdict,
};

/// Name of the single dimension produced by [`scored`].
pub const DEFAULT_DIMENSION: &str = "quality";

/// A gate-passing critique with one dimension carrying `score`.
pub fn scored(score: f64, verdict: Verdict) -> CritiqueResult {
    let mut critique = CritiqueResult::new(
        vec![DimensionScore::new(DEFAULT_DIMENSION, score)],
        score,
        verdict,
    );
    if verdict == Verdict::RevisionRequired {
        critique = critique.with_guidance(format!("raise {DEFAULT_DIMENSION} above {score:.2}"));
    }
    critique
}

/// One observed `generate` call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateCall {
    pub unit_id: String,
    pub attempt: u32,
    pub prior_attempt: Option<u32>,
    pub strategy: Option<Strategy>,
    pub guidance: Vec<String>,
}

/// Generator producing `{"unit": id, "attempt": n}` content.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    failures: HashMap<(String, u32), String>,
    cancellations: HashMap<(String, u32), CancellationToken>,
    delay: Option<Duration>,
    calls: Mutex<Vec<GenerateCall>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the given unit's `attempt` with `reason`.
    pub fn fail_on(mut self, unit_id: &str, attempt: u32, reason: &str) -> Self {
        self.failures
            .insert((unit_id.to_string(), attempt), reason.to_string());
        self
    }

    /// Cancel `token` while the given unit's `attempt` is in flight. The call
    /// itself still completes.
    pub fn cancel_during(mut self, unit_id: &str, attempt: u32, token: CancellationToken) -> Self {
        self.cancellations
            .insert((unit_id.to_string(), attempt), token);
        self
    }

    /// Simulated latency for every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<GenerateCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, unit_id: &str) -> Vec<GenerateCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.unit_id == unit_id)
            .collect()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(
        &self,
        spec: &Spec,
        prior: Option<&Artifact>,
        guidance: Option<&RevisionGuidance>,
    ) -> Result<serde_json::Value, GenerationFailure> {
        let attempt = prior.map(|p| p.attempt_number + 1).unwrap_or(1);
        self.calls.lock().unwrap().push(GenerateCall {
            unit_id: spec.id.clone(),
            attempt,
            prior_attempt: prior.map(|p| p.attempt_number),
            strategy: guidance.map(|g| g.strategy),
            guidance: guidance.map(|g| g.items.clone()).unwrap_or_default(),
        });

        let key = (spec.id.clone(), attempt);
        if let Some(token) = self.cancellations.get(&key) {
            token.cancel();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = self.failures.get(&key) {
            return Err(GenerationFailure::new(reason.clone()));
        }

        Ok(serde_json::json!({
            "unit": spec.id,
            "attempt": attempt,
        }))
    }
}

/// Critic replaying a per-unit sequence of critiques, indexed by attempt.
/// Attempts past the end of a script reuse its last entry.
#[derive(Debug, Default)]
pub struct ScriptedCritic {
    scripts: HashMap<String, Vec<CritiqueResult>>,
    failures: HashMap<(String, u32), String>,
    default: Option<CritiqueResult>,
    calls: Mutex<Vec<(String, u32)>>,
}

impl ScriptedCritic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, unit_id: &str, critiques: Vec<CritiqueResult>) -> Self {
        self.scripts.insert(unit_id.to_string(), critiques);
        self
    }

    /// Script plain scores. Each score passes iff it reaches `critic_bar`,
    /// the critic's own acceptance bar.
    pub fn scores(self, unit_id: &str, scores: &[f64], critic_bar: f64) -> Self {
        let critiques = scores
            .iter()
            .map(|&s| {
                let verdict = if s >= critic_bar {
                    Verdict::Pass
                } else {
                    Verdict::RevisionRequired
                };
                scored(s, verdict)
            })
            .collect();
        self.script(unit_id, critiques)
    }

    /// Critique used for units without a script.
    pub fn with_default(mut self, critique: CritiqueResult) -> Self {
        self.default = Some(critique);
        self
    }

    pub fn fail_on(mut self, unit_id: &str, attempt: u32, reason: &str) -> Self {
        self.failures
            .insert((unit_id.to_string(), attempt), reason.to_string());
        self
    }

    /// `(unit_id, attempt)` pairs in call order.
    pub fn calls(&self) -> Vec<(String, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Critic for ScriptedCritic {
    async fn critique(
        &self,
        artifact: &Artifact,
        spec: &Spec,
    ) -> Result<CritiqueResult, CritiqueFailure> {
        let attempt = artifact.attempt_number;
        self.calls.lock().unwrap().push((spec.id.clone(), attempt));

        if let Some(reason) = self.failures.get(&(spec.id.clone(), attempt)) {
            return Err(CritiqueFailure::new(reason.clone()));
        }

        match self.scripts.get(&spec.id) {
            Some(script) if !script.is_empty() => {
                let idx = (attempt.max(1) as usize - 1).min(script.len() - 1);
                Ok(script[idx].clone())
            }
            _ => self
                .default
                .clone()
                .ok_or_else(|| CritiqueFailure::new(format!("no script for unit {}", spec.id))),
        }
    }
}
