//! Per-unit artifact store: the current artifact, the running best, and the
//! append-only attempt history.
//!
//! One store belongs to exactly one unit run. Completed history entries are
//! never modified, so they can be handed to observers as-is.

use crate::domain::{Artifact, AttemptRecord, CritiqueResult};

#[derive(Debug, Default)]
pub struct ArtifactStore {
    history: Vec<AttemptRecord>,
    best: Option<usize>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly generated artifact, not yet critiqued.
    pub fn append(&mut self, artifact: Artifact, required_threshold: f64) {
        self.history.push(AttemptRecord {
            artifact,
            critique: None,
            required_threshold,
            cleared_threshold: false,
        });
    }

    /// Attach the critique to the latest artifact and update the running best.
    /// `cleared_threshold` is the engine's own gate decision for this attempt.
    ///
    /// Returns `false` if there is no artifact awaiting a critique.
    pub fn record_critique(&mut self, critique: CritiqueResult, cleared_threshold: bool) -> bool {
        let idx = match self.history.len().checked_sub(1) {
            Some(idx) if self.history[idx].critique.is_none() => idx,
            _ => return false,
        };

        let entry = &mut self.history[idx];
        entry.cleared_threshold = cleared_threshold;
        entry.critique = Some(critique);

        let better = match self.best {
            None => true,
            Some(best) => ranks_above(&self.history[idx], &self.history[best]),
        };
        if better {
            self.best = Some(idx);
        }
        true
    }

    /// Latest artifact, critiqued or not.
    pub fn current(&self) -> Option<&Artifact> {
        self.history.last().map(|r| &r.artifact)
    }

    /// Best critiqued attempt so far.
    ///
    /// Highest overall score wins. At equal score an attempt that met its own
    /// threshold ranks first, then the earliest attempt, since later revisions
    /// are not guaranteed to improve.
    pub fn best(&self) -> Option<&AttemptRecord> {
        self.best.map(|idx| &self.history[idx])
    }

    pub fn history(&self) -> &[AttemptRecord] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn into_history(self) -> Vec<AttemptRecord> {
        self.history
    }
}

/// Strict ordering: higher overall score first; at equal score an attempt
/// that met its own threshold beats one that did not. Equal candidates never
/// displace the incumbent, so the earliest wins.
fn ranks_above(candidate: &AttemptRecord, incumbent: &AttemptRecord) -> bool {
    let c = candidate.overall_score().unwrap_or(0.0);
    let i = incumbent.overall_score().unwrap_or(0.0);
    if c != i {
        return c > i;
    }
    candidate.cleared_threshold && !incumbent.cleared_threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DimensionScore, Verdict};

    fn critique(score: f64) -> CritiqueResult {
        CritiqueResult::new(
            vec![DimensionScore::new("quality", score)],
            score,
            Verdict::RevisionRequired,
        )
    }

    fn push(store: &mut ArtifactStore, attempt: u32, threshold: f64, score: f64) {
        store.append(
            Artifact::new(serde_json::json!({ "attempt": attempt }), attempt),
            threshold,
        );
        assert!(store.record_critique(critique(score), score >= threshold));
    }

    #[test]
    fn test_best_prefers_earliest_maximum() {
        let mut store = ArtifactStore::new();
        push(&mut store, 1, 0.9, 0.6);
        push(&mut store, 2, 0.9, 0.7);
        push(&mut store, 3, 0.9, 0.7);
        push(&mut store, 4, 0.9, 0.5);

        assert_eq!(store.best().unwrap().attempt(), 2);
        assert_eq!(store.current().unwrap().attempt_number, 4);
    }

    #[test]
    fn test_best_prefers_threshold_clearing_attempt() {
        let mut store = ArtifactStore::new();
        push(&mut store, 1, 0.85, 0.79);
        push(&mut store, 2, 0.78, 0.79);
        assert_eq!(store.best().unwrap().attempt(), 2);
        assert!(store.best().unwrap().cleared_threshold);
    }

    #[test]
    fn test_higher_score_beats_later_cleared_attempt() {
        let mut store = ArtifactStore::new();
        push(&mut store, 1, 0.85, 0.84);
        push(&mut store, 2, 0.78, 0.785);

        assert!(store.history()[1].cleared_threshold);
        assert_eq!(store.best().unwrap().attempt(), 1);
    }

    #[test]
    fn test_critique_without_pending_artifact_is_refused() {
        let mut store = ArtifactStore::new();
        assert!(!store.record_critique(critique(0.5), false));

        push(&mut store, 1, 0.8, 0.5);
        assert!(!store.record_critique(critique(0.9), true));
        assert_eq!(store.best().unwrap().overall_score(), Some(0.5));
    }

    #[test]
    fn test_uncritiqued_artifact_is_kept_but_not_best() {
        let mut store = ArtifactStore::new();
        push(&mut store, 1, 0.8, 0.4);
        store.append(Artifact::new(serde_json::json!({}), 2), 0.8);

        assert_eq!(store.len(), 2);
        assert!(store.history()[1].critique.is_none());
        assert_eq!(store.best().unwrap().attempt(), 1);
    }
}
