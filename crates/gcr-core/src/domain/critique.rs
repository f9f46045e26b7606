//! Structured multi-dimensional verdicts produced by a critic.

use serde::{Deserialize, Serialize};

/// One named axis of quality.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DimensionScore {
    pub name: String,

    /// Score in 0.0–1.0.
    pub score: f64,

    /// Ordered list of problems found along this axis.
    #[serde(default)]
    pub issues: Vec<String>,

    #[serde(default)]
    pub notes: String,
}

impl DimensionScore {
    pub fn new(name: impl Into<String>, score: f64) -> Self {
        Self {
            name: name.into(),
            score,
            issues: Vec::new(),
            notes: String::new(),
        }
    }

    pub fn with_issue(mut self, issue: impl Into<String>) -> Self {
        self.issues.push(issue.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// A score of exactly zero is a catastrophic omission along this axis.
    pub fn is_zero(&self) -> bool {
        self.score == 0.0
    }
}

/// Pass/fail decision for one artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Pass,
    RevisionRequired,
}

/// How the next attempt should treat the prior artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    /// Preserve structure and apply guidance incrementally.
    #[default]
    Refine,
    /// Prior artifact is structurally unsound; redesign, using it only as
    /// negative context.
    Reject,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Refine => write!(f, "refine"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// Aggregate verdict for one artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CritiqueResult {
    /// Hard structural gate evaluated before any quality dimension.
    pub schema_gate_passed: bool,

    /// Dimension scores in evaluation order. Names are unique.
    #[serde(default)]
    pub dimensions: Vec<DimensionScore>,

    /// Weighted aggregate in 0.0–1.0.
    pub overall_score: f64,

    pub verdict: Verdict,

    /// Actionable guidance, empty when the verdict is `Pass`.
    #[serde(default)]
    pub revision_guidance: Vec<String>,

    #[serde(default)]
    pub strategy_hint: Strategy,
}

impl CritiqueResult {
    /// A gate-passing critique. Dimensions with a repeated name replace the
    /// earlier entry in place.
    pub fn new(dimensions: Vec<DimensionScore>, overall_score: f64, verdict: Verdict) -> Self {
        let mut result = Self {
            schema_gate_passed: true,
            dimensions: Vec::with_capacity(dimensions.len()),
            overall_score,
            verdict,
            revision_guidance: Vec::new(),
            strategy_hint: Strategy::Refine,
        };
        for d in dimensions {
            result.upsert_dimension(d);
        }
        result
    }

    /// A critique for an artifact that failed the schema gate. Dimensions are
    /// skipped and the overall score is zero.
    pub fn schema_gate_failed(reason: impl Into<String>) -> Self {
        Self {
            schema_gate_passed: false,
            dimensions: Vec::new(),
            overall_score: 0.0,
            verdict: Verdict::RevisionRequired,
            revision_guidance: vec![reason.into()],
            strategy_hint: Strategy::Reject,
        }
    }

    pub fn with_guidance(mut self, item: impl Into<String>) -> Self {
        self.revision_guidance.push(item.into());
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy_hint = strategy;
        self
    }

    pub fn is_pass(&self) -> bool {
        self.verdict == Verdict::Pass
    }

    /// Look up a dimension by name.
    pub fn dimension(&self, name: &str) -> Option<&DimensionScore> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    /// Dimensions that scored exactly zero, in evaluation order.
    pub fn zero_dimensions(&self) -> impl Iterator<Item = &DimensionScore> {
        self.dimensions.iter().filter(|d| d.is_zero())
    }

    fn upsert_dimension(&mut self, dimension: DimensionScore) {
        match self
            .dimensions
            .iter_mut()
            .find(|d| d.name == dimension.name)
        {
            Some(existing) => *existing = dimension,
            None => self.dimensions.push(dimension),
        }
    }
}

/// Guidance handed to the generator on attempts after the first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RevisionGuidance {
    pub strategy: Strategy,
    pub items: Vec<String>,
}

impl RevisionGuidance {
    pub fn from_critique(critique: &CritiqueResult) -> Self {
        Self {
            strategy: critique.strategy_hint,
            items: critique.revision_guidance.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_dimension_replaces_in_place() {
        let critique = CritiqueResult::new(
            vec![
                DimensionScore::new("coverage", 0.4),
                DimensionScore::new("accuracy", 0.9),
                DimensionScore::new("coverage", 0.7),
            ],
            0.8,
            Verdict::Pass,
        );

        assert_eq!(critique.dimensions.len(), 2);
        assert_eq!(critique.dimensions[0].name, "coverage");
        assert_eq!(critique.dimension("coverage").unwrap().score, 0.7);
    }

    #[test]
    fn test_schema_gate_failure_has_zero_overall() {
        let critique = CritiqueResult::schema_gate_failed("not a card list");
        assert!(!critique.schema_gate_passed);
        assert_eq!(critique.overall_score, 0.0);
        assert_eq!(critique.verdict, Verdict::RevisionRequired);
        assert_eq!(critique.strategy_hint, Strategy::Reject);
    }

    #[test]
    fn test_verdict_serializes_screaming_case() {
        let json = serde_json::to_string(&Verdict::RevisionRequired).unwrap();
        assert_eq!(json, "\"REVISION_REQUIRED\"");
        let strategy: Strategy = serde_json::from_str("\"REJECT\"").unwrap();
        assert_eq!(strategy, Strategy::Reject);
    }

    #[test]
    fn test_zero_dimensions_iterates_only_zeros() {
        let critique = CritiqueResult::new(
            vec![
                DimensionScore::new("coverage", 0.0),
                DimensionScore::new("clarity", 0.9),
            ],
            0.81,
            Verdict::Pass,
        );
        let zeros: Vec<&str> = critique.zero_dimensions().map(|d| d.name.as_str()).collect();
        assert_eq!(zeros, vec!["coverage"]);
    }
}
