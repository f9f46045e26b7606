//! Declared dimension weights for one spec type.
//!
//! Weights are declared once and validated up front: names unique and
//! non-empty, weights finite and non-negative, summing to 1.0.

use serde::{Deserialize, Serialize};

use crate::domain::{ConfigError, CritiqueResult};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Weight of one named dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionWeight {
    pub name: String,
    pub weight: f64,
}

/// Validated weighting function over a fixed dimension set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DimensionWeight>", into = "Vec<DimensionWeight>")]
pub struct ScoringProfile {
    weights: Vec<DimensionWeight>,
}

impl ScoringProfile {
    pub fn new(weights: Vec<DimensionWeight>) -> Result<Self, ConfigError> {
        if weights.is_empty() {
            return Err(ConfigError::EmptyProfile);
        }

        let mut sum = 0.0;
        for (i, w) in weights.iter().enumerate() {
            if w.name.trim().is_empty() {
                return Err(ConfigError::EmptyDimensionName);
            }
            if weights[..i].iter().any(|prev| prev.name == w.name) {
                return Err(ConfigError::DuplicateDimension(w.name.clone()));
            }
            if !w.weight.is_finite() || w.weight < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    name: w.name.clone(),
                    weight: w.weight,
                });
            }
            sum += w.weight;
        }

        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightSum { sum });
        }

        Ok(Self { weights })
    }

    /// Convenience constructor from `(name, weight)` pairs.
    pub fn from_pairs(pairs: &[(&str, f64)]) -> Result<Self, ConfigError> {
        Self::new(
            pairs
                .iter()
                .map(|(name, weight)| DimensionWeight {
                    name: (*name).to_string(),
                    weight: *weight,
                })
                .collect(),
        )
    }

    pub fn dimension_names(&self) -> impl Iterator<Item = &str> {
        self.weights.iter().map(|w| w.name.as_str())
    }

    pub fn weight(&self, name: &str) -> Option<f64> {
        self.weights
            .iter()
            .find(|w| w.name == name)
            .map(|w| w.weight)
    }

    /// Weighted sum over the declared dimensions.
    ///
    /// Returns the name of the first declared dimension the critique omits.
    /// Undeclared dimensions carry no weight.
    pub fn aggregate(&self, critique: &CritiqueResult) -> Result<f64, String> {
        let mut total = 0.0;
        for w in &self.weights {
            let score = critique
                .dimension(&w.name)
                .ok_or_else(|| w.name.clone())?
                .score;
            total += w.weight * score;
        }
        Ok(total.clamp(0.0, 1.0))
    }
}

impl TryFrom<Vec<DimensionWeight>> for ScoringProfile {
    type Error = ConfigError;

    fn try_from(weights: Vec<DimensionWeight>) -> Result<Self, Self::Error> {
        Self::new(weights)
    }
}

impl From<ScoringProfile> for Vec<DimensionWeight> {
    fn from(profile: ScoringProfile) -> Self {
        profile.weights
    }
}
