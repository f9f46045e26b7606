//! Required-score policies indexed by attempt number.
//!
//! A policy is either flat (one threshold for every attempt) or progressive:
//! a non-increasing step function that relaxes as attempts accumulate, so a
//! bounded run can still terminate with an acceptable artifact. Policies are
//! validated when built, including when deserialized from configuration.

use serde::{Deserialize, Serialize};

use crate::domain::ConfigError;

/// Validated threshold policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ThresholdPolicyConfig", into = "ThresholdPolicyConfig")]
pub struct ThresholdPolicy {
    schedule: Schedule,
    dimension_floor: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
enum Schedule {
    Flat(f64),
    /// Run-length encoded; adjacent steps never share a threshold.
    Progressive(Vec<ThresholdStep>),
}

/// A run of consecutive attempts sharing one threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdStep {
    pub attempts: u32,
    pub threshold: f64,
}

/// Serialized form of a [`ThresholdPolicy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ThresholdPolicyConfig {
    Flat {
        threshold: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dimension_floor: Option<f64>,
    },
    Progressive {
        steps: Vec<ThresholdStep>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dimension_floor: Option<f64>,
    },
}

impl ThresholdPolicy {
    /// Same threshold for every attempt.
    pub fn flat(threshold: f64) -> Result<Self, ConfigError> {
        check_range(1, threshold)?;
        Ok(Self {
            schedule: Schedule::Flat(threshold),
            dimension_floor: None,
        })
    }

    /// Per-attempt schedule; `schedule[0]` applies to attempt 1 and the last
    /// value applies to every attempt past the end.
    pub fn progressive(schedule: Vec<f64>) -> Result<Self, ConfigError> {
        let steps: Vec<ThresholdStep> = schedule
            .into_iter()
            .map(|threshold| ThresholdStep {
                attempts: 1,
                threshold,
            })
            .collect();
        Self::stepped(&steps)
    }

    /// Progressive schedule from `(attempts, threshold)` steps, e.g.
    /// `[(2, 0.85), (2, 0.82), (2, 0.80), (1, 0.78)]`.
    ///
    /// Steps are kept as spans, so a step covering billions of attempts
    /// costs no more than one covering a single attempt.
    pub fn stepped(steps: &[ThresholdStep]) -> Result<Self, ConfigError> {
        if steps.is_empty() {
            return Err(ConfigError::EmptySchedule);
        }

        let mut merged: Vec<ThresholdStep> = Vec::with_capacity(steps.len());
        // First attempt covered by the current step; u64 so long spans cannot wrap.
        let mut start: u64 = 1;
        for (index, step) in steps.iter().enumerate() {
            if step.attempts == 0 {
                return Err(ConfigError::EmptyStep { index });
            }
            let attempt = attempt_number(start);
            check_range(attempt, step.threshold)?;

            start += u64::from(step.attempts);

            if let Some(last) = merged.last_mut() {
                if step.threshold > last.threshold {
                    return Err(ConfigError::IncreasingSchedule {
                        attempt,
                        previous: last.threshold,
                        next: step.threshold,
                    });
                }
                if step.threshold == last.threshold {
                    last.attempts = last.attempts.saturating_add(step.attempts);
                    continue;
                }
            }
            merged.push(*step);
        }

        Ok(Self {
            schedule: Schedule::Progressive(merged),
            dimension_floor: None,
        })
    }

    /// Require every dimension to score at least `floor`.
    pub fn with_dimension_floor(mut self, floor: f64) -> Result<Self, ConfigError> {
        if !floor.is_finite() || !(0.0..=1.0).contains(&floor) {
            return Err(ConfigError::FloorOutOfRange(floor));
        }
        self.dimension_floor = Some(floor);
        Ok(self)
    }

    /// Threshold the overall score must meet on `attempt` (1-indexed).
    ///
    /// Attempt 0 is treated as attempt 1; attempts beyond the schedule reuse
    /// its last, most relaxed value.
    pub fn required_threshold(&self, attempt: u32) -> f64 {
        match &self.schedule {
            Schedule::Flat(t) => *t,
            Schedule::Progressive(steps) => {
                let attempt = u64::from(attempt.max(1));
                let mut end = 0u64;
                let mut last = 0.0;
                for step in steps {
                    end += u64::from(step.attempts);
                    last = step.threshold;
                    if attempt <= end {
                        break;
                    }
                }
                last
            }
        }
    }

    pub fn dimension_floor(&self) -> Option<f64> {
        self.dimension_floor
    }

    pub fn is_flat(&self) -> bool {
        matches!(self.schedule, Schedule::Flat(_))
    }
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            schedule: Schedule::Flat(0.80),
            dimension_floor: None,
        }
    }
}

fn attempt_number(start: u64) -> u32 {
    u32::try_from(start).unwrap_or(u32::MAX)
}

fn check_range(attempt: u32, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ThresholdOutOfRange { attempt, value })
    }
}

impl TryFrom<ThresholdPolicyConfig> for ThresholdPolicy {
    type Error = ConfigError;

    fn try_from(config: ThresholdPolicyConfig) -> Result<Self, Self::Error> {
        let (policy, floor) = match config {
            ThresholdPolicyConfig::Flat {
                threshold,
                dimension_floor,
            } => (Self::flat(threshold)?, dimension_floor),
            ThresholdPolicyConfig::Progressive {
                steps,
                dimension_floor,
            } => (Self::stepped(&steps)?, dimension_floor),
        };
        match floor {
            Some(f) => policy.with_dimension_floor(f),
            None => Ok(policy),
        }
    }
}

impl From<ThresholdPolicy> for ThresholdPolicyConfig {
    fn from(policy: ThresholdPolicy) -> Self {
        match policy.schedule {
            Schedule::Flat(threshold) => Self::Flat {
                threshold,
                dimension_floor: policy.dimension_floor,
            },
            Schedule::Progressive(steps) => Self::Progressive {
                steps,
                dimension_floor: policy.dimension_floor,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lesson_schedule() -> ThresholdPolicy {
        ThresholdPolicy::stepped(&[
            ThresholdStep {
                attempts: 2,
                threshold: 0.85,
            },
            ThresholdStep {
                attempts: 2,
                threshold: 0.82,
            },
            ThresholdStep {
                attempts: 2,
                threshold: 0.80,
            },
            ThresholdStep {
                attempts: 1,
                threshold: 0.78,
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_flat_is_constant() {
        let policy = ThresholdPolicy::flat(0.8).unwrap();
        assert_eq!(policy.required_threshold(1), 0.8);
        assert_eq!(policy.required_threshold(50), 0.8);
        assert!(policy.is_flat());
    }

    #[test]
    fn test_stepped_lookup_is_one_indexed() {
        let policy = lesson_schedule();
        assert_eq!(policy.required_threshold(1), 0.85);
        assert_eq!(policy.required_threshold(2), 0.85);
        assert_eq!(policy.required_threshold(3), 0.82);
        assert_eq!(policy.required_threshold(6), 0.80);
        assert_eq!(policy.required_threshold(7), 0.78);
    }

    #[test]
    fn test_attempts_past_schedule_reuse_last_value() {
        let policy = lesson_schedule();
        assert_eq!(policy.required_threshold(8), 0.78);
        assert_eq!(policy.required_threshold(1_000), 0.78);
    }

    #[test]
    fn test_attempt_zero_maps_to_first() {
        let policy = lesson_schedule();
        assert_eq!(policy.required_threshold(0), 0.85);
    }

    #[test]
    fn test_increasing_schedule_rejected() {
        let err = ThresholdPolicy::progressive(vec![0.80, 0.80, 0.85]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::IncreasingSchedule {
                attempt: 3,
                previous: 0.80,
                next: 0.85
            }
        );
    }

    #[test]
    fn test_out_of_range_and_empty_rejected() {
        assert!(matches!(
            ThresholdPolicy::flat(1.2),
            Err(ConfigError::ThresholdOutOfRange { .. })
        ));
        assert!(matches!(
            ThresholdPolicy::flat(f64::NAN),
            Err(ConfigError::ThresholdOutOfRange { .. })
        ));
        assert_eq!(
            ThresholdPolicy::progressive(vec![]).unwrap_err(),
            ConfigError::EmptySchedule
        );
        assert_eq!(
            ThresholdPolicy::stepped(&[ThresholdStep {
                attempts: 0,
                threshold: 0.5
            }])
            .unwrap_err(),
            ConfigError::EmptyStep { index: 0 }
        );
    }

    #[test]
    fn test_floor_validated() {
        let policy = ThresholdPolicy::flat(0.7).unwrap();
        assert!(policy.clone().with_dimension_floor(-0.1).is_err());
        let policy = policy.with_dimension_floor(0.4).unwrap();
        assert_eq!(policy.dimension_floor(), Some(0.4));
    }

    #[test]
    fn test_serde_compresses_steps() {
        let policy = lesson_schedule();
        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(json["shape"], "progressive");
        assert_eq!(json["steps"].as_array().unwrap().len(), 4);

        let back: ThresholdPolicy = serde_json::from_value(json).unwrap();
        assert_eq!(back, policy);
    }

    #[test]
    fn test_deserialize_runs_validation() {
        let json = serde_json::json!({
            "shape": "progressive",
            "steps": [
                { "attempts": 1, "threshold": 0.7 },
                { "attempts": 1, "threshold": 0.9 }
            ]
        });
        let err = serde_json::from_value::<ThresholdPolicy>(json).unwrap_err();
        assert!(err.to_string().contains("increases"));
    }

    #[test]
    fn test_huge_spans_stay_compact() {
        let json = serde_json::json!({
            "shape": "progressive",
            "steps": [
                { "attempts": u32::MAX, "threshold": 0.9 },
                { "attempts": u32::MAX, "threshold": 0.7 }
            ]
        });
        let policy: ThresholdPolicy = serde_json::from_value(json).unwrap();

        assert_eq!(policy.required_threshold(1), 0.9);
        assert_eq!(policy.required_threshold(u32::MAX), 0.9);
        assert_eq!(
            serde_json::to_value(&policy).unwrap()["steps"]
                .as_array()
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn test_equal_adjacent_steps_merge() {
        let policy = ThresholdPolicy::progressive(vec![0.9, 0.9, 0.8, 0.8, 0.8]).unwrap();
        let merged = ThresholdPolicy::stepped(&[
            ThresholdStep {
                attempts: 2,
                threshold: 0.9,
            },
            ThresholdStep {
                attempts: 3,
                threshold: 0.8,
            },
        ])
        .unwrap();
        assert_eq!(policy, merged);
        assert_eq!(policy.required_threshold(3), 0.8);
    }
}
