//! Error taxonomy for the generation-critique-revision engine.
//!
//! Collaborator failures ([`GenerationFailure`], [`CritiqueFailure`]) are
//! unit-fatal and end up inside an `Outcome`; they never cross the batch
//! boundary as errors. [`GcrError`] is reserved for configuration mistakes
//! and audit artifact persistence.

/// The generating collaborator could not produce any artifact.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("generation failed: {reason}")]
pub struct GenerationFailure {
    pub reason: String,
}

impl GenerationFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// The evaluating collaborator could not run at all.
///
/// Distinct from an artifact that scored low, which is a normal
/// `RevisionRequired` verdict.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("critique failed: {reason}")]
pub struct CritiqueFailure {
    pub reason: String,
}

impl CritiqueFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Configuration problems detected before any unit runs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("threshold schedule must not be empty")]
    EmptySchedule,

    #[error("threshold {value} at attempt {attempt} is outside [0, 1]")]
    ThresholdOutOfRange { attempt: u32, value: f64 },

    #[error("threshold schedule increases at attempt {attempt}: {previous} -> {next}")]
    IncreasingSchedule {
        attempt: u32,
        previous: f64,
        next: f64,
    },

    #[error("threshold step {index} spans zero attempts")]
    EmptyStep { index: usize },

    #[error("dimension floor {0} is outside [0, 1]")]
    FloorOutOfRange(f64),

    #[error("scoring profile declares no dimensions")]
    EmptyProfile,

    #[error("dimension name must not be empty")]
    EmptyDimensionName,

    #[error("dimension {0} declared more than once")]
    DuplicateDimension(String),

    #[error("weight for dimension {name} must be finite and non-negative, got {weight}")]
    InvalidWeight { name: String, weight: f64 },

    #[error("dimension weights must sum to 1.0, got {sum}")]
    WeightSum { sum: f64 },

    #[error("max_attempts must be at least 1")]
    ZeroMaxAttempts,

    #[error("concurrency limit must be at least 1")]
    ZeroConcurrency,

    #[error("unit id {0} appears more than once in the batch")]
    DuplicateUnit(String),
}

/// Engine-level errors.
#[derive(Debug, thiserror::Error)]
pub enum GcrError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("artifact belongs to unit {actual}, expected {expected}")]
    UnitMismatch { expected: String, actual: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, GcrError>;
