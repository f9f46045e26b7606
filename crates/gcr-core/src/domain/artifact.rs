//! Candidate outputs produced by a generator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One candidate output.
///
/// The generator supplies only `content`; the engine stamps the identifier,
/// attempt number and timestamp. Artifacts are superseded on revision, never
/// mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artifact {
    pub artifact_id: Uuid,

    /// Opaque payload.
    pub content: serde_json::Value,

    /// 1-based attempt that produced this artifact.
    pub attempt_number: u32,

    pub produced_at: DateTime<Utc>,
}

impl Artifact {
    pub fn new(content: serde_json::Value, attempt_number: u32) -> Self {
        Self {
            artifact_id: Uuid::new_v4(),
            content,
            attempt_number,
            produced_at: Utc::now(),
        }
    }
}
