//! Immutable description of one unit of work.

use serde::{Deserialize, Serialize};

/// What is being produced. Opaque to the engine beyond its identifiers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Spec {
    /// Identifier of the unit (card id, lesson id, diagram id...).
    pub id: String,

    /// Spec type, e.g. `"lesson_card"` or `"diagram"`. Callers use it to pick
    /// a scoring profile; the engine only reports it.
    pub kind: String,

    /// Domain payload handed through to the collaborators untouched.
    pub payload: serde_json::Value,
}

impl Spec {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            payload,
        }
    }
}
