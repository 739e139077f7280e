//! Error type shared by every stage of the transform.

use std::path::PathBuf;

use thiserror::Error;

use crate::example::ClassType;

/// Errors raised while converting a corpus into training examples.
///
/// Every variant is fatal: the transform is deterministic, so a failure is
/// reproducible and has to be fixed in the data rather than skipped.
#[derive(Debug, Error)]
pub enum DstError {
    /// The dialogue state claims a new value that no span in the turn supports.
    #[error("copy value {value:?} for slot {slot:?} cannot be found in dialogue {dialogue_id} turn {turn_id}")]
    DataInconsistency {
        dialogue_id: String,
        turn_id: usize,
        slot: String,
        value: String,
    },

    /// Label vectors disagree with the derived class type.
    #[error("label vectors for slot {slot:?} contradict class {class_type:?} in dialogue {dialogue_id} turn {turn_id}")]
    InvariantViolation {
        dialogue_id: String,
        turn_id: usize,
        slot: String,
        class_type: ClassType,
    },

    /// A span annotation points outside its utterance.
    #[error("span [{start}, {exclusive_end}) for slot {slot:?} exceeds {len} tokens in dialogue {dialogue_id} turn {turn_id}")]
    MalformedSpan {
        dialogue_id: String,
        turn_id: usize,
        slot: String,
        start: usize,
        exclusive_end: usize,
        len: usize,
    },

    /// An utterance carries neither `tokens` nor `text`.
    #[error("utterance without tokens or text in dialogue {dialogue_id} turn {turn_id}")]
    MissingTokens { dialogue_id: String, turn_id: usize },

    /// Perturbation modes are numbered 0 through 4.
    #[error("invalid history perturbation mode {0} (expected 0-4)")]
    InvalidPerturbation(u8),

    #[error("no corpus files found under {0:?}")]
    NoCorpusFiles(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for transform operations.
pub type Result<T> = std::result::Result<T, DstError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_inconsistency_names_location() {
        let err = DstError::DataInconsistency {
            dialogue_id: "restaurant_0001".into(),
            turn_id: 3,
            slot: "price_range".into(),
            value: "cheap".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("restaurant_0001"));
        assert!(msg.contains("turn 3"));
        assert!(msg.contains("\"cheap\""));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DstError>();
    }
}
