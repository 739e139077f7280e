//! Training example record produced by the transform.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Per-slot mapping used for every labeled field of an example. Keys keep
/// slot schema order.
pub type SlotMap<T> = IndexMap<String, T>;

/// How a slot's current value is grounded in a turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassType {
    #[default]
    None,
    Dontcare,
    CopyValue,
    Inform,
}

impl ClassType {
    pub fn as_str(self) -> &'static str {
        match self {
            ClassType::None => "none",
            ClassType::Dontcare => "dontcare",
            ClassType::CopyValue => "copy_value",
            ClassType::Inform => "inform",
        }
    }

    pub fn is_none(self) -> bool {
        self == ClassType::None
    }
}

/// One model-ready training example.
///
/// Field names match the layout the feature encoder downstream expects.
/// `text_a`/`text_b` hold the system and user tokens, or user and system
/// when utterances are swapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DstExample {
    pub guid: String,
    pub did: String,
    pub text_a: Vec<String>,
    pub text_b: Vec<String>,
    /// Earlier turns, most recent first.
    pub history: Vec<String>,
    pub text_a_label: SlotMap<Vec<u8>>,
    pub text_b_label: SlotMap<Vec<u8>>,
    pub history_label: SlotMap<Vec<u8>>,
    /// Current value per slot, `"none"` when unset.
    pub values: SlotMap<String>,
    /// Value the system stated this turn, `"none"` otherwise.
    pub inform_label: SlotMap<String>,
    pub inform_slot_label: SlotMap<u8>,
    pub refer_label: SlotMap<String>,
    /// Running dialogue-state class labels as of the previous turn.
    pub diag_state: SlotMap<ClassType>,
    pub class_label: SlotMap<ClassType>,
}
