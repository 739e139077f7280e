//! Turn labeling across the whole slot schema.

use crate::corpus::{TokenizedUtterance, TurnRef};
use crate::error::Result;
use crate::example::{ClassType, SlotMap};
use crate::helpers::delexicalize;
use crate::span::{match_slot, MatchPolicy};
use crate::state::StateMap;
use crate::NONE_LABEL;

/// Per-slot labels of a single turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnLabels {
    /// System tokens, delexicalized when requested.
    pub system_tokens: Vec<String>,
    /// Always zero: informs keep their value, not their position.
    pub system_labels: SlotMap<Vec<u8>>,
    pub user_tokens: Vec<String>,
    pub user_labels: SlotMap<Vec<u8>>,
    pub inform_label: SlotMap<String>,
    pub inform_slot_label: SlotMap<u8>,
    pub refer_label: SlotMap<String>,
    /// Current state, indexed by slot.
    pub values: StateMap,
    pub class_label: SlotMap<ClassType>,
}

/// Run the span matcher for every slot, in schema order.
#[allow(clippy::too_many_arguments)]
pub fn label_turn(
    system: &TokenizedUtterance,
    user: &TokenizedUtterance,
    prev: &StateMap,
    cur: StateMap,
    slots: &[String],
    policy: &MatchPolicy,
    delexicalize_sys_utts: bool,
    at: TurnRef<'_>,
) -> Result<TurnLabels> {
    let mut labels = TurnLabels {
        system_tokens: Vec::new(),
        system_labels: SlotMap::new(),
        user_tokens: user.tokens.clone(),
        user_labels: SlotMap::new(),
        inform_label: SlotMap::new(),
        inform_slot_label: SlotMap::new(),
        refer_label: SlotMap::new(),
        values: StateMap::new(),
        class_label: SlotMap::new(),
    };

    for slot in slots {
        let matched = match_slot(prev, &cur, slot, system, user, policy, at)?;

        let informed = matched.system_labels.iter().any(|&l| l > 0);
        let inform_value = match cur.get(slot) {
            Some(value) if informed => value.clone(),
            _ => NONE_LABEL.to_string(),
        };
        labels.inform_label.insert(slot.clone(), inform_value);
        labels.inform_slot_label.insert(slot.clone(), u8::from(informed));
        // No referral phenomenon in this data.
        labels.refer_label.insert(slot.clone(), NONE_LABEL.to_string());

        labels
            .system_labels
            .insert(slot.clone(), vec![0; matched.system_labels.len()]);
        labels.user_labels.insert(slot.clone(), matched.user_labels);
        labels.class_label.insert(slot.clone(), matched.class_type);
    }

    labels.system_tokens = if delexicalize_sys_utts {
        delexicalize(&system.tokens, &system.spans)
    } else {
        system.tokens.clone()
    };
    labels.values = cur;

    Ok(labels)
}
