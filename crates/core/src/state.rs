//! Slot/value indexing of dialogue state snapshots.

use std::collections::BTreeMap;

use crate::corpus::SlotValue;

/// Slot to value mapping of one dialogue state snapshot.
pub type StateMap = BTreeMap<String, String>;

/// Index a dialogue state by slot. Later duplicates overwrite earlier ones.
pub fn state_to_map(state: &[SlotValue]) -> StateMap {
    state
        .iter()
        .map(|sv| (sv.slot.clone(), sv.value.clone()))
        .collect()
}
