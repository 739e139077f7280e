//! Sequential data augmentation: merge windows of consecutive turn examples.

use crate::example::{ClassType, DstExample, SlotMap};
use crate::NONE_LABEL;

/// Build one merged example per window of `k + 1` consecutive turns, for
/// every `k` in `1..=seq_num`.
///
/// `turn_examples` must be the per-turn examples of a single dialogue, in
/// turn order. Windows are emitted by ascending `k`, then ascending start.
pub fn augment_sequences(turn_examples: &[DstExample], slots: &[String], seq_num: usize) -> Vec<DstExample> {
    let mut augmented = Vec::new();
    for k in 1..=seq_num {
        augmented.extend(turn_examples.windows(k + 1).map(|window| merge_window(window, slots)));
    }
    augmented
}

fn per_slot<T: Clone>(slots: &[String], value: T) -> SlotMap<T> {
    slots.iter().map(|slot| (slot.clone(), value.clone())).collect()
}

/// Overwrite `target[slot]` when the member's label differs from `none`.
fn take_if_set<T: Clone + PartialEq>(target: &mut SlotMap<T>, member: &SlotMap<T>, slot: &str, none: &T) {
    if let Some(label) = member.get(slot) {
        if label != none {
            target.insert(slot.to_string(), label.clone());
        }
    }
}

fn merge_window(window: &[DstExample], slots: &[String]) -> DstExample {
    let first = &window[0];
    let last = &window[window.len() - 1];

    let none_label = NONE_LABEL.to_string();

    let mut text_a = Vec::new();
    let mut text_b = Vec::new();
    let mut text_a_label: SlotMap<Vec<u8>> = per_slot(slots, Vec::new());
    let mut text_b_label: SlotMap<Vec<u8>> = per_slot(slots, Vec::new());
    let mut inform_label = per_slot(slots, none_label.clone());
    let mut inform_slot_label: SlotMap<u8> = per_slot(slots, 0);
    let mut refer_label = per_slot(slots, none_label.clone());
    let mut class_label = per_slot(slots, ClassType::None);

    // Later turns override earlier ones.
    for member in window {
        text_a.extend_from_slice(&member.text_a);
        text_b.extend_from_slice(&member.text_b);

        for slot in slots {
            if let Some(labels) = member.text_a_label.get(slot) {
                text_a_label.entry(slot.clone()).or_default().extend_from_slice(labels);
            }
            if let Some(labels) = member.text_b_label.get(slot) {
                text_b_label.entry(slot.clone()).or_default().extend_from_slice(labels);
            }
            take_if_set(&mut inform_label, &member.inform_label, slot, &none_label);
            take_if_set(&mut inform_slot_label, &member.inform_slot_label, slot, &0);
            take_if_set(&mut refer_label, &member.refer_label, slot, &none_label);
            take_if_set(&mut class_label, &member.class_label, slot, &ClassType::None);
        }
    }

    DstExample {
        guid: first.guid.clone(),
        did: first.did.clone(),
        text_a,
        text_b,
        history: first.history.clone(),
        text_a_label,
        text_b_label,
        history_label: last.history_label.clone(),
        values: last.values.clone(),
        inform_label,
        inform_slot_label,
        refer_label,
        diag_state: last.diag_state.clone(),
        class_label,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    fn slot_map<T: Clone>(value: T) -> SlotMap<T> {
        SlotMap::from([("food".to_string(), value)])
    }

    fn turn(idx: usize, system: &str, user: &str, food_class: ClassType, inform: Option<&str>) -> DstExample {
        let a = toks(system);
        let b = toks(user);
        DstExample {
            guid: format!("train-restaurant_1-{idx}"),
            did: "restaurant_1".into(),
            text_a_label: slot_map(vec![0; a.len()]),
            text_b_label: slot_map(vec![idx as u8 % 2; b.len()]),
            text_a: a,
            text_b: b,
            history: toks(&"h ".repeat(idx)),
            history_label: slot_map(vec![0; idx]),
            values: slot_map(format!("value{idx}")),
            inform_label: slot_map(inform.unwrap_or("none").to_string()),
            inform_slot_label: slot_map(u8::from(inform.is_some())),
            refer_label: slot_map("none".to_string()),
            diag_state: slot_map(ClassType::None),
            class_label: slot_map(food_class),
        }
    }

    fn slots() -> Vec<String> {
        vec!["food".to_string()]
    }

    fn dialogue() -> Vec<DstExample> {
        vec![
            turn(0, "", "i want thai", ClassType::CopyValue, None),
            turn(1, "how about wok", "sure", ClassType::Inform, Some("wok")),
            turn(2, "anything else", "no thanks", ClassType::None, None),
        ]
    }

    #[test]
    fn test_window_counts() {
        let examples = dialogue();
        assert!(augment_sequences(&examples, &slots(), 0).is_empty());
        assert_eq!(augment_sequences(&examples, &slots(), 1).len(), 2);
        // k=1 gives two windows, k=2 one, k=3 none.
        assert_eq!(augment_sequences(&examples, &slots(), 3).len(), 3);
        assert!(augment_sequences(&examples[..1], &slots(), 2).is_empty());
    }

    #[test]
    fn test_merged_text_matches_members() {
        let examples = dialogue();
        let augmented = augment_sequences(&examples, &slots(), 2);
        let full = &augmented[2];

        let mut expected_a = Vec::new();
        let mut expected_b = Vec::new();
        for ex in &examples {
            expected_a.extend(ex.text_a.clone());
            expected_b.extend(ex.text_b.clone());
        }
        assert_eq!(full.text_a, expected_a);
        assert_eq!(full.text_b, expected_b);
        assert_eq!(full.text_a_label["food"].len(), expected_a.len());
        assert_eq!(full.text_b_label["food"], vec![0, 0, 0, 1, 0, 0]);
    }

    #[test]
    fn test_last_non_none_wins() {
        let examples = dialogue();
        let augmented = augment_sequences(&examples, &slots(), 2);

        // Window 0..=1: the inform of turn 1 overrides the copy of turn 0.
        assert_eq!(augmented[0].class_label["food"], ClassType::Inform);
        assert_eq!(augmented[0].inform_label["food"], "wok");
        assert_eq!(augmented[0].inform_slot_label["food"], 1);

        // Window 1..=2: turn 2 is none, so turn 1's labels survive.
        assert_eq!(augmented[1].class_label["food"], ClassType::Inform);
        assert_eq!(augmented[1].inform_label["food"], "wok");
    }

    #[test]
    fn test_identity_and_state_fields() {
        let examples = dialogue();
        let augmented = augment_sequences(&examples, &slots(), 1);
        let second = &augmented[1];

        assert_eq!(second.guid, examples[1].guid);
        assert_eq!(second.history, examples[1].history);
        assert_eq!(second.history_label, examples[2].history_label);
        assert_eq!(second.values, examples[2].values);
        assert_eq!(second.diag_state, examples[2].diag_state);
    }

    #[test]
    fn test_members_untouched() {
        let examples = dialogue();
        let before = examples.clone();
        let _ = augment_sequences(&examples, &slots(), 2);
        assert_eq!(examples, before);
    }
}
