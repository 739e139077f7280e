//! Per-slot span matching: decides how a slot's value is grounded in a turn.

use serde::{Deserialize, Serialize};

use crate::corpus::{SpanAnnotation, TokenizedUtterance, TurnRef};
use crate::error::{DstError, Result};
use crate::example::ClassType;
use crate::helpers::span_text;
use crate::state::StateMap;
use crate::DONTCARE;

/// Which span wins when several annotations realize the same value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occurrence {
    First,
    #[default]
    Last,
}

/// Configuration of the span matcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPolicy {
    pub occurrence: Occurrence,
    /// Also search system spans when the user utterance already matched.
    /// A system match then turns the class into `inform`.
    pub check_system_after_user_match: bool,
}

/// Token labels and class type for one slot in one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanMatch {
    pub system_labels: Vec<u8>,
    pub user_labels: Vec<u8>,
    pub class_type: ClassType,
}

fn find_span<'a>(
    utterance: &'a TokenizedUtterance,
    slot: &str,
    value: &str,
    occurrence: Occurrence,
) -> Option<&'a SpanAnnotation> {
    let mut candidates = utterance
        .spans
        .iter()
        .filter(|span| span.slot == slot && span_text(&utterance.tokens, span) == value);
    match occurrence {
        Occurrence::First => candidates.next(),
        Occurrence::Last => candidates.last(),
    }
}

fn mark(labels: &mut [u8], span: &SpanAnnotation) {
    labels[span.start..span.exclusive_end].fill(1);
}

/// Label one slot of one turn against the previous and current state.
///
/// `dontcare` is only labeled where it first appears; a value that persists
/// without being mentioned is `none`. A changed value with no supporting
/// span is a [`DstError::DataInconsistency`].
pub fn match_slot(
    prev: &StateMap,
    cur: &StateMap,
    slot: &str,
    system: &TokenizedUtterance,
    user: &TokenizedUtterance,
    policy: &MatchPolicy,
    at: TurnRef<'_>,
) -> Result<SpanMatch> {
    let mut system_labels = vec![0u8; system.tokens.len()];
    let mut user_labels = vec![0u8; user.tokens.len()];

    let class_type = match cur.get(slot) {
        None => ClassType::None,
        Some(value) if value == DONTCARE && prev.get(slot).map(String::as_str) != Some(DONTCARE) => {
            ClassType::Dontcare
        }
        Some(value) => {
            let mut found = None;
            if let Some(span) = find_span(user, slot, value, policy.occurrence) {
                mark(&mut user_labels, span);
                found = Some(ClassType::CopyValue);
            }
            if found.is_none() || policy.check_system_after_user_match {
                if let Some(span) = find_span(system, slot, value, policy.occurrence) {
                    mark(&mut system_labels, span);
                    found = Some(ClassType::Inform);
                }
            }
            match found {
                Some(class_type) => class_type,
                None if prev.get(slot) == Some(value) => ClassType::None,
                None => {
                    return Err(DstError::DataInconsistency {
                        dialogue_id: at.dialogue_id.to_string(),
                        turn_id: at.turn_id,
                        slot: slot.to_string(),
                        value: value.clone(),
                    })
                }
            }
        }
    };

    let marked = system_labels.iter().chain(&user_labels).any(|&l| l > 0);
    let consistent = match class_type {
        ClassType::None | ClassType::Dontcare => !marked,
        ClassType::CopyValue | ClassType::Inform => marked,
    };
    if !consistent {
        return Err(DstError::InvariantViolation {
            dialogue_id: at.dialogue_id.to_string(),
            turn_id: at.turn_id,
            slot: slot.to_string(),
            class_type,
        });
    }

    Ok(SpanMatch {
        system_labels,
        user_labels,
        class_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::SlotValue;
    use crate::state::state_to_map;

    const AT: TurnRef<'static> = TurnRef {
        dialogue_id: "restaurant_7",
        turn_id: 2,
    };

    fn utt(text: &str, spans: &[(&str, usize, usize)]) -> TokenizedUtterance {
        TokenizedUtterance {
            tokens: text.split_whitespace().map(String::from).collect(),
            spans: spans
                .iter()
                .map(|&(slot, start, end)| SpanAnnotation::new(slot, start, end))
                .collect(),
        }
    }

    fn state(pairs: &[(&str, &str)]) -> StateMap {
        let values: Vec<SlotValue> = pairs.iter().map(|&(s, v)| SlotValue::new(s, v)).collect();
        state_to_map(&values)
    }

    #[test]
    fn test_absent_slot_is_none() {
        let m = match_slot(
            &state(&[]),
            &state(&[("food", "thai")]),
            "area",
            &utt("hello", &[]),
            &utt("thai food please", &[("food", 0, 1)]),
            &MatchPolicy::default(),
            AT,
        )
        .unwrap();
        assert_eq!(m.class_type, ClassType::None);
        assert_eq!(m.user_labels, vec![0, 0, 0]);
        assert_eq!(m.system_labels, vec![0]);
    }

    #[test]
    fn test_user_span_is_copy_value() {
        let user = utt("i want italian food", &[("food", 2, 3)]);
        let m = match_slot(
            &state(&[]),
            &state(&[("food", "italian")]),
            "food",
            &TokenizedUtterance::default(),
            &user,
            &MatchPolicy::default(),
            AT,
        )
        .unwrap();
        assert_eq!(m.class_type, ClassType::CopyValue);
        assert_eq!(m.user_labels, vec![0, 0, 1, 0]);
        assert!(m.system_labels.is_empty());
    }

    #[test]
    fn test_multi_token_value() {
        let user = utt("table at the golden wok", &[("restaurant_name", 3, 5)]);
        let m = match_slot(
            &state(&[]),
            &state(&[("restaurant_name", "golden wok")]),
            "restaurant_name",
            &TokenizedUtterance::default(),
            &user,
            &MatchPolicy::default(),
            AT,
        )
        .unwrap();
        assert_eq!(m.class_type, ClassType::CopyValue);
        assert_eq!(m.user_labels.iter().map(|&l| l as usize).sum::<usize>(), 2);
    }

    #[test]
    fn test_occurrence_policy() {
        let user = utt("cheap no really cheap", &[("price", 0, 1), ("price", 3, 4)]);
        let cur = state(&[("price", "cheap")]);
        let empty = TokenizedUtterance::default();

        let last = match_slot(&state(&[]), &cur, "price", &empty, &user, &MatchPolicy::default(), AT).unwrap();
        assert_eq!(last.user_labels, vec![0, 0, 0, 1]);

        let first_policy = MatchPolicy {
            occurrence: Occurrence::First,
            ..Default::default()
        };
        let first = match_slot(&state(&[]), &cur, "price", &empty, &user, &first_policy, AT).unwrap();
        assert_eq!(first.user_labels, vec![1, 0, 0, 0]);
    }

    #[test]
    fn test_span_must_match_value_exactly() {
        // The span is tagged with the slot but realizes a different value.
        let user = utt("cheap please", &[("price", 0, 1)]);
        let err = match_slot(
            &state(&[]),
            &state(&[("price", "Cheap")]),
            "price",
            &TokenizedUtterance::default(),
            &user,
            &MatchPolicy::default(),
            AT,
        )
        .unwrap_err();
        assert!(matches!(err, DstError::DataInconsistency { .. }));
    }

    #[test]
    fn test_system_span_is_inform() {
        let system = utt("how about golden wok", &[("restaurant_name", 2, 4)]);
        let m = match_slot(
            &state(&[]),
            &state(&[("restaurant_name", "golden wok")]),
            "restaurant_name",
            &system,
            &utt("sounds good", &[]),
            &MatchPolicy::default(),
            AT,
        )
        .unwrap();
        assert_eq!(m.class_type, ClassType::Inform);
        assert_eq!(m.system_labels, vec![0, 0, 1, 1]);
        assert_eq!(m.user_labels, vec![0, 0]);
    }

    #[test]
    fn test_user_match_skips_system_by_default() {
        let system = utt("thai then", &[("food", 0, 1)]);
        let user = utt("yes thai", &[("food", 1, 2)]);
        let cur = state(&[("food", "thai")]);

        let m = match_slot(&state(&[]), &cur, "food", &system, &user, &MatchPolicy::default(), AT).unwrap();
        assert_eq!(m.class_type, ClassType::CopyValue);
        assert_eq!(m.system_labels, vec![0, 0]);

        let both = MatchPolicy {
            check_system_after_user_match: true,
            ..Default::default()
        };
        let m = match_slot(&state(&[]), &cur, "food", &system, &user, &both, AT).unwrap();
        assert_eq!(m.class_type, ClassType::Inform);
        assert_eq!(m.system_labels, vec![1, 0]);
        assert_eq!(m.user_labels, vec![0, 1]);
    }

    #[test]
    fn test_dontcare_first_occurrence_only() {
        let system = TokenizedUtterance::default();
        let user = utt("any area is fine", &[]);
        let cur = state(&[("area", "dontcare")]);

        let first = match_slot(&state(&[]), &cur, "area", &system, &user, &MatchPolicy::default(), AT).unwrap();
        assert_eq!(first.class_type, ClassType::Dontcare);
        assert_eq!(first.user_labels, vec![0, 0, 0, 0]);

        let prev = state(&[("area", "dontcare")]);
        let again = match_slot(&prev, &cur, "area", &system, &utt("ok", &[]), &MatchPolicy::default(), AT).unwrap();
        assert_eq!(again.class_type, ClassType::None);
    }

    #[test]
    fn test_dontcare_after_other_value() {
        let cur = state(&[("area", "dontcare")]);
        let prev = state(&[("area", "north")]);
        let m = match_slot(
            &prev,
            &cur,
            "area",
            &TokenizedUtterance::default(),
            &utt("actually anywhere", &[]),
            &MatchPolicy::default(),
            AT,
        )
        .unwrap();
        assert_eq!(m.class_type, ClassType::Dontcare);
    }

    #[test]
    fn test_carried_value_is_none() {
        let cur = state(&[("food", "italian")]);
        let m = match_slot(
            &cur,
            &cur,
            "food",
            &utt("anything else", &[]),
            &utt("ok thanks", &[]),
            &MatchPolicy::default(),
            AT,
        )
        .unwrap();
        assert_eq!(m.class_type, ClassType::None);
        assert_eq!(m.user_labels, vec![0, 0]);
        assert_eq!(m.system_labels, vec![0, 0]);
    }

    #[test]
    fn test_unsupported_change_is_fatal() {
        let err = match_slot(
            &state(&[("price", "expensive")]),
            &state(&[("price", "cheap")]),
            "price",
            &utt("what price range", &[]),
            &utt("something else", &[]),
            &MatchPolicy::default(),
            AT,
        )
        .unwrap_err();
        match err {
            DstError::DataInconsistency {
                dialogue_id,
                turn_id,
                slot,
                value,
            } => {
                assert_eq!(dialogue_id, "restaurant_7");
                assert_eq!(turn_id, 2);
                assert_eq!(slot, "price");
                assert_eq!(value, "cheap");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_span_violates_invariant() {
        let user = utt("whatever", &[("food", 0, 0)]);
        let err = match_slot(
            &state(&[]),
            &state(&[("food", "")]),
            "food",
            &TokenizedUtterance::default(),
            &user,
            &MatchPolicy::default(),
            AT,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DstError::InvariantViolation {
                class_type: ClassType::CopyValue,
                ..
            }
        ));
    }
}
