//! Dialogue walker: threads running labels through a dialogue's turns and
//! emits one example per turn.

use rand::Rng;
use tracing::debug;

use crate::augment::augment_sequences;
use crate::corpus::{Dialogue, Turn, TurnRef};
use crate::error::Result;
use crate::example::{ClassType, DstExample, SlotMap};
use crate::pipeline::{PipelineConfig, Split};
use crate::state::{state_to_map, StateMap};
use crate::turn::label_turn;
use crate::{Tokenizer, NONE_LABEL};

/// State carried from one turn to the next within a single dialogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningState {
    /// Literal dialogue state of the previous turn.
    pub previous_values: StateMap,
    /// Running dialogue-state class label per slot.
    pub class_labels: SlotMap<ClassType>,
    /// Running history label per slot, aligned with `history`.
    pub history_labels: SlotMap<Vec<u8>>,
    /// Accumulated history tokens, most recent turn first.
    pub history: Vec<String>,
}

impl RunningState {
    pub fn new(slots: &[String]) -> Self {
        Self {
            previous_values: StateMap::new(),
            class_labels: slots.iter().map(|s| (s.clone(), ClassType::None)).collect(),
            history_labels: slots.iter().map(|s| (s.clone(), Vec::new())).collect(),
            history: Vec::new(),
        }
    }

    /// Label `turn`, emit its example, and advance to the next turn.
    pub fn advance<T, R>(
        &mut self,
        turn: &Turn,
        at: TurnRef<'_>,
        split: Split,
        tokenizer: &T,
        config: &PipelineConfig,
        rng: &mut R,
    ) -> Result<DstExample>
    where
        T: Tokenizer,
        R: Rng + ?Sized,
    {
        let slots = &config.slots;
        let (system, user) = turn.resolve(tokenizer, at)?;
        let labels = label_turn(
            &system,
            &user,
            &self.previous_values,
            state_to_map(&turn.dialogue_state),
            slots,
            &config.match_policy,
            config.delexicalize_sys_utts,
            at,
        )?;

        let (text_a, text_a_label, text_b, text_b_label) = if config.swap_utterances {
            (labels.user_tokens, labels.user_labels, labels.system_tokens, labels.system_labels)
        } else {
            (labels.system_tokens, labels.system_labels, labels.user_tokens, labels.user_labels)
        };

        let mut values = SlotMap::new();
        let mut class_labels = self.class_labels.clone();
        let mut history_labels = self.history_labels.clone();
        for slot in slots {
            let value = labels.values.get(slot).map_or(NONE_LABEL, String::as_str);
            values.insert(slot.clone(), value.to_string());

            let class_type = labels.class_label.get(slot).copied().unwrap_or_default();
            if !class_type.is_none() {
                class_labels.insert(slot.clone(), class_type);
            }

            if config.append_history {
                let entry = history_labels.entry(slot.clone()).or_default();
                let mut merged = Vec::with_capacity(text_a.len() + text_b.len() + entry.len());
                merged.extend(text_a_label.get(slot).into_iter().flatten());
                merged.extend(text_b_label.get(slot).into_iter().flatten());
                merged.extend(entry.iter());
                if !config.use_history_labels {
                    merged.fill(0);
                }
                *entry = merged;
            }
        }

        let perturbation = config.perturbation_for(split);
        if perturbation.is_enabled() {
            self.history = perturbation.apply(&self.history, rng);
        }

        let example = DstExample {
            guid: format!("{}-{}-{}", split, at.dialogue_id, at.turn_id),
            did: at.dialogue_id.to_string(),
            text_a,
            text_b,
            history: self.history.clone(),
            text_a_label,
            text_b_label,
            history_label: std::mem::replace(&mut self.history_labels, history_labels),
            values,
            inform_label: labels.inform_label,
            inform_slot_label: labels.inform_slot_label,
            refer_label: labels.refer_label,
            diag_state: std::mem::replace(&mut self.class_labels, class_labels),
            class_label: labels.class_label,
        };

        self.previous_values = labels.values;
        if config.append_history {
            let mut history = Vec::with_capacity(example.text_a.len() + example.text_b.len() + self.history.len());
            history.extend_from_slice(&example.text_a);
            history.extend_from_slice(&example.text_b);
            history.append(&mut self.history);
            self.history = history;
        }

        Ok(example)
    }
}

/// Examples produced for one dialogue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogueOutput {
    /// Per-turn examples in turn order, followed by augmented examples.
    pub examples: Vec<DstExample>,
    pub augmented: usize,
}

/// Convert one dialogue into examples.
///
/// Training splits are extended with sequential data augmentation when
/// `config.seq_num > 0`. An empty slot schema yields no examples.
pub fn walk_dialogue<T, R>(
    dialogue: &Dialogue,
    split: Split,
    tokenizer: &T,
    config: &PipelineConfig,
    rng: &mut R,
) -> Result<DialogueOutput>
where
    T: Tokenizer,
    R: Rng + ?Sized,
{
    if config.slots.is_empty() {
        return Ok(DialogueOutput::default());
    }

    let mut state = RunningState::new(&config.slots);
    let mut examples = Vec::with_capacity(dialogue.turns.len());
    for (turn_id, turn) in dialogue.turns.iter().enumerate() {
        let at = TurnRef {
            dialogue_id: &dialogue.dialogue_id,
            turn_id,
        };
        examples.push(state.advance(turn, at, split, tokenizer, config, rng)?);
    }

    let mut augmented = 0;
    if split == Split::Train && config.seq_num > 0 {
        let windows = augment_sequences(&examples, &config.slots, config.seq_num);
        augmented = windows.len();
        examples.extend(windows);
    }

    debug!(
        dialogue_id = %dialogue.dialogue_id,
        domain = dialogue.domain(),
        turns = dialogue.turns.len(),
        augmented,
        "labeled dialogue"
    );

    Ok(DialogueOutput { examples, augmented })
}
