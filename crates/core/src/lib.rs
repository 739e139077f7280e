//! Core labeling logic for span-based dialogue state tracking corpora.
//!
//! This crate converts annotated multi-turn dialogues (token spans plus
//! ground-truth slot/value states per turn) into flat training examples:
//! one per turn, each carrying per-slot class labels and token-level span
//! labels. Training splits can be expanded with sequential data augmentation
//! and evaluation splits can have their history perturbed for robustness runs.

/// Trait for tokenization operations.
///
/// Span annotations index into the token sequence, so the tokenizer only
/// matters for utterances that ship raw `text` without `tokens`.
pub trait Tokenizer {
    /// Split an utterance into an ordered sequence of tokens.
    fn tokenize(&self, text: &str) -> Vec<String>;
}

// Blanket implementation for references to Tokenizers
impl<T: Tokenizer + ?Sized> Tokenizer for &T {
    fn tokenize(&self, text: &str) -> Vec<String> {
        (*self).tokenize(text)
    }
}

mod augment;
pub mod corpus;
mod error;
mod example;
mod helpers;
mod perturb;
pub mod pipeline;
mod span;
mod state;
mod turn;
mod walker;

pub use augment::augment_sequences;
pub use corpus::{load_corpus, Dialogue, SlotValue, SpanAnnotation, TokenizedUtterance, Turn, TurnRef, Utterance};
pub use error::{DstError, Result};
pub use example::{ClassType, DstExample, SlotMap};
pub use helpers::{delexicalize, span_text, SimTokenizer};
pub use perturb::HistoryPerturbation;
pub use pipeline::{
    discover_corpus_files, process_corpus, run_pipeline, write_jsonl, CorpusOutput, DatasetConfig,
    PipelineConfig, PipelineResult, Split, SplitSummary,
};
pub use span::{match_slot, MatchPolicy, Occurrence, SpanMatch};
pub use state::{state_to_map, StateMap};
pub use turn::{label_turn, TurnLabels};
pub use walker::{walk_dialogue, DialogueOutput, RunningState};

/// Slot value meaning the user has no preference.
pub const DONTCARE: &str = "dontcare";

/// Placeholder for absent labels and values.
pub const NONE_LABEL: &str = "none";

/// Placeholder written over delexicalized system tokens.
pub const UNK_TOKEN: &str = "[UNK]";

/// Number of dialogues processed per corpus in development mode.
pub const DEV_MODE_DIALOGUE_LIMIT: usize = 10;

/// Default seed for history perturbation.
pub const DEFAULT_PERTURBATION_SEED: u64 = 42;
