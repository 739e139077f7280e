//! Input corpus model: dialogues, turns, utterances and their span annotations.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DstError, Result};
use crate::Tokenizer;

/// Half-open token range `[start, exclusive_end)` realizing a slot value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanAnnotation {
    pub slot: String,
    pub start: usize,
    pub exclusive_end: usize,
}

impl SpanAnnotation {
    pub fn new(slot: impl Into<String>, start: usize, exclusive_end: usize) -> Self {
        Self {
            slot: slot.into(),
            start,
            exclusive_end,
        }
    }
}

/// One slot/value pair of a dialogue state snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotValue {
    pub slot: String,
    pub value: String,
}

impl SlotValue {
    pub fn new(slot: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            slot: slot.into(),
            value: value.into(),
        }
    }
}

/// An utterance as stored in the corpus.
///
/// Pre-tokenized corpora provide `tokens`; otherwise `text` is tokenized on
/// load and the span offsets refer to that tokenization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<String>>,
    pub slots: Vec<SpanAnnotation>,
}

impl Utterance {
    pub fn from_tokens(tokens: Vec<String>, slots: Vec<SpanAnnotation>) -> Self {
        Self {
            text: None,
            tokens: Some(tokens),
            slots,
        }
    }

    /// Resolve the token sequence and check every span against it.
    pub fn resolve<T: Tokenizer>(&self, tokenizer: &T, at: TurnRef<'_>) -> Result<TokenizedUtterance> {
        let tokens = match (&self.tokens, &self.text) {
            (Some(tokens), _) => tokens.clone(),
            (None, Some(text)) => tokenizer.tokenize(text),
            (None, None) => {
                return Err(DstError::MissingTokens {
                    dialogue_id: at.dialogue_id.to_string(),
                    turn_id: at.turn_id,
                })
            }
        };

        for span in &self.slots {
            if span.start > span.exclusive_end || span.exclusive_end > tokens.len() {
                return Err(DstError::MalformedSpan {
                    dialogue_id: at.dialogue_id.to_string(),
                    turn_id: at.turn_id,
                    slot: span.slot.clone(),
                    start: span.start,
                    exclusive_end: span.exclusive_end,
                    len: tokens.len(),
                });
            }
        }

        Ok(TokenizedUtterance {
            tokens,
            spans: self.slots.clone(),
        })
    }
}

/// An utterance whose spans are known to lie within its tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenizedUtterance {
    pub tokens: Vec<String>,
    pub spans: Vec<SpanAnnotation>,
}

/// One exchange: optional system prompt, user reply, and the state after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_utterance: Option<Utterance>,
    pub user_utterance: Utterance,
    pub dialogue_state: Vec<SlotValue>,
}

impl Turn {
    /// Resolve `(system, user)` utterances. A missing system utterance is empty.
    pub fn resolve<T: Tokenizer>(
        &self,
        tokenizer: &T,
        at: TurnRef<'_>,
    ) -> Result<(TokenizedUtterance, TokenizedUtterance)> {
        let system = match &self.system_utterance {
            Some(utt) => utt.resolve(tokenizer, at)?,
            None => TokenizedUtterance::default(),
        };
        let user = self.user_utterance.resolve(tokenizer, at)?;
        Ok((system, user))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialogue {
    pub dialogue_id: String,
    pub turns: Vec<Turn>,
}

impl Dialogue {
    /// Domain tag: the part of the id before the first underscore.
    pub fn domain(&self) -> &str {
        self.dialogue_id
            .split('_')
            .next()
            .unwrap_or(&self.dialogue_id)
    }
}

/// Location of a turn, carried into error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnRef<'a> {
    pub dialogue_id: &'a str,
    pub turn_id: usize,
}

/// Load a corpus file holding a JSON array of dialogues.
pub fn load_corpus(path: &Path) -> Result<Vec<Dialogue>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
