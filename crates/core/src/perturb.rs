//! History perturbations for robustness evaluation.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::DstError;

/// How accumulated history is scrambled on evaluation splits.
///
/// History is treated as pseudo-sentences delimited by `.`; the delimiters
/// themselves do not survive the transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryPerturbation {
    #[default]
    Disabled,
    ShuffleUtterances,
    ReverseUtterances,
    ShuffleWords,
    ReverseWords,
}

impl HistoryPerturbation {
    pub fn is_enabled(self) -> bool {
        self != HistoryPerturbation::Disabled
    }

    /// Apply the perturbation and re-split the result on whitespace.
    pub fn apply<R: Rng + ?Sized>(self, history: &[String], rng: &mut R) -> Vec<String> {
        if !self.is_enabled() {
            return history.to_vec();
        }

        let joined = history.join(" ");
        let mut sentences: Vec<String> = joined.split('.').map(str::to_string).collect();

        match self {
            HistoryPerturbation::Disabled => {}
            HistoryPerturbation::ShuffleUtterances => sentences.shuffle(rng),
            HistoryPerturbation::ReverseUtterances => sentences.reverse(),
            HistoryPerturbation::ShuffleWords => {
                for sentence in &mut sentences {
                    *sentence = {
                        let mut words: Vec<&str> = sentence.split_whitespace().collect();
                        words.shuffle(rng);
                        words.join(" ")
                    };
                }
            }
            HistoryPerturbation::ReverseWords => {
                for sentence in &mut sentences {
                    *sentence = sentence.split_whitespace().rev().collect::<Vec<_>>().join(" ");
                }
            }
        }

        sentences
            .iter()
            .flat_map(|s| s.split_whitespace().map(str::to_string))
            .collect()
    }
}

impl TryFrom<u8> for HistoryPerturbation {
    type Error = DstError;

    fn try_from(mode: u8) -> Result<Self, Self::Error> {
        match mode {
            0 => Ok(HistoryPerturbation::Disabled),
            1 => Ok(HistoryPerturbation::ShuffleUtterances),
            2 => Ok(HistoryPerturbation::ReverseUtterances),
            3 => Ok(HistoryPerturbation::ShuffleWords),
            4 => Ok(HistoryPerturbation::ReverseWords),
            other => Err(DstError::InvalidPerturbation(other)),
        }
    }
}
