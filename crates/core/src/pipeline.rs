//! Pipeline for processing corpus files into DST training examples.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::corpus::{load_corpus, Dialogue};
use crate::error::{DstError, Result};
use crate::example::DstExample;
use crate::perturb::HistoryPerturbation;
use crate::span::MatchPolicy;
use crate::walker::walk_dialogue;
use crate::{Tokenizer, DEFAULT_PERTURBATION_SEED, DEV_MODE_DIALOGUE_LIMIT};

/// Corpus split. Only `train` is augmented; only `dev`/`test` are perturbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Dev,
    Test,
}

impl Split {
    pub fn as_str(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Dev => "dev",
            Split::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Split {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "train" => Ok(Split::Train),
            "dev" => Ok(Split::Dev),
            "test" => Ok(Split::Test),
            other => Err(format!("unknown split '{other}'")),
        }
    }
}

/// Configuration for the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Slot schema, in order. Fixed for the whole run.
    pub slots: Vec<String>,
    /// Carry earlier turns into each example's history.
    pub append_history: bool,
    /// Keep span labels in the history labels instead of zeroing them.
    pub use_history_labels: bool,
    /// Put the user utterance in `text_a` and the system utterance in `text_b`.
    pub swap_utterances: bool,
    pub delexicalize_sys_utts: bool,
    pub match_policy: MatchPolicy,
    /// Longest augmentation window is `seq_num + 1` turns. 0 disables.
    pub seq_num: usize,
    pub dev_perturbation: HistoryPerturbation,
    pub test_perturbation: HistoryPerturbation,
    pub perturbation_seed: u64,
    /// Only process the first few dialogues of each corpus.
    pub dev_mode: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            append_history: false,
            use_history_labels: false,
            swap_utterances: false,
            delexicalize_sys_utts: false,
            match_policy: MatchPolicy::default(),
            seq_num: 0,
            dev_perturbation: HistoryPerturbation::Disabled,
            test_perturbation: HistoryPerturbation::Disabled,
            perturbation_seed: DEFAULT_PERTURBATION_SEED,
            dev_mode: false,
        }
    }
}

impl PipelineConfig {
    /// History perturbation in effect for `split`. Training is never perturbed.
    pub fn perturbation_for(&self, split: Split) -> HistoryPerturbation {
        match split {
            Split::Train => HistoryPerturbation::Disabled,
            Split::Dev => self.dev_perturbation,
            Split::Test => self.test_perturbation,
        }
    }
}

/// Dataset description file. Only `slots` is read; other keys such as
/// `class_types` are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub slots: Vec<String>,
}

impl DatasetConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Statistics for one processed corpus file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitSummary {
    pub split: Split,
    pub source_path: String,
    pub output_path: String,
    pub dialogues: usize,
    pub turn_examples: usize,
    pub augmented_examples: usize,
    /// Dialogue count per domain tag.
    pub domains: BTreeMap<String, usize>,
}

/// Examples of one corpus plus its statistics.
#[derive(Debug)]
pub struct CorpusOutput {
    pub examples: Vec<DstExample>,
    pub dialogues: usize,
    pub turn_examples: usize,
    pub augmented_examples: usize,
    pub domains: BTreeMap<String, usize>,
}

/// Result of processing all corpus files.
#[derive(Debug, Serialize)]
pub struct PipelineResult {
    pub total_dialogues: usize,
    pub total_examples: usize,
    pub splits: Vec<SplitSummary>,
}

/// Discover all corpus files (`train.json`, `dev.json`, `test.json`) under a directory.
pub fn discover_corpus_files(root: &Path) -> Vec<(PathBuf, Split)> {
    let mut paths: Vec<(PathBuf, Split)> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
        .filter_map(|e| {
            let stem = e.path().file_stem()?.to_str()?;
            match stem.parse::<Split>() {
                Ok(split) => Some((e.path().to_path_buf(), split)),
                Err(_) => {
                    warn!(path = %e.path().display(), "ignoring JSON file that is not a split corpus");
                    None
                }
            }
        })
        .collect();
    paths.sort();
    paths
}

/// Convert the dialogues of one corpus in parallel.
///
/// Output order follows input order, turn examples of a dialogue before its
/// augmented examples. The first failing dialogue aborts the whole corpus.
pub fn process_corpus<T>(
    dialogues: &[Dialogue],
    split: Split,
    tokenizer: &T,
    config: &PipelineConfig,
) -> Result<CorpusOutput>
where
    T: Tokenizer + Sync,
{
    let dialogues = if config.dev_mode {
        &dialogues[..dialogues.len().min(DEV_MODE_DIALOGUE_LIMIT)]
    } else {
        dialogues
    };

    if config.slots.is_empty() {
        warn!(%split, "empty slot schema, no examples will be produced");
    }

    let results: Vec<Result<_>> = dialogues
        .par_iter()
        .enumerate()
        .map(|(idx, dialogue)| {
            let mut rng = StdRng::seed_from_u64(config.perturbation_seed.wrapping_add(idx as u64));
            walk_dialogue(dialogue, split, tokenizer, config, &mut rng)
        })
        .collect();
    // Report the earliest failing dialogue in input order, whichever worker hit it first.
    let outputs = results.into_iter().collect::<Result<Vec<_>>>()?;

    let mut domains = BTreeMap::new();
    for dialogue in dialogues {
        *domains.entry(dialogue.domain().to_string()).or_insert(0) += 1;
    }

    let augmented_examples: usize = outputs.iter().map(|o| o.augmented).sum();
    let examples: Vec<DstExample> = outputs.into_iter().flat_map(|o| o.examples).collect();
    let turn_examples = examples.len() - augmented_examples;

    info!(
        %split,
        dialogues = dialogues.len(),
        turn_examples,
        augmented_examples,
        "processed corpus"
    );

    Ok(CorpusOutput {
        examples,
        dialogues: dialogues.len(),
        turn_examples,
        augmented_examples,
        domains,
    })
}

/// Write examples as JSONL, one example per line.
pub fn write_jsonl(examples: &[DstExample], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = BufWriter::new(File::create(path)?);
    for example in examples {
        let json_line = serde_json::to_string(example)?;
        writeln!(file, "{}", json_line)?;
    }
    file.flush()?;
    Ok(())
}

/// Process every corpus file under `data_dir` and mirror it as JSONL under
/// `output_dir`.
pub fn run_pipeline<T>(
    data_dir: &Path,
    output_dir: &Path,
    tokenizer: &T,
    config: &PipelineConfig,
) -> Result<PipelineResult>
where
    T: Tokenizer + Sync,
{
    let corpus_files = discover_corpus_files(data_dir);
    if corpus_files.is_empty() {
        return Err(DstError::NoCorpusFiles(data_dir.to_path_buf()));
    }

    std::fs::create_dir_all(output_dir)?;

    let mut splits = Vec::with_capacity(corpus_files.len());
    for (path, split) in corpus_files {
        info!(path = %path.display(), %split, "loading corpus");
        let dialogues = load_corpus(&path)?;
        let output = process_corpus(&dialogues, split, tokenizer, config)?;

        let relative = path.strip_prefix(data_dir).unwrap_or(&path);
        let output_path = output_dir.join(relative).with_extension("jsonl");
        write_jsonl(&output.examples, &output_path)?;

        splits.push(SplitSummary {
            split,
            source_path: path.to_string_lossy().to_string(),
            output_path: output_path.to_string_lossy().to_string(),
            dialogues: output.dialogues,
            turn_examples: output.turn_examples,
            augmented_examples: output.augmented_examples,
            domains: output.domains,
        });
    }

    Ok(PipelineResult {
        total_dialogues: splits.iter().map(|s| s.dialogues).sum(),
        total_examples: splits.iter().map(|s| s.turn_examples + s.augmented_examples).sum(),
        splits,
    })
}
