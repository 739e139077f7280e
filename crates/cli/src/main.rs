//! CLI tool for serializing annotated dialogue corpora into DST training examples.
//!
//! This tool walks a data directory for `train.json`, `dev.json` and
//! `test.json` corpora and writes one JSONL file of examples per corpus,
//! plus a `metadata.json` describing the run.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dst_serializer_core::{
    run_pipeline, DatasetConfig, HistoryPerturbation, MatchPolicy, Occurrence, PipelineConfig,
    PipelineResult, SimTokenizer, DEFAULT_PERTURBATION_SEED,
};

/// Serialize span-annotated dialogue corpora to DST training examples.
#[derive(Parser, Debug)]
#[command(name = "dst-serialize")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Root directory containing train/dev/test JSON corpora
    #[arg(long)]
    data_dir: PathBuf,

    /// Output directory for JSONL files
    #[arg(long)]
    output_dir: PathBuf,

    /// Dataset config JSON providing the slot schema
    #[arg(long)]
    dataset_config: Option<PathBuf>,

    /// Comma-separated slot schema (overrides --dataset-config)
    #[arg(long, value_delimiter = ',')]
    slots: Vec<String>,

    /// Carry earlier turns into each example's history
    #[arg(long)]
    append_history: bool,

    /// Keep span labels in the history labels
    #[arg(long)]
    use_history_labels: bool,

    /// Put the user utterance first
    #[arg(long)]
    swap_utterances: bool,

    /// Replace system-utterance value spans with [UNK]
    #[arg(long)]
    delexicalize_sys_utts: bool,

    /// Use the first matching span instead of the last
    #[arg(long)]
    first_occurrence: bool,

    /// Search system spans even when the user utterance matched
    #[arg(long)]
    check_system_after_user_match: bool,

    /// Maximum sequential augmentation window (extra turns); 0 disables
    #[arg(long, default_value = "0")]
    seq_num: usize,

    /// History perturbation for the dev split (0 off, 1 shuffle utterances,
    /// 2 reverse utterances, 3 shuffle words, 4 reverse words)
    #[arg(long, default_value = "0")]
    dev_perturbation: u8,

    /// History perturbation for the test split (same modes as dev)
    #[arg(long, default_value = "0")]
    test_perturbation: u8,

    /// Seed for history perturbation
    #[arg(long, default_value_t = DEFAULT_PERTURBATION_SEED)]
    perturbation_seed: u64,

    /// Only process the first 10 dialogues of each corpus
    #[arg(long)]
    dev_mode: bool,
}

fn load_slots(args: &Args) -> Result<Vec<String>> {
    if !args.slots.is_empty() {
        return Ok(args.slots.clone());
    }
    match &args.dataset_config {
        Some(path) => {
            let dataset = DatasetConfig::load(path)
                .with_context(|| format!("failed to load dataset config {:?}", path))?;
            Ok(dataset.slots)
        }
        None => bail!("a slot schema is required: pass --slots or --dataset-config"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = PipelineConfig {
        slots: load_slots(&args)?,
        append_history: args.append_history,
        use_history_labels: args.use_history_labels,
        swap_utterances: args.swap_utterances,
        delexicalize_sys_utts: args.delexicalize_sys_utts,
        match_policy: MatchPolicy {
            occurrence: if args.first_occurrence {
                Occurrence::First
            } else {
                Occurrence::Last
            },
            check_system_after_user_match: args.check_system_after_user_match,
        },
        seq_num: args.seq_num,
        dev_perturbation: HistoryPerturbation::try_from(args.dev_perturbation)?,
        test_perturbation: HistoryPerturbation::try_from(args.test_perturbation)?,
        perturbation_seed: args.perturbation_seed,
        dev_mode: args.dev_mode,
    };

    info!(slots = config.slots.len(), data_dir = ?args.data_dir, "processing corpora");
    let result: PipelineResult = run_pipeline(&args.data_dir, &args.output_dir, &SimTokenizer, &config)?;

    let metadata_path = args.output_dir.join("metadata.json");
    let metadata = serde_json::json!({
        "config": config,
        "data_dir": args.data_dir.to_string_lossy(),
        "output_dir": args.output_dir.to_string_lossy(),
        "counts": {
            "total_dialogues": result.total_dialogues,
            "total_examples": result.total_examples,
        },
        "splits": result.splits,
    });
    std::fs::write(&metadata_path, serde_json::to_string_pretty(&metadata)?)?;

    println!("\n[summary]");
    println!("  Total dialogues processed: {}", result.total_dialogues);
    println!("  Total examples: {}", result.total_examples);
    for split in &result.splits {
        println!(
            "  {} ({}): {} dialogues, {} turn examples, {} augmented -> {}",
            split.split,
            split.source_path,
            split.dialogues,
            split.turn_examples,
            split.augmented_examples,
            split.output_path
        );
    }
    println!("  Metadata: {:?}", metadata_path);

    Ok(())
}
