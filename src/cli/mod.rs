pub mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "convoset")]
#[command(about = "Utilities for conversational fine-tuning datasets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Conversion {
    CsvToJsonl,
    ParquetToJsonl,
    JsonlToParquet,
    JsonlToCsv,
}

#[derive(Subcommand)]
enum Commands {
    /// Report suspicious assistant/user role orderings in a chat dataset
    CheckOrder {
        /// Path to input JSONL file
        input: PathBuf,
    },
    /// Check each line for valid JSON and a list-valued 'messages' field
    Validate {
        /// Path to input JSONL file
        input: PathBuf,
    },
    /// Rewrite 'conversations' (from/value) rows as 'messages' (role/content)
    Convert {
        /// Local JSONL file or Hugging Face dataset id
        input: String,
        /// Path to save the converted JSONL file
        output: PathBuf,
    },
    /// Convert between CSV, JSONL and Parquet
    Format {
        /// Path to input file
        input: PathBuf,
        /// Path to save the converted file
        output: PathBuf,
        /// Which conversion to run
        conversion: Conversion,
    },
    /// Merge Hugging Face datasets into a single Parquet file
    Merge {
        /// Comma-separated list of Hub dataset ids
        datasets: String,
        /// Path to save the merged Parquet file
        output: PathBuf,
        /// JSON object mapping old column names to new ones
        #[arg(long)]
        rename_columns: Option<String>,
        /// Comma-separated list of columns to drop
        #[arg(long)]
        drop_columns: Option<String>,
    },
    /// Keep only the listed columns of a CSV file
    FilterColumns {
        /// Path to input CSV file
        input: PathBuf,
        /// Path to save the filtered CSV file
        output: PathBuf,
        /// Comma-separated list of columns to keep
        columns: String,
    },
    /// Render chat turns as Human:/Assistant: text and count tokens
    ToText {
        /// Path to input JSONL file
        input: PathBuf,
        /// Path to save the rendered text file
        output: PathBuf,
        /// Local tokenizer.json (defaults to fetching gpt2 from the Hub)
        #[arg(long)]
        tokenizer: Option<PathBuf>,
    },
    /// Render KTO preference rows as Query:/Response:/Label: text
    KtoToText {
        /// Path to input JSONL file
        input: PathBuf,
        /// Path to save the rendered text file
        output: PathBuf,
    },
    /// Save a random subset of a Hub dataset as JSONL
    Sample {
        /// Hub dataset id
        dataset: String,
        /// Path to save the sampled JSONL file
        output: PathBuf,
        /// Number of rows to draw
        #[arg(long)]
        count: usize,
        /// RNG seed for reproducible draws
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Drop each record's final message when it is a user turn
    StripTrailingUser {
        /// Path to input JSONL file
        input: PathBuf,
        /// Path to save the processed JSONL file
        output: PathBuf,
    },
    /// Flatten nested message payloads and put the system turn first
    Transform {
        /// Path to input JSONL file
        input: PathBuf,
        /// Output stem; writes <stem>.jsonl and <stem>.parquet
        output: PathBuf,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::CheckOrder { input } => commands::check_order(&input),
        Commands::Validate { input } => commands::validate(&input),
        Commands::Convert { input, output } => commands::convert(&input, &output),
        Commands::Format {
            input,
            output,
            conversion,
        } => commands::format(&input, &output, conversion),
        Commands::Merge {
            datasets,
            output,
            rename_columns,
            drop_columns,
        } => commands::merge(
            &datasets,
            &output,
            rename_columns.as_deref(),
            drop_columns.as_deref(),
        ),
        Commands::FilterColumns {
            input,
            output,
            columns,
        } => commands::filter_columns(&input, &output, &columns),
        Commands::ToText {
            input,
            output,
            tokenizer,
        } => commands::to_text(&input, &output, tokenizer.as_deref()),
        Commands::KtoToText { input, output } => commands::kto_to_text(&input, &output),
        Commands::Sample {
            dataset,
            output,
            count,
            seed,
        } => commands::sample(&dataset, &output, count, seed),
        Commands::StripTrailingUser { input, output } => {
            commands::strip_trailing_user(&input, &output)
        }
        Commands::Transform { input, output } => commands::transform(&input, &output),
    }
}
