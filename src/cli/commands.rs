//! CLI command implementations
//!
//! Each command is a thin shell over the library modules: parse arguments,
//! run one pass over the input, print the result. Report text written to
//! stdout here is part of each tool's contract and is kept stable.

use anyhow::{anyhow, Context, Result};
use indicatif::ProgressBar;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::{json, Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use convoset::data::{self, convert, formats, hub, ROLE_ASSISTANT, ROLE_USER};
use convoset::tokens::{TokenCounter, DEFAULT_TOKENIZER_REPO};
use convoset::{order, validate as validation};

use super::Conversion;

/// Scan a chat dataset for suspicious role orderings. Prints one line per
/// finding; a clean file prints nothing.
pub fn check_order(input: &Path) -> Result<()> {
    let records = data::load_records(input)?;
    for finding in order::scan(&records) {
        println!("{finding}");
    }
    Ok(())
}

/// Report malformed lines and bad 'messages' fields without aborting.
pub fn validate(input: &Path) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    let summary = validation::validate_file(input, &mut stdout)?;
    tracing::info!(
        lines = summary.lines,
        empty = summary.empty_lines,
        invalid_json = summary.invalid_json,
        bad_messages = summary.bad_messages,
        "validation finished"
    );
    Ok(())
}

/// Rewrite 'conversations' rows as 'messages' rows. The input is a local
/// JSONL file when the path exists, otherwise a Hub dataset id.
pub fn convert(input: &str, output: &Path) -> Result<()> {
    let rows = if Path::new(input).is_file() {
        data::load_values(Path::new(input))?
    } else {
        hub::fetch_dataset_rows(input)?
    };

    let converted = rows
        .into_iter()
        .map(convert::process_row)
        .collect::<Result<Vec<_>>>()?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    data::write_jsonl(output, &converted)?;
    println!("Converted dataset saved to {}", output.display());
    Ok(())
}

/// Convert between CSV, JSONL and Parquet.
pub fn format(input: &Path, output: &Path, conversion: Conversion) -> Result<()> {
    match conversion {
        Conversion::CsvToJsonl => {
            formats::csv_to_jsonl(input, output)?;
            println!("Conversion complete. JSONL file saved as {}", output.display());
        }
        Conversion::ParquetToJsonl => {
            formats::parquet_to_jsonl(input, output)?;
            println!("Conversion complete. JSONL file saved as {}", output.display());
        }
        Conversion::JsonlToParquet => {
            formats::jsonl_to_parquet(input, output)?;
            println!("Conversion complete. Parquet file saved as {}", output.display());
        }
        Conversion::JsonlToCsv => {
            formats::jsonl_to_csv(input, output)?;
            println!("Conversion complete. CSV file saved as {}", output.display());
        }
    }
    Ok(())
}

/// Merge Hub datasets into one Parquet file, with optional per-row column
/// renames and drops applied before concatenation.
pub fn merge(
    datasets: &str,
    output: &Path,
    rename_columns: Option<&str>,
    drop_columns: Option<&str>,
) -> Result<()> {
    let renames: Option<Map<String, Value>> = rename_columns
        .map(serde_json::from_str)
        .transpose()
        .context("--rename-columns must be a JSON object of old -> new names")?;
    let drops: Vec<&str> = drop_columns
        .map(|s| s.split(',').map(str::trim).collect())
        .unwrap_or_default();

    let mut combined = Vec::new();
    for id in datasets.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        for mut row in hub::fetch_dataset_rows(id)? {
            if let Value::Object(obj) = &mut row {
                if let Some(renames) = &renames {
                    for (old, new) in renames {
                        if let (Some(new_name), Some(value)) = (new.as_str(), obj.remove(old)) {
                            obj.insert(new_name.to_string(), value);
                        }
                    }
                }
                for column in &drops {
                    obj.remove(*column);
                }
            }
            combined.push(row);
        }
    }

    formats::write_parquet_rows(&combined, output)?;
    println!("Merged dataset saved to {}", output.display());
    Ok(())
}

/// Keep only the listed CSV columns, in the order given.
pub fn filter_columns(input: &Path, output: &Path, columns: &str) -> Result<()> {
    let keep: Vec<String> = columns
        .split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    let mut reader = csv::Reader::from_path(input)
        .with_context(|| format!("failed to open {}", input.display()))?;
    let headers = reader.headers()?.clone();
    let mut indices = Vec::with_capacity(keep.len());
    for name in &keep {
        let idx = headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| anyhow!("column '{name}' not found in {}", input.display()))?;
        indices.push(idx);
    }

    let mut writer = csv::Writer::from_path(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    writer.write_record(&keep)?;
    for result in reader.records() {
        let record = result?;
        writer.write_record(indices.iter().map(|&i| record.get(i).unwrap_or_default()))?;
    }
    writer.flush()?;
    println!("Selected columns have been written to {}", output.display());
    Ok(())
}

/// Render user/assistant turns as Human:/Assistant: text, one blank line
/// between conversations, and report token counts per conversation.
pub fn to_text(input: &Path, output: &Path, tokenizer: Option<&Path>) -> Result<()> {
    let counter = match tokenizer {
        Some(path) => TokenCounter::from_file(path)?,
        None => TokenCounter::from_hub(DEFAULT_TOKENIZER_REPO)?,
    };

    let file =
        File::open(input).with_context(|| format!("failed to open {}", input.display()))?;
    let out =
        File::create(output).with_context(|| format!("failed to create {}", output.display()))?;
    let mut out = BufWriter::new(out);

    let mut total_tokens = 0usize;
    let mut conversations = 0usize;

    for line in BufReader::new(file).lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record: Value = match serde_json::from_str(trimmed) {
            Ok(value) => value,
            Err(_) => {
                println!("Skipping invalid JSON: {trimmed}");
                continue;
            }
        };
        let Some(messages) = record.get("messages").and_then(Value::as_array) else {
            println!("Skipping invalid JSON: {trimmed}");
            continue;
        };

        let mut conversation_tokens = 0usize;
        for message in messages {
            let role = message.get("role").and_then(Value::as_str).unwrap_or_default();
            let content = message
                .get("content")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let rendered = match role {
                ROLE_USER => format!("Human: {content}\n"),
                ROLE_ASSISTANT => format!("Assistant: {content}\n"),
                _ => continue,
            };
            out.write_all(rendered.as_bytes())?;
            conversation_tokens += counter.count(&rendered)?;
        }
        out.write_all(b"\n")?;

        conversations += 1;
        total_tokens += conversation_tokens;
        println!("Conversation {conversations}: {conversation_tokens} tokens");
    }
    out.flush()?;

    println!();
    println!("Total conversations: {conversations}");
    println!("Total tokens: {total_tokens}");
    if conversations > 0 {
        println!(
            "Average tokens per conversation: {:.2}",
            total_tokens as f64 / conversations as f64
        );
    }
    Ok(())
}

/// Render KTO preference rows as Query:/Response:/Label: text blocks.
pub fn kto_to_text(input: &Path, output: &Path) -> Result<()> {
    let file =
        File::open(input).with_context(|| format!("failed to open {}", input.display()))?;
    let out =
        File::create(output).with_context(|| format!("failed to create {}", output.display()))?;
    let mut out = BufWriter::new(out);

    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row: Value = serde_json::from_str(&line)?;
        let query = row.get("query").and_then(Value::as_str).unwrap_or_default();
        let response = row
            .get("response")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let label = row
            .get("label")
            .map(|v| v.to_string())
            .unwrap_or_default();
        write!(out, "Query: {query}\nResponse: {response}\nLabel: {label}\n\n")?;
    }
    out.flush()?;
    println!("Conversion complete. Output saved to {}", output.display());
    Ok(())
}

/// Draw a seedable uniform random subset of a Hub dataset and save it as
/// JSONL.
pub fn sample(dataset: &str, output: &Path, count: usize, seed: Option<u64>) -> Result<()> {
    let rows = hub::fetch_dataset_rows(dataset)?;
    if count > rows.len() {
        anyhow::bail!(
            "requested {count} samples but dataset has only {} rows",
            rows.len()
        );
    }

    let mut rng = StdRng::seed_from_u64(seed.unwrap_or(42));
    let sampled: Vec<&Value> = rows.choose_multiple(&mut rng, count).collect();
    data::write_jsonl(output, &sampled)?;
    println!(
        "{count} random samples have been extracted and saved to '{}'",
        output.display()
    );
    Ok(())
}

/// Drop each record's final message when it is from the user.
pub fn strip_trailing_user(input: &Path, output: &Path) -> Result<()> {
    let mut rows = data::load_values(input)?;
    for row in &mut rows {
        convert::strip_trailing_user(row);
    }
    data::write_jsonl(output, &rows)?;
    Ok(())
}

/// Flatten nested message payloads, put the system turn first, and write
/// both JSONL and Parquet outputs. Bad lines are skipped with a warning; a
/// row that cannot be normalized becomes an empty conversation.
pub fn transform(input: &Path, output: &Path) -> Result<()> {
    let file =
        File::open(input).with_context(|| format!("failed to open {}", input.display()))?;
    let mut rows = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(&line) {
            Ok(value) => rows.push(value),
            Err(_) => tracing::warn!("skipping row {}: invalid JSON", idx + 1),
        }
    }
    tracing::info!(rows = rows.len(), "loaded dataset");

    let bar = ProgressBar::new(rows.len() as u64);
    let mut transformed = Vec::with_capacity(rows.len());
    for row in &rows {
        let normalized = match convert::normalize_nested(row) {
            Ok(value) => value,
            Err(err) => {
                tracing::error!("failed to transform row: {err}");
                json!({ "messages": [] })
            }
        };
        transformed.push(normalized);
        bar.inc(1);
    }
    bar.finish_and_clear();

    let jsonl_path = output.with_extension("jsonl");
    let parquet_path = output.with_extension("parquet");
    data::write_jsonl(&jsonl_path, &transformed)?;
    formats::write_parquet_rows(&transformed, &parquet_path)?;
    println!(
        "Transformed dataset saved to {} and {}",
        jsonl_path.display(),
        parquet_path.display()
    );
    Ok(())
}
