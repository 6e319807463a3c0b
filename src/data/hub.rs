//! Hugging Face Hub dataset access.
//!
//! Datasets are fetched through the sync hf-hub API (which caches downloads
//! under the usual HF cache dir), then decoded from their Parquet shards into
//! one JSON object per row.

use anyhow::{bail, Context, Result};
use arrow::json::LineDelimitedWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, Cursor};
use std::path::{Path, PathBuf};

/// Download every Parquet shard of a Hub dataset repo and decode it, row
/// order preserved within and across shards (shards sorted by name).
pub fn fetch_dataset_rows(dataset_id: &str) -> Result<Vec<Value>> {
    let files = fetch_parquet_files(dataset_id)?;
    if files.is_empty() {
        bail!("dataset '{dataset_id}' has no parquet files");
    }
    let mut rows = Vec::new();
    for path in &files {
        rows.extend(parquet_rows(path)?);
    }
    tracing::info!(dataset = dataset_id, rows = rows.len(), "dataset loaded");
    Ok(rows)
}

fn fetch_parquet_files(dataset_id: &str) -> Result<Vec<PathBuf>> {
    let api = hf_hub::api::sync::Api::new().context("failed to build hf-hub API")?;
    let repo = api.dataset(dataset_id.to_string());
    let info = repo
        .info()
        .with_context(|| format!("failed to fetch repo info for '{dataset_id}'"))?;

    let mut names: Vec<String> = info
        .siblings
        .into_iter()
        .map(|s| s.rfilename)
        .filter(|name| name.ends_with(".parquet"))
        .collect();
    names.sort();

    let mut paths = Vec::with_capacity(names.len());
    for name in names {
        tracing::info!(dataset = dataset_id, file = %name, "downloading");
        let path = repo
            .get(&name)
            .with_context(|| format!("failed to download '{name}' from '{dataset_id}'"))?;
        paths.push(path);
    }
    Ok(paths)
}

/// Decode one Parquet file into JSON rows by way of Arrow's line-delimited
/// JSON writer.
fn parquet_rows(path: &Path) -> Result<Vec<Value>> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("failed to read {}", path.display()))?
        .build()?;

    let mut buf = Vec::new();
    let mut writer = LineDelimitedWriter::new(&mut buf);
    for batch in reader {
        writer.write(&batch?)?;
    }
    writer.finish()?;
    drop(writer);

    let mut rows = Vec::new();
    for line in Cursor::new(buf).lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        rows.push(serde_json::from_str(&line)?);
    }
    Ok(rows)
}
