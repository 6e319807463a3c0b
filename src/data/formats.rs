//! CSV/JSONL/Parquet interconversion.
//!
//! Arrow's schema inference stands in for the pandas DataFrame round trip:
//! each converter infers a schema from the input, streams record batches
//! through, and writes them out in the target format.

use anyhow::{bail, Context, Result};
use arrow::csv as arrow_csv;
use arrow::json::reader::infer_json_schema_from_seekable;
use arrow::json::{LineDelimitedWriter, ReaderBuilder};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Cursor, Seek};
use std::path::Path;
use std::sync::Arc;

pub fn csv_to_jsonl(input: &Path, output: &Path) -> Result<()> {
    let mut file =
        File::open(input).with_context(|| format!("failed to open {}", input.display()))?;
    let format = arrow_csv::reader::Format::default().with_header(true);
    let (schema, _) = format
        .infer_schema(&mut file, None)
        .context("failed to infer CSV schema")?;
    file.rewind()?;
    let reader = arrow_csv::ReaderBuilder::new(Arc::new(schema))
        .with_header(true)
        .build(file)
        .context("failed to open CSV reader")?;

    let out =
        File::create(output).with_context(|| format!("failed to create {}", output.display()))?;
    let mut writer = LineDelimitedWriter::new(out);
    for batch in reader {
        writer.write(&batch.context("failed to read CSV batch")?)?;
    }
    writer.finish()?;
    Ok(())
}

pub fn parquet_to_jsonl(input: &Path, output: &Path) -> Result<()> {
    let file =
        File::open(input).with_context(|| format!("failed to open {}", input.display()))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("failed to open Parquet reader")?
        .build()?;

    let out =
        File::create(output).with_context(|| format!("failed to create {}", output.display()))?;
    let mut writer = LineDelimitedWriter::new(out);
    for batch in reader {
        writer.write(&batch.context("failed to read Parquet batch")?)?;
    }
    writer.finish()?;
    Ok(())
}

pub fn jsonl_to_parquet(input: &Path, output: &Path) -> Result<()> {
    let mut reader = BufReader::new(
        File::open(input).with_context(|| format!("failed to open {}", input.display()))?,
    );
    let (schema, _) = infer_json_schema_from_seekable(&mut reader, None)
        .context("failed to infer JSONL schema")?;
    let schema = Arc::new(schema);
    let json_reader = ReaderBuilder::new(schema.clone())
        .build(reader)
        .context("failed to open JSONL reader")?;

    let out =
        File::create(output).with_context(|| format!("failed to create {}", output.display()))?;
    let mut writer =
        ArrowWriter::try_new(out, schema, None).context("failed to open Parquet writer")?;
    for batch in json_reader {
        writer.write(&batch.context("failed to read JSONL batch")?)?;
    }
    writer.close()?;
    Ok(())
}

pub fn jsonl_to_csv(input: &Path, output: &Path) -> Result<()> {
    let mut reader = BufReader::new(
        File::open(input).with_context(|| format!("failed to open {}", input.display()))?,
    );
    let (schema, _) = infer_json_schema_from_seekable(&mut reader, None)
        .context("failed to infer JSONL schema")?;
    let json_reader = ReaderBuilder::new(Arc::new(schema))
        .build(reader)
        .context("failed to open JSONL reader")?;

    let out =
        File::create(output).with_context(|| format!("failed to create {}", output.display()))?;
    let mut writer = arrow_csv::WriterBuilder::new().with_header(true).build(out);
    for batch in json_reader {
        writer.write(&batch.context("failed to read JSONL batch")?)?;
    }
    Ok(())
}

/// Write free-form JSON rows to a Parquet file, inferring the schema from
/// the rows themselves.
pub fn write_parquet_rows(rows: &[Value], output: &Path) -> Result<()> {
    if rows.is_empty() {
        bail!("no rows to write to {}", output.display());
    }
    let mut buf = Vec::new();
    for row in rows {
        serde_json::to_writer(&mut buf, row)?;
        buf.push(b'\n');
    }
    let mut cursor = Cursor::new(buf);
    let (schema, _) =
        infer_json_schema_from_seekable(&mut cursor, None).context("failed to infer row schema")?;
    let schema = Arc::new(schema);
    let reader = ReaderBuilder::new(schema.clone()).build(cursor)?;

    let out =
        File::create(output).with_context(|| format!("failed to create {}", output.display()))?;
    let mut writer =
        ArrowWriter::try_new(out, schema, None).context("failed to open Parquet writer")?;
    for batch in reader {
        writer.write(&batch?)?;
    }
    writer.close()?;
    Ok(())
}
