//! Small, independent command-line utilities for conversational training
//! datasets stored as JSONL, CSV, or Parquet.
//!
//! Each subcommand is one narrow transformation over "a JSON object per
//! line": schema renaming, format conversion, validation, light analytics,
//! and row/column filtering or merging. The tools share only the record
//! shape convention and this crate's I/O helpers; none of them invoke each
//! other.
//!
//! ## Main Components
//!
//! - `data`: the `Record`/`Message` model, JSONL loaders, schema and format
//!   conversion, Hub dataset download
//! - `order`: the role-sequence anomaly scanner
//! - `validate`: tolerant per-line JSONL checking
//! - `tokens`: token counting via a Hub tokenizer

pub mod data;
pub mod order;
pub mod tokens;
pub mod validate;

pub use data::{Message, Record};
pub use order::{scan, Finding, PatternKind};
