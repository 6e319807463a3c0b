//! Shared record model and JSONL I/O for conversational datasets.
//!
//! Every tool in this crate works on the same convention: one JSON object per
//! line, with chat data carried in a `messages` list of `{role, content}`
//! objects. The loaders here fail fast on the first bad line; the `validate`
//! module is the one place that tolerates and reports instead.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

pub mod convert;
pub mod formats;
pub mod hub;

pub const ROLE_SYSTEM: &str = "system";
pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";

#[derive(Debug, Error)]
pub enum DataError {
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}, line {line}: invalid JSON: {source}")]
    MalformedLine {
        path: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path}, line {line}: 'messages' is missing or not a list")]
    MissingMessages { path: String, line: usize },
}

/// One turn in a conversation. Unknown roles are allowed; unknown fields ride
/// along untouched so rewritten files stay faithful to their input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: Value::String(content.to_string()),
            extra: Map::new(),
        }
    }

    pub fn into_value(self) -> Value {
        let mut obj = Map::new();
        obj.insert("role".to_string(), Value::String(self.role));
        obj.insert("content".to_string(), self.content);
        obj.extend(self.extra);
        Value::Object(obj)
    }
}

/// One decoded input line: an ordered message sequence plus whatever other
/// fields the row carried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub messages: Vec<Message>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record {
    /// Build a record from a decoded line. Returns `None` when the value is
    /// not an object, `messages` is absent, or `messages` is not a list of
    /// objects; the caller turns that into a `MissingMessages` error naming
    /// the offending line.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut obj) = value else {
            return None;
        };
        let Value::Array(items) = obj.remove("messages")? else {
            return None;
        };
        let mut messages = Vec::with_capacity(items.len());
        for item in items {
            messages.push(serde_json::from_value::<Message>(item).ok()?);
        }
        Some(Self {
            messages,
            extra: obj,
        })
    }

    pub fn into_value(self) -> Value {
        let mut obj = Map::new();
        obj.insert(
            "messages".to_string(),
            Value::Array(self.messages.into_iter().map(Message::into_value).collect()),
        );
        obj.extend(self.extra);
        Value::Object(obj)
    }
}

/// Load a JSONL chat dataset, one `Record` per non-empty line in file order.
/// The first undecodable line or missing `messages` field aborts the load.
pub fn load_records(path: &Path) -> Result<Vec<Record>, DataError> {
    let display = path.display().to_string();
    let file = File::open(path).map_err(|source| DataError::Io {
        path: display.clone(),
        source,
    })?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let lineno = idx + 1;
        let line = line.map_err(|source| DataError::Io {
            path: display.clone(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value =
            serde_json::from_str(&line).map_err(|source| DataError::MalformedLine {
                path: display.clone(),
                line: lineno,
                source,
            })?;
        let record = Record::from_value(value).ok_or_else(|| DataError::MissingMessages {
            path: display.clone(),
            line: lineno,
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Load a JSONL file as free-form rows, for tools that do not care about the
/// chat schema. Still fail-fast on invalid JSON.
pub fn load_values(path: &Path) -> Result<Vec<Value>, DataError> {
    let display = path.display().to_string();
    let file = File::open(path).map_err(|source| DataError::Io {
        path: display.clone(),
        source,
    })?;
    let reader = BufReader::new(file);
    let mut rows = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let lineno = idx + 1;
        let line = line.map_err(|source| DataError::Io {
            path: display.clone(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value =
            serde_json::from_str(&line).map_err(|source| DataError::MalformedLine {
                path: display.clone(),
                line: lineno,
                source,
            })?;
        rows.push(value);
    }
    Ok(rows)
}

/// Write rows as line-delimited JSON, one object per line.
pub fn write_jsonl<T: Serialize>(path: &Path, rows: &[T]) -> anyhow::Result<()> {
    use anyhow::Context;
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for row in rows {
        serde_json::to_writer(&mut out, row)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}
