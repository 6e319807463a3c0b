//! Tolerant JSONL validation: report every problem line, never abort.
//!
//! This is the opposite policy from `data::load_records`, which fails on the
//! first bad line. The validator exists to survey a whole file at once, so it
//! keeps going and tallies what it saw.

use anyhow::Context;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ValidationSummary {
    pub lines: usize,
    pub empty_lines: usize,
    pub invalid_json: usize,
    pub bad_messages: usize,
}

impl ValidationSummary {
    pub fn is_clean(&self) -> bool {
        self.invalid_json == 0 && self.bad_messages == 0
    }
}

/// Check every line of a JSONL file, writing the report to `out`: a warning
/// per empty line, an error plus the offending content when a line is not
/// valid JSON or its `messages` field is not a list.
pub fn validate_file<W: Write>(path: &Path, out: &mut W) -> anyhow::Result<ValidationSummary> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut summary = ValidationSummary::default();

    for (idx, line) in reader.lines().enumerate() {
        let line_number = idx + 1;
        let line = line?;
        let trimmed = line.trim();
        summary.lines += 1;

        if trimmed.is_empty() {
            writeln!(out, "Warning: Empty line at line {line_number}")?;
            summary.empty_lines += 1;
            continue;
        }

        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => {
                let messages_is_list =
                    value.get("messages").map(Value::is_array).unwrap_or(false);
                if !messages_is_list {
                    writeln!(out, "Error in line {line_number}: 'messages' is not a list")?;
                    writeln!(out, "Content: {trimmed}")?;
                    writeln!(out, "---")?;
                    summary.bad_messages += 1;
                }
            }
            Err(err) => {
                writeln!(out, "JSON decode error in line {line_number}: {err}")?;
                writeln!(out, "Content: {trimmed}")?;
                writeln!(out, "---")?;
                summary.invalid_json += 1;
            }
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn run(content: &str) -> (ValidationSummary, String) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.jsonl");
        std::fs::write(&path, content).unwrap();
        let mut out = Vec::new();
        let summary = validate_file(&path, &mut out).unwrap();
        (summary, String::from_utf8(out).unwrap())
    }

    #[test]
    fn clean_file_produces_no_report() {
        let (summary, report) = run("{\"messages\": []}\n{\"messages\": [{\"role\": \"user\"}]}\n");
        assert!(summary.is_clean());
        assert_eq!(summary.lines, 2);
        assert!(report.is_empty());
    }

    #[test]
    fn reports_continue_past_bad_lines() {
        let content = "not json\n\n{\"messages\": \"invalid\"}\n{\"messages\": []}\n";
        let (summary, report) = run(content);
        assert_eq!(summary.invalid_json, 1);
        assert_eq!(summary.empty_lines, 1);
        assert_eq!(summary.bad_messages, 1);
        assert_eq!(summary.lines, 4);
        assert!(report.contains("JSON decode error in line 1"));
        assert!(report.contains("Warning: Empty line at line 2"));
        assert!(report.contains("Error in line 3: 'messages' is not a list"));
        assert!(report.contains("Content: {\"messages\": \"invalid\"}"));
    }
}
