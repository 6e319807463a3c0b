//! Role-sequence anomaly scanner for chat datasets.
//!
//! Flags positions where an assistant turn is followed by one or two more
//! assistant turns and then a user turn, which usually means conversations
//! were stitched together or split incorrectly during augmentation.
//!
//! The scan is a fixed-width sliding window over each record's role labels.
//! Windows overlap: every start index is examined on its own, so adjacent or
//! nested runs are all reported, not just the first in a run.

use crate::data::{Message, Record, ROLE_ASSISTANT, ROLE_USER};
use std::fmt;

/// Which suspicious role ordering matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// assistant, assistant, user
    DoubleAssistantThenUser,
    /// assistant, assistant, assistant, user
    TripleAssistantThenUser,
}

/// One reported anomaly: which row (1-based, matching the line numbering of
/// the source file), which message index (0-based), and which pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Finding {
    pub record: usize,
    pub index: usize,
    pub kind: PatternKind,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PatternKind::DoubleAssistantThenUser => write!(
                f,
                "Row {}, Index {}: Assistant message followed by another assistant message and then user message.",
                self.record, self.index
            ),
            PatternKind::TripleAssistantThenUser => write!(
                f,
                "Row {}, Index {}: Assistant message followed by two more assistant messages and then user message.",
                self.record, self.index
            ),
        }
    }
}

/// Scan records in order, yielding findings lazily in encounter order: by
/// row, then by message index, shorter pattern first at the same index.
pub fn scan<'a, I>(records: I) -> impl Iterator<Item = Finding> + 'a
where
    I: IntoIterator<Item = &'a Record> + 'a,
{
    records
        .into_iter()
        .enumerate()
        .flat_map(|(i, record)| scan_messages(i + 1, &record.messages))
}

/// Windowed scan over one record's roles. Roles other than `assistant` and
/// `user` (including unknown ones) never match; a window that would run past
/// the end of the sequence is treated as a non-match rather than an error.
pub fn scan_messages(record: usize, messages: &[Message]) -> Vec<Finding> {
    let roles: Vec<&str> = messages.iter().map(|m| m.role.as_str()).collect();
    let mut findings = Vec::new();
    for index in 0..roles.len().saturating_sub(2) {
        if roles[index] != ROLE_ASSISTANT || roles[index + 1] != ROLE_ASSISTANT {
            continue;
        }
        if roles[index + 2] == ROLE_USER {
            findings.push(Finding {
                record,
                index,
                kind: PatternKind::DoubleAssistantThenUser,
            });
        }
        if roles[index + 2] == ROLE_ASSISTANT && roles.get(index + 3).copied() == Some(ROLE_USER) {
            findings.push(Finding {
                record,
                index,
                kind: PatternKind::TripleAssistantThenUser,
            });
        }
    }
    findings
}
