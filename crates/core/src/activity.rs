//! Append-only activity feed shown alongside the job view.

use chrono::Utc;
use serde::Serialize;

use crate::types::Timestamp;

/// Who produced an activity entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    Agent,
    User,
    System,
}

/// Display severity of an activity entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Question,
    Error,
}

/// One immutable entry in the activity feed.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    /// Locally-assigned sequence number, unique within one log.
    pub id: u64,
    pub text: String,
    pub sender: Sender,
    pub severity: Severity,
    pub timestamp: Timestamp,
}

/// Append-only log of activity entries.
///
/// Entries are never mutated or removed; unbounded growth is acceptable
/// for a single-session view.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ActivityLog {
    entries: Vec<ActivityEntry>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, assigning the next sequence id.
    pub fn push(&mut self, sender: Sender, severity: Severity, text: impl Into<String>) {
        let id = self.entries.len() as u64 + 1;
        self.entries.push(ActivityEntry {
            id,
            text: text.into(),
            sender,
            severity,
            timestamp: Utc::now(),
        });
    }

    pub fn entries(&self) -> &[ActivityEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count entries whose text equals `text` exactly. Test helper for
    /// asserting once-only side effects.
    pub fn count_of(&self, text: &str) -> usize {
        self.entries.iter().filter(|e| e.text == text).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_assigns_sequential_ids() {
        let mut log = ActivityLog::new();
        log.push(Sender::System, Severity::Info, "one");
        log.push(Sender::Agent, Severity::Success, "two");

        let entries = log.entries();
        assert_eq!(entries[0].id, 1);
        assert_eq!(entries[1].id, 2);
    }

    #[test]
    fn count_of_matches_exact_text() {
        let mut log = ActivityLog::new();
        log.push(Sender::System, Severity::Info, "hello");
        log.push(Sender::System, Severity::Info, "hello");
        log.push(Sender::System, Severity::Info, "hello world");

        assert_eq!(log.count_of("hello"), 2);
    }
}
