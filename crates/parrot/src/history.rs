//! Append-only log of what each hook dispatch did.
//!
//! One JSON object per line in `<state>/history/YYYY-MM-DD.jsonl`, dated
//! in local time. Writes are single `O_APPEND` writes of one line, so
//! concurrent hook processes interleave whole records.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// One dispatch outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub timestamp: DateTime<Local>,
    /// `claude_code`, `codex`, `cursor`, or `unknown` when detection failed
    pub source: String,
    pub event: String,
    pub session_id: String,
    /// Short label of what happened, e.g. `spoke` or `skipped_duplicate`
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub duration_ms: u64,
}

/// Writes records into one file per day.
#[derive(Debug, Clone)]
pub struct History {
    dir: PathBuf,
}

impl History {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn file_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}.jsonl", date.format("%Y-%m-%d")))
    }

    pub fn append(&self, record: &HistoryRecord) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let path = self.file_for(record.timestamp.date_naive());
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(line.as_bytes())
    }

    /// Reads a day's records, skipping lines that do not parse.
    pub fn read_day(&self, date: NaiveDate) -> io::Result<Vec<HistoryRecord>> {
        read_records(&self.file_for(date))
    }
}

fn read_records(path: &Path) -> io::Result<Vec<HistoryRecord>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(contents
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(action: &str) -> HistoryRecord {
        HistoryRecord {
            timestamp: Local::now(),
            source: "codex".to_string(),
            event: "agent-turn-complete".to_string(),
            session_id: "t1".to_string(),
            action: action.to_string(),
            detail: None,
            duration_ms: 12,
        }
    }

    #[test]
    fn test_append_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path().join("history"));

        let first = record("spoke");
        let second = HistoryRecord {
            detail: Some("duplicate".to_string()),
            ..record("skipped")
        };
        history.append(&first).unwrap();
        history.append(&second).unwrap();

        let today = first.timestamp.date_naive();
        let records = history.read_day(today).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].action, "spoke");
        assert_eq!(records[1].detail.as_deref(), Some("duplicate"));
    }

    #[test]
    fn test_file_named_by_date() {
        let history = History::new("/state/history");
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(
            history.file_for(date),
            PathBuf::from("/state/history/2026-03-07.jsonl")
        );
    }

    #[test]
    fn test_missing_day_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path());
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert!(history.read_day(date).unwrap().is_empty());
    }
}
