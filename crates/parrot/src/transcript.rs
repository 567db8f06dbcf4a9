//! Reads the latest assistant reply from a JSONL transcript.
//!
//! Claude Code appends one JSON record per line. Assistant records look
//! like:
//!
//! ```json
//! {"type":"assistant","message":{"role":"assistant","content":[{"type":"text","text":"..."}]}}
//! ```
//!
//! `content` may also be a plain string, and some hosts write
//! `{"role":"assistant","content":...}` without the `message` wrapper.

use std::fs;
use std::path::Path;

use parrot_core::normalize_for_speech;
use serde_json::Value;

use crate::error::TranscriptError;
use crate::voice::ReadingMode;

/// Returns the speakable text of the last assistant record.
///
/// The text is normalized for speech and shaped by `mode`. Lines that are
/// not valid JSON are skipped.
///
/// # Errors
///
/// `NoAssistantMessage` if the file has no assistant record or the latest
/// one carries no text (a tool-only turn).
pub fn read_last_assistant(
    path: &Path,
    mode: ReadingMode,
    max_chars: usize,
) -> Result<String, TranscriptError> {
    let contents = fs::read_to_string(path).map_err(|source| TranscriptError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let record = contents
        .lines()
        .rev()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .find(is_assistant)
        .ok_or(TranscriptError::NoAssistantMessage)?;

    let raw = record_text(&record);
    let spoken = mode.apply(&normalize_for_speech(&raw), max_chars);
    if spoken.is_empty() {
        return Err(TranscriptError::NoAssistantMessage);
    }
    Ok(spoken)
}

fn is_assistant(record: &Value) -> bool {
    let field_is = |key: &str| record.get(key).and_then(Value::as_str) == Some("assistant");
    field_is("type") || field_is("role")
}

fn record_text(record: &Value) -> String {
    let content = record
        .get("message")
        .and_then(|message| message.get("content"))
        .or_else(|| record.get("content"));

    match content {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Array(blocks)) => blocks
            .iter()
            .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}
