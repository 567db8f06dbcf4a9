//! Protocol fingerprinting.
//!
//! Input is parsed once into an untyped JSON value, classified by which
//! keys are present, then decoded into the matching typed shape. Checks
//! run in a fixed order because the Cursor dialect is a superset of the
//! Claude Code one (both carry `hook_event_name`).

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::event::NormalizedEvent;
use crate::parse::{ClaudeHook, CodexTurnComplete, CursorHook};

/// Why a payload could not be turned into a [`NormalizedEvent`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectError {
    /// Well-formed JSON that matches no known hook protocol
    #[error("Unrecognized hook format: {0}")]
    UnrecognizedFormat(String),

    /// Bytes are not valid JSON, or a recognized payload has bad fields
    #[error("Malformed hook payload: {0}")]
    MalformedPayload(String),
}

const HOOK_EVENT_NAME: &str = "hook_event_name";
const CONVERSATION_ID: &str = "conversation_id";

/// Classifies raw hook bytes and decodes them into one normalized event.
pub fn detect(bytes: &[u8]) -> Result<NormalizedEvent, DetectError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| DetectError::MalformedPayload(e.to_string()))?;

    let Some(object) = value.as_object() else {
        return Err(DetectError::UnrecognizedFormat(format!(
            "expected a JSON object, got {}",
            json_kind(&value)
        )));
    };

    if is_turn_complete(object) {
        debug!("Detected Codex turn-complete record");
        let turn = CodexTurnComplete::deserialize(&value).map_err(malformed)?;
        return Ok(NormalizedEvent::from_codex(turn));
    }

    if object.contains_key(HOOK_EVENT_NAME) {
        require_event_name(object)?;

        if object.contains_key(CONVERSATION_ID) {
            debug!("Detected Cursor hook");
            let hook = CursorHook::from_value(&value).map_err(malformed)?;
            return Ok(NormalizedEvent::from_cursor(hook));
        }

        debug!("Detected Claude Code hook");
        let hook = ClaudeHook::from_value(&value).map_err(malformed)?;
        return Ok(NormalizedEvent::from_claude(hook));
    }

    let mut keys: Vec<&str> = object.keys().map(String::as_str).take(8).collect();
    keys.sort_unstable();
    Err(DetectError::UnrecognizedFormat(format!(
        "no known fingerprint among keys [{}]",
        keys.join(", ")
    )))
}

/// True if a CLI argument should be treated as the hook payload itself.
pub fn looks_like_json_object(arg: &str) -> bool {
    arg.trim_start().starts_with('{')
}

fn is_turn_complete(object: &Map<String, Value>) -> bool {
    object.get("type").and_then(Value::as_str) == Some(CodexTurnComplete::TYPE_TAG)
}

fn require_event_name(object: &Map<String, Value>) -> Result<(), DetectError> {
    match object.get(HOOK_EVENT_NAME).and_then(Value::as_str) {
        Some(name) if !name.trim().is_empty() => Ok(()),
        Some(_) => Err(DetectError::MalformedPayload(
            "hook_event_name is empty".to_string(),
        )),
        None => Err(DetectError::MalformedPayload(
            "hook_event_name is not a string".to_string(),
        )),
    }
}

fn malformed(e: serde_json::Error) -> DetectError {
    DetectError::MalformedPayload(e.to_string())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventKind, Source};

    #[test]
    fn test_empty_input_is_malformed() {
        assert!(matches!(detect(b""), Err(DetectError::MalformedPayload(_))));
        assert!(matches!(detect(b"   \n"), Err(DetectError::MalformedPayload(_))));
    }

    #[test]
    fn test_non_object_is_unrecognized() {
        let inputs: [&[u8]; 4] = [b"[1,2]", b"\"Stop\"", b"42", b"null"];
        for input in inputs {
            assert!(matches!(
                detect(input),
                Err(DetectError::UnrecognizedFormat(_))
            ));
        }
    }

    #[test]
    fn test_unknown_keys_listed_in_error() {
        let err = detect(br#"{"event":"x","id":"y"}"#).unwrap_err();
        assert_eq!(
            err,
            DetectError::UnrecognizedFormat("no known fingerprint among keys [event, id]".into())
        );
    }

    #[test]
    fn test_other_type_tag_is_not_codex() {
        let err = detect(br#"{"type":"approval-requested","thread-id":"t"}"#).unwrap_err();
        assert!(matches!(err, DetectError::UnrecognizedFormat(_)));
    }

    #[test]
    fn test_turn_complete_wins_over_hook_event_name() {
        let event = detect(
            br#"{"type":"agent-turn-complete","hook_event_name":"Stop","thread-id":"t"}"#,
        )
        .unwrap();
        assert_eq!(event.source(), Source::Codex);
    }

    #[test]
    fn test_empty_event_name_is_malformed() {
        let err = detect(br#"{"hook_event_name":"","session_id":"s"}"#).unwrap_err();
        assert!(matches!(err, DetectError::MalformedPayload(_)));
        let err = detect(br#"{"hook_event_name":7,"session_id":"s"}"#).unwrap_err();
        assert!(matches!(err, DetectError::MalformedPayload(_)));
    }

    #[test]
    fn test_missing_session_id_is_unknown_session() {
        let event = detect(br#"{"hook_event_name":"SessionStart"}"#).unwrap();
        assert!(event.session_id.is_unknown());
        assert_eq!(event.kind(), EventKind::SessionStart);
    }

    #[test]
    fn test_looks_like_json_object() {
        assert!(looks_like_json_object(r#"  {"type":"x"}"#));
        assert!(!looks_like_json_object("Stop"));
        assert!(!looks_like_json_object(""));
    }
}
