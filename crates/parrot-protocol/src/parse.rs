//! Typed shapes of each supported hook protocol.
//!
//! Fields that a host may omit are `Option<T>` or defaulted so partial
//! payloads still decode; type mismatches are reported by serde. An
//! explicit `null` counts as omitted.

use parrot_core::SessionId;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Decodes `null` the same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Claude Code hooks
// ============================================================================

/// Common envelope shared by every Claude Code hook event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClaudeEnvelope {
    #[serde(default, deserialize_with = "null_as_default")]
    pub session_id: SessionId,
    pub hook_event_name: String,
    #[serde(default)]
    pub transcript_path: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub permission_mode: Option<String>,
}

/// Event-specific part of a Claude Code hook, selected by event name.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaudeEvent {
    UserPromptSubmit {
        prompt: String,
    },
    /// Main agent finished its turn; reply text lives in the transcript
    Stop {
        stop_hook_active: bool,
    },
    SubagentStop {
        stop_hook_active: bool,
        agent_id: Option<String>,
        agent_transcript_path: Option<String>,
    },
    Notification {
        message: String,
        notification_type: Option<String>,
        title: Option<String>,
    },
    /// `source` is one of startup, resume, clear, compact
    SessionStart {
        source: Option<String>,
    },
    SessionEnd {
        reason: Option<String>,
    },
    /// Any event name this version does not know about
    Other,
}

#[derive(Deserialize)]
struct PromptFields {
    #[serde(default, deserialize_with = "null_as_default")]
    prompt: String,
}

#[derive(Deserialize)]
struct StopFields {
    #[serde(default, deserialize_with = "null_as_default")]
    stop_hook_active: bool,
    #[serde(default)]
    agent_id: Option<String>,
    #[serde(default)]
    agent_transcript_path: Option<String>,
}

#[derive(Deserialize)]
struct NotificationFields {
    #[serde(default, deserialize_with = "null_as_default")]
    message: String,
    #[serde(default)]
    notification_type: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Deserialize)]
struct SessionFields {
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

impl ClaudeEvent {
    /// Second-level decode keyed by the `hook_event_name` string.
    pub fn decode(event_name: &str, value: &Value) -> Result<Self, serde_json::Error> {
        let event = match event_name {
            "UserPromptSubmit" => {
                let fields = PromptFields::deserialize(value)?;
                Self::UserPromptSubmit {
                    prompt: fields.prompt,
                }
            }
            "Stop" => {
                let fields = StopFields::deserialize(value)?;
                Self::Stop {
                    stop_hook_active: fields.stop_hook_active,
                }
            }
            "SubagentStop" => {
                let fields = StopFields::deserialize(value)?;
                Self::SubagentStop {
                    stop_hook_active: fields.stop_hook_active,
                    agent_id: fields.agent_id,
                    agent_transcript_path: fields.agent_transcript_path,
                }
            }
            "Notification" => {
                let fields = NotificationFields::deserialize(value)?;
                Self::Notification {
                    message: fields.message,
                    notification_type: fields.notification_type,
                    title: fields.title,
                }
            }
            "SessionStart" => Self::SessionStart {
                source: SessionFields::deserialize(value)?.source,
            },
            "SessionEnd" => Self::SessionEnd {
                reason: SessionFields::deserialize(value)?.reason,
            },
            _ => Self::Other,
        };
        Ok(event)
    }
}

/// A decoded Claude Code hook payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaudeHook {
    pub envelope: ClaudeEnvelope,
    pub event: ClaudeEvent,
}

impl ClaudeHook {
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        let envelope = ClaudeEnvelope::deserialize(value)?;
        let event = ClaudeEvent::decode(&envelope.hook_event_name, value)?;
        Ok(Self { envelope, event })
    }
}

// ============================================================================
// Codex notify
// ============================================================================

/// The `agent-turn-complete` record Codex passes to its notify program.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CodexTurnComplete {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub thread_id: SessionId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub turn_id: String,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub input_messages: Vec<String>,
    #[serde(default)]
    pub last_assistant_message: Option<String>,
}

impl CodexTurnComplete {
    pub const TYPE_TAG: &'static str = "agent-turn-complete";
}

// ============================================================================
// Cursor hooks
// ============================================================================

/// Common envelope of a Cursor hook event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CursorEnvelope {
    #[serde(default, deserialize_with = "null_as_default")]
    pub conversation_id: SessionId,
    pub hook_event_name: String,
    #[serde(default)]
    pub generation_id: Option<String>,
    /// Cursor may open several roots; the first one is the primary
    #[serde(default, deserialize_with = "null_as_default")]
    pub workspace_roots: Vec<String>,
    #[serde(default)]
    pub transcript_path: Option<String>,
}

/// Event-specific part of a Cursor hook.
#[derive(Debug, Clone, PartialEq)]
pub enum CursorEvent {
    BeforeSubmitPrompt { prompt: String },
    AfterAgentResponse { text: String },
    /// `status` is completed, aborted or error
    Stop { status: Option<String> },
    Other,
}

#[derive(Deserialize)]
struct CursorFields {
    #[serde(default, deserialize_with = "null_as_default")]
    prompt: String,
    #[serde(default, deserialize_with = "null_as_default")]
    text: String,
    #[serde(default)]
    status: Option<String>,
}

impl CursorEvent {
    pub fn decode(event_name: &str, value: &Value) -> Result<Self, serde_json::Error> {
        let event = match event_name {
            "beforeSubmitPrompt" => Self::BeforeSubmitPrompt {
                prompt: CursorFields::deserialize(value)?.prompt,
            },
            "afterAgentResponse" => Self::AfterAgentResponse {
                text: CursorFields::deserialize(value)?.text,
            },
            "stop" => Self::Stop {
                status: CursorFields::deserialize(value)?.status,
            },
            _ => Self::Other,
        };
        Ok(event)
    }
}

/// A decoded Cursor hook payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorHook {
    pub envelope: CursorEnvelope,
    pub event: CursorEvent,
}

impl CursorHook {
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        let envelope = CursorEnvelope::deserialize(value)?;
        let event = CursorEvent::decode(&envelope.hook_event_name, value)?;
        Ok(Self { envelope, event })
    }
}
