//! The normalized event every protocol decodes into.

use std::fmt;

use parrot_core::SessionId;
use serde::{Deserialize, Serialize};

use crate::parse::{ClaudeEvent, ClaudeHook, CodexTurnComplete, CursorEvent, CursorHook};

/// Which assistant host sent the hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    ClaudeCode,
    Codex,
    Cursor,
}

impl Source {
    /// Stable identifier used in config keys and history records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClaudeCode => "claude_code",
            Self::Codex => "codex",
            Self::Cursor => "cursor",
        }
    }

    /// Human-readable product name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ClaudeCode => "Claude Code",
            Self::Codex => "Codex",
            Self::Cursor => "Cursor",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace('-', "_").as_str() {
            "claude_code" | "claude" => Some(Self::ClaudeCode),
            "codex" => Some(Self::Codex),
            "cursor" => Some(Self::Cursor),
            _ => None,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fully typed source payload. The variant is the source.
#[derive(Debug, Clone, PartialEq)]
pub enum HookPayload {
    ClaudeCode(ClaudeHook),
    Codex(CodexTurnComplete),
    Cursor(CursorHook),
}

impl HookPayload {
    pub fn source(&self) -> Source {
        match self {
            Self::ClaudeCode(_) => Source::ClaudeCode,
            Self::Codex(_) => Source::Codex,
            Self::Cursor(_) => Source::Cursor,
        }
    }
}

/// What an event means for dispatch, independent of its protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    SessionStart,
    PromptSubmit,
    /// The main agent finished a turn and produced a reply
    AssistantReply,
    /// A sub-agent finished; same session as its parent
    SubagentReply,
    Notification,
    /// A turn stopped without reply text (Cursor `stop`)
    TurnStopped,
    SessionEnd,
    Other,
}

/// The single internal shape produced from any supported hook.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent {
    pub session_id: SessionId,
    pub working_directory: String,
    pub event_type: String,
    pub user_inputs: Vec<String>,
    /// Empty when the reply must be read from the transcript
    pub assistant_response_text: String,
    pub payload: HookPayload,
}

impl NormalizedEvent {
    pub fn source(&self) -> Source {
        self.payload.source()
    }

    pub fn kind(&self) -> EventKind {
        match &self.payload {
            HookPayload::ClaudeCode(hook) => match hook.event {
                ClaudeEvent::SessionStart { .. } => EventKind::SessionStart,
                ClaudeEvent::UserPromptSubmit { .. } => EventKind::PromptSubmit,
                ClaudeEvent::Stop { .. } => EventKind::AssistantReply,
                ClaudeEvent::SubagentStop { .. } => EventKind::SubagentReply,
                ClaudeEvent::Notification { .. } => EventKind::Notification,
                ClaudeEvent::SessionEnd { .. } => EventKind::SessionEnd,
                ClaudeEvent::Other => EventKind::Other,
            },
            HookPayload::Codex(_) => EventKind::AssistantReply,
            HookPayload::Cursor(hook) => match hook.event {
                CursorEvent::BeforeSubmitPrompt { .. } => EventKind::PromptSubmit,
                CursorEvent::AfterAgentResponse { .. } => EventKind::AssistantReply,
                CursorEvent::Stop { .. } => EventKind::TurnStopped,
                CursorEvent::Other => EventKind::Other,
            },
        }
    }

    /// Transcript to read the reply from, when the host provided one.
    ///
    /// Sub-agent stops point at the sub-agent's own transcript if present.
    pub fn transcript_path(&self) -> Option<&str> {
        let path = match &self.payload {
            HookPayload::ClaudeCode(hook) => match &hook.event {
                ClaudeEvent::SubagentStop {
                    agent_transcript_path: Some(path),
                    ..
                } => Some(path.as_str()),
                _ => hook.envelope.transcript_path.as_deref(),
            },
            HookPayload::Codex(_) => None,
            HookPayload::Cursor(hook) => hook.envelope.transcript_path.as_deref(),
        };
        path.filter(|p| !p.is_empty())
    }

    /// Title attached to a notification, if the host sent one.
    pub fn notification_title(&self) -> Option<&str> {
        match &self.payload {
            HookPayload::ClaudeCode(ClaudeHook {
                event: ClaudeEvent::Notification { title, .. },
                ..
            }) => title.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn from_claude(hook: ClaudeHook) -> Self {
        let (user_inputs, assistant_response_text) = match &hook.event {
            ClaudeEvent::UserPromptSubmit { prompt } => (non_empty(prompt), String::new()),
            ClaudeEvent::Notification { message, .. } => (Vec::new(), message.clone()),
            _ => (Vec::new(), String::new()),
        };
        Self {
            session_id: hook.envelope.session_id.clone(),
            working_directory: hook.envelope.cwd.clone().unwrap_or_default(),
            event_type: hook.envelope.hook_event_name.clone(),
            user_inputs,
            assistant_response_text,
            payload: HookPayload::ClaudeCode(hook),
        }
    }

    pub(crate) fn from_codex(turn: CodexTurnComplete) -> Self {
        Self {
            session_id: turn.thread_id.clone(),
            working_directory: turn.cwd.clone().unwrap_or_default(),
            event_type: turn.kind.clone(),
            user_inputs: turn.input_messages.clone(),
            assistant_response_text: turn.last_assistant_message.clone().unwrap_or_default(),
            payload: HookPayload::Codex(turn),
        }
    }

    pub(crate) fn from_cursor(hook: CursorHook) -> Self {
        let (user_inputs, assistant_response_text) = match &hook.event {
            CursorEvent::BeforeSubmitPrompt { prompt } => (non_empty(prompt), String::new()),
            CursorEvent::AfterAgentResponse { text } => (Vec::new(), text.clone()),
            _ => (Vec::new(), String::new()),
        };
        Self {
            session_id: hook.envelope.conversation_id.clone(),
            working_directory: hook
                .envelope
                .workspace_roots
                .first()
                .cloned()
                .unwrap_or_default(),
            event_type: hook.envelope.hook_event_name.clone(),
            user_inputs,
            assistant_response_text,
            payload: HookPayload::Cursor(hook),
        }
    }
}

fn non_empty(text: &str) -> Vec<String> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![text.to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_names_round_trip() {
        for source in [Source::ClaudeCode, Source::Codex, Source::Cursor] {
            assert_eq!(Source::from_name(source.as_str()), Some(source));
        }
        assert_eq!(Source::from_name("claude-code"), Some(Source::ClaudeCode));
        assert_eq!(Source::from_name("gemini"), None);
    }
}
