//! Hook dispatch: one raw payload in, side effects out.
//!
//! ```text
//! bytes ──detect──▶ NormalizedEvent
//!                     ├─ initialize once per session (persona → instructions file)
//!                     ├─ speak the reply (dedup per session)
//!                     └─ notify on attention events
//! ```
//!
//! Nothing here returns an error to the caller. Every failure is logged,
//! noted in the report and the history, and dispatch carries on.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Local;
use parrot_core::{normalize_for_speech, SessionId, SessionStore};
use parrot_protocol::{
    detect, CursorEvent, CursorHook, EventKind, HookPayload, NormalizedEvent, Source,
};
use tracing::{debug, info, warn};

use crate::config::project_persona_descriptor;
use crate::context::AppContext;
use crate::error::TranscriptError;
use crate::history::{History, HistoryRecord};
use crate::notify::Notifier;
use crate::persona::PersonaStore;
use crate::speech::SpeechSink;
use crate::transcript::read_last_assistant;
use crate::voice::{PersonaDescriptor, VoiceLayer, VoiceSources};

// ============================================================================
// Report
// ============================================================================

/// One thing dispatch did, or decided not to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Persona copied into the host's instructions file
    Initialized { persona: String, target: PathBuf },
    /// Another invocation already initialized this session
    AlreadyInitialized,
    /// No persona configured for this project
    NoPersona,
    InitFailed(String),
    Spoke,
    SkippedDuplicate,
    /// The reply had no speakable text
    NothingToSay,
    SpeechFailed(String),
    ConfigFailed(String),
    Notified { shown: bool },
}

impl Action {
    /// Short label used in history records.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Initialized { .. } => "initialized",
            Self::AlreadyInitialized => "already_initialized",
            Self::NoPersona => "no_persona",
            Self::InitFailed(_) => "init_failed",
            Self::Spoke => "spoke",
            Self::SkippedDuplicate => "skipped_duplicate",
            Self::NothingToSay => "nothing_to_say",
            Self::SpeechFailed(_) => "speech_failed",
            Self::ConfigFailed(_) => "config_failed",
            Self::Notified { .. } => "notified",
        }
    }

    fn detail(&self) -> Option<String> {
        match self {
            Self::Initialized { persona, target } => {
                Some(format!("{persona} -> {}", target.display()))
            }
            Self::InitFailed(reason) | Self::SpeechFailed(reason) | Self::ConfigFailed(reason) => {
                Some(reason.clone())
            }
            _ => None,
        }
    }
}

/// Everything one dispatch did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// `None` when the payload was not recognized
    pub source: Option<Source>,
    pub event: String,
    pub session_id: SessionId,
    pub actions: Vec<Action>,
}

impl DispatchReport {
    pub fn has(&self, action: &Action) -> bool {
        self.actions.contains(action)
    }
}

impl fmt::Display for DispatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<&str> = self.actions.iter().map(Action::label).collect();
        write!(
            f,
            "{} {} [{}]",
            self.source.map_or("unknown", |s| s.as_str()),
            self.event,
            labels.join(",")
        )
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Routes normalized events to their side effects.
pub struct Dispatcher<S> {
    ctx: AppContext,
    sessions: SessionStore,
    personas: PersonaStore,
    history: History,
    notifier: Notifier,
    sink: S,
    /// Fallback working directory when the payload carries none
    cwd: PathBuf,
}

impl<S: SpeechSink> Dispatcher<S> {
    pub fn new(ctx: AppContext, sink: S, notifier: Notifier, cwd: PathBuf) -> Self {
        Self {
            sessions: ctx.sessions(),
            personas: ctx.personas(),
            history: ctx.history(),
            ctx,
            notifier,
            sink,
            cwd,
        }
    }

    /// Handles one raw hook payload. Never fails.
    pub async fn dispatch(&self, input: &[u8]) -> DispatchReport {
        let started = Instant::now();
        // Detached: the process may exit before it finishes
        drop(self.sessions.spawn_sweep());

        let report = match detect(input) {
            Ok(event) => self.handle(&event).await,
            Err(e) => {
                warn!(error = %e, "Hook payload not recognized; running legacy initialization");
                DispatchReport {
                    source: None,
                    event: "unrecognized".to_string(),
                    session_id: SessionId::default(),
                    actions: vec![self.legacy_initialize()],
                }
            }
        };

        info!(
            session_id = %report.session_id.short(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Dispatched {report}"
        );
        self.record_history(&report, started);
        report
    }

    async fn handle(&self, event: &NormalizedEvent) -> DispatchReport {
        let kind = event.kind();
        debug!(
            source = %event.source(),
            event = %event.event_type,
            session_id = %event.session_id,
            ?kind,
            "Handling hook event"
        );

        if event.session_id.is_unknown() {
            debug!("Empty session id; coordination disabled");
        }

        let mut actions = Vec::new();
        if kind != EventKind::SessionEnd {
            actions.push(self.initialize(event));
        }

        match kind {
            EventKind::AssistantReply => actions.push(self.speak(event).await),
            EventKind::SubagentReply if self.ctx.config.speak_on_subagent_stop => {
                actions.push(self.speak(event).await)
            }
            EventKind::Notification => {
                let summary = event
                    .notification_title()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{} needs attention", event.source().label()));
                let shown = self
                    .notifier
                    .notify(&summary, &event.assistant_response_text);
                actions.push(Action::Notified { shown });
            }
            EventKind::TurnStopped => {
                let shown = self.notifier.notify(
                    &format!("{} finished", event.source().label()),
                    &stop_status(event),
                );
                actions.push(Action::Notified { shown });
            }
            _ => {}
        }

        DispatchReport {
            source: Some(event.source()),
            event: event.event_type.clone(),
            session_id: event.session_id.clone(),
            actions,
        }
    }

    // ========================================================================
    // Initialization
    // ========================================================================

    /// Applies the project's persona once per session.
    fn initialize(&self, event: &NormalizedEvent) -> Action {
        let workdir = self.workdir(event);
        let Some(persona) = self.persona_for(&workdir) else {
            return Action::NoPersona;
        };

        if !self.sessions.claim_initialization(&event.session_id) {
            debug!(session_id = %event.session_id, "Session already initialized");
            return Action::AlreadyInitialized;
        }

        let target = workdir.join(self.ctx.config.instructions.for_source(event.source()));
        self.apply_persona(&persona, target)
    }

    /// Fallback for payloads nothing recognized: apply the project persona
    /// for the current directory, without any session coordination.
    fn legacy_initialize(&self) -> Action {
        let Some(persona) = self.persona_for(&self.cwd) else {
            return Action::NoPersona;
        };
        let target = self
            .cwd
            .join(self.ctx.config.instructions.for_source(Source::ClaudeCode));
        self.apply_persona(&persona, target)
    }

    fn apply_persona(&self, persona: &str, target: PathBuf) -> Action {
        match self.personas.apply(persona, &target) {
            Ok(_) => Action::Initialized {
                persona: persona.to_string(),
                target,
            },
            Err(e) => {
                warn!(error = %e, persona, "Failed to apply persona");
                Action::InitFailed(e.to_string())
            }
        }
    }

    /// Persona named by the project descriptor, else the configured default.
    fn persona_for(&self, workdir: &Path) -> Option<String> {
        let descriptor = match PersonaDescriptor::load(&project_persona_descriptor(workdir)) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!(error = %e, "Ignoring persona descriptor");
                None
            }
        };
        descriptor
            .as_ref()
            .and_then(PersonaDescriptor::persona_name)
            .map(str::to_string)
            .or_else(|| self.ctx.config.default_persona.clone())
            .filter(|name| !name.trim().is_empty())
    }

    // ========================================================================
    // Speech
    // ========================================================================

    async fn speak(&self, event: &NormalizedEvent) -> Action {
        let workdir = self.workdir(event);
        let params = match VoiceSources::load(&workdir, &self.ctx.paths)
            .and_then(|sources| sources.resolve(&VoiceLayer::default()))
        {
            Ok(params) => params,
            Err(e) => {
                warn!(error = %e, "Voice configuration invalid; not speaking");
                return Action::ConfigFailed(e.to_string());
            }
        };

        let text = if !event.assistant_response_text.trim().is_empty() {
            params.shape_text(&normalize_for_speech(&event.assistant_response_text))
        } else if let Some(path) = event.transcript_path() {
            match read_last_assistant(Path::new(path), params.mode(), params.max_chars()) {
                Ok(text) => text,
                Err(TranscriptError::NoAssistantMessage) => String::new(),
                Err(e) => {
                    warn!(error = %e, "Could not read transcript");
                    return Action::SpeechFailed(e.to_string());
                }
            }
        } else {
            String::new()
        };

        if text.is_empty() {
            return Action::NothingToSay;
        }
        if self.sessions.is_duplicate(&event.session_id, &text) {
            debug!(session_id = %event.session_id, "Skipping repeated utterance");
            return Action::SkippedDuplicate;
        }

        match self.sink.speak(&text, &params).await {
            Ok(()) => {
                if let Err(e) = self.sessions.record(&event.session_id, &text) {
                    warn!(error = %e, "Failed to record spoken text");
                }
                Action::Spoke
            }
            Err(e) => {
                warn!(error = %e, provider = %params.provider(), "Speech failed");
                Action::SpeechFailed(e.to_string())
            }
        }
    }

    fn workdir(&self, event: &NormalizedEvent) -> PathBuf {
        if event.working_directory.trim().is_empty() {
            self.cwd.clone()
        } else {
            PathBuf::from(&event.working_directory)
        }
    }

    fn record_history(&self, report: &DispatchReport, started: Instant) {
        let details: Vec<String> = report.actions.iter().filter_map(Action::detail).collect();
        let record = HistoryRecord {
            timestamp: Local::now(),
            source: report
                .source
                .map_or_else(|| "unknown".to_string(), |s| s.as_str().to_string()),
            event: report.event.clone(),
            session_id: report.session_id.to_string(),
            action: report
                .actions
                .iter()
                .map(Action::label)
                .collect::<Vec<_>>()
                .join(","),
            detail: (!details.is_empty()).then(|| details.join("; ")),
            duration_ms: started.elapsed().as_millis() as u64,
        };
        if let Err(e) = self.history.append(&record) {
            warn!(error = %e, "Failed to write history");
        }
    }
}

fn stop_status(event: &NormalizedEvent) -> String {
    match &event.payload {
        HookPayload::Cursor(CursorHook {
            event: CursorEvent::Stop {
                status: Some(status),
            },
            ..
        }) => format!("Turn {status}"),
        _ => String::new(),
    }
}
