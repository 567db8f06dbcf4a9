//! parrot CLI library - Everything between a hook payload and its effects
//!
//! - `config` / `context` - `config.toml`, paths and environment overrides
//! - `voice` - layered voice parameter resolution
//! - `transcript` - latest assistant reply from a JSONL transcript
//! - `speech` - speech engines and audio playback
//! - `persona` - persona profiles and their application
//! - `dispatch` - hook routing: initialization, speech, notifications
//! - `history` - per-day record of dispatches
//! - `setup` - Claude Code hook installation
//! - `logging` - tracing subscribers for hook and interactive modes
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod history;
pub mod logging;
pub mod notify;
pub mod persona;
pub mod setup;
pub mod speech;
pub mod transcript;
pub mod voice;

// Re-exports for convenience
pub use config::{AppConfig, Paths};
pub use context::AppContext;
pub use dispatch::{Action, DispatchReport, Dispatcher};
pub use error::{ConfigError, PersonaError, SpeechError, TranscriptError};
pub use notify::Notifier;
pub use persona::PersonaStore;
pub use speech::{Player, Speaker, SpeechProvider, SpeechSink};
pub use transcript::read_last_assistant;
pub use voice::{
    resolve, EffectiveVoiceParameters, PersonaDescriptor, Provider, ProviderSettings, VoiceFlags,
    VoiceLayer, VoiceSources,
};
