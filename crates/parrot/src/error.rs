//! Error types for the parrot CLI library.
//!
//! Each collaborator gets its own `thiserror` enum so callers can decide
//! precisely what is fatal: configuration errors end the `speak` command,
//! while the hook dispatcher logs every one of these and carries on.
//!
//! **Panic-Free Policy:** No `.unwrap()`, `.expect()`, `panic!()`,
//! `unreachable!()`, or `todo!()` outside tests.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Configuration
// ============================================================================

/// Failures while resolving effective voice parameters or loading the
/// documents they come from.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A layer named a provider this build does not know.
    #[error("Unknown speech provider: {0} (expected voicevox, aivisspeech, openai or elevenlabs)")]
    UnknownProvider(String),

    /// A cloud provider was selected but no layer supplied its key.
    #[error("Missing {field} for provider {provider}: pass --api-key, add it to voice.json, or set {env_var}")]
    MissingCredential {
        provider: &'static str,
        field: &'static str,
        env_var: &'static str,
    },

    /// A field holds a value outside its domain.
    #[error("Invalid {field}: {value} (expected {expected})")]
    InvalidValue {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    /// The provider cannot produce the requested audio container.
    #[error("Provider {provider} cannot produce {format} audio")]
    UnsupportedFormat {
        provider: &'static str,
        format: &'static str,
    },

    /// A configuration document exists but could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A configuration document is not valid JSON/TOML for its schema.
    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

// ============================================================================
// Transcript
// ============================================================================

/// Failures while extracting the latest assistant reply.
#[derive(Error, Debug)]
pub enum TranscriptError {
    #[error("Failed to read transcript {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The latest assistant record carries no text (e.g. a tool-only
    /// turn). Callers treat this as "nothing to say", not a failure.
    #[error("No assistant message with text in transcript")]
    NoAssistantMessage,
}

// ============================================================================
// Speech
// ============================================================================

/// Failures while synthesizing or playing audio.
#[derive(Error, Debug)]
pub enum SpeechError {
    /// The engine could not be reached at all.
    #[error("{provider} is unreachable at {url}: {source}")]
    Unreachable {
        provider: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The provider rejected the credentials.
    #[error("{provider} rejected the API key (HTTP {status})")]
    Auth { provider: &'static str, status: u16 },

    /// The provider refused because of rate limits or billing.
    #[error("{provider} quota exceeded or rate limited")]
    Quota { provider: &'static str },

    /// Any other non-success HTTP response.
    #[error("{provider} returned HTTP {status}: {body}")]
    Http {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// Transport failure after the connection was established.
    #[error("{provider} request failed: {source}")]
    Request {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// No audio player could be found on this system.
    #[error("No audio player found (tried {tried}); set `player` in config.toml")]
    NoPlayer { tried: String },

    /// The audio player ran but failed.
    #[error("Audio player `{command}` failed: {reason}")]
    Playback { command: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ============================================================================
// Persona
// ============================================================================

/// Failures of the persona store.
#[derive(Error, Debug)]
pub enum PersonaError {
    #[error("Invalid persona name: {0:?} (use letters, digits, '-' and '_')")]
    InvalidName(String),

    #[error("Persona not found: {name} (looked in {path})")]
    NotFound { name: String, path: PathBuf },

    #[error("Failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Editor `{editor}` failed: {reason}")]
    Editor { editor: String, reason: String },
}

// ============================================================================
// Result Type Aliases
// ============================================================================

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
pub type SpeechResult<T> = std::result::Result<T, SpeechError>;
pub type PersonaResult<T> = std::result::Result<T, PersonaError>;

// ============================================================================
// Tests
// ============================================================================
