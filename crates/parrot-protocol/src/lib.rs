//! parrot protocol - Hook payload detection and normalization
//!
//! Assistant hosts speak different JSON dialects when they fire hooks.
//! This crate recognizes which dialect arrived and decodes it into one
//! [`NormalizedEvent`], keeping the fully typed source payload alongside.
//!
//! Detection is a pure function of the input bytes; nothing here touches
//! the filesystem or the network.

pub mod detect;
pub mod event;
pub mod parse;

pub use detect::{detect, looks_like_json_object, DetectError};
pub use event::{EventKind, HookPayload, NormalizedEvent, Source};
pub use parse::{ClaudeEvent, ClaudeHook, CodexTurnComplete, CursorEvent, CursorHook};
