//! Session identifier shared by every hook protocol.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Longest sanitized prefix kept in a state file name.
const MAX_STEM_CHARS: usize = 64;

/// Identifier of one logical assistant session.
///
/// Claude Code calls it `session_id`, Codex `thread-id`, Cursor
/// `conversation_id`. An empty identifier means "unknown session":
/// no coordination is possible and callers must not pretend otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a new SessionId from a string.
    ///
    /// No format validation: each host chooses its own id scheme.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the host supplied no usable identifier.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Returns a shortened display form (first 8 characters).
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }

    /// Deterministic, filesystem-safe name for this session's state files.
    ///
    /// Ids made only of `[A-Za-z0-9_-]` (and short enough) are used as-is.
    /// Anything else is sanitized and suffixed with a digest of the raw id
    /// so two different ids can never share a file.
    pub fn file_stem(&self) -> String {
        let sanitized: String = self
            .0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .take(MAX_STEM_CHARS)
            .collect();

        if sanitized == self.0 {
            return sanitized;
        }

        let digest = format!("{:x}", Sha256::digest(self.0.as_bytes()));
        let suffix = digest.get(..12).unwrap_or(&digest);
        format!("{sanitized}-{suffix}")
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
