//! Partial voice configuration as it appears in each source.
//!
//! Every layer is a [`VoiceLayer`]: every field optional, so merging is a
//! question of presence. Sentinel values coming from CLI defaults are
//! stripped at the boundary by [`VoiceLayer::without_sentinels`].

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::params::Provider;
use crate::error::{ConfigError, ConfigResult};

/// One source's view of the voice parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceLayer {
    pub provider: Option<String>,
    pub speaker: Option<u32>,
    pub voice: Option<String>,
    pub volume: Option<f64>,
    pub speed: Option<f64>,
    #[serde(alias = "reading_mode")]
    pub mode: Option<String>,
    pub max_chars: Option<usize>,
    pub format: Option<String>,
    pub api_key: Option<String>,
    pub url: Option<String>,
    pub model: Option<String>,
    pub instructions: Option<String>,
    pub stability: Option<f64>,
    pub similarity_boost: Option<f64>,
}

impl VoiceLayer {
    /// Drops values that mean "unset" on the command line: speaker `0`,
    /// volume and speed `1.0`, max chars `0`, and blank strings.
    #[must_use]
    pub fn without_sentinels(self) -> Self {
        Self {
            provider: non_blank(self.provider),
            speaker: self.speaker.filter(|&s| s != 0),
            voice: non_blank(self.voice),
            volume: self.volume.filter(|&v| v != 1.0),
            speed: self.speed.filter(|&v| v != 1.0),
            mode: non_blank(self.mode),
            max_chars: self.max_chars.filter(|&n| n != 0),
            format: non_blank(self.format),
            api_key: non_blank(self.api_key),
            url: non_blank(self.url),
            model: non_blank(self.model),
            instructions: non_blank(self.instructions),
            stability: self.stability,
            similarity_boost: self.similarity_boost,
        }
    }

    /// Keeps only the fields that mean the same thing for every engine.
    #[must_use]
    pub fn engine_neutral(self) -> Self {
        Self {
            volume: self.volume,
            speed: self.speed,
            mode: self.mode,
            max_chars: self.max_chars,
            ..Self::default()
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

// ============================================================================
// Persona descriptor
// ============================================================================

/// `<workdir>/.parrot/persona.json`: which persona a project uses and,
/// optionally, how it should sound.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaDescriptor {
    pub persona: Option<String>,
    pub voice: Option<VoiceLayer>,
}

impl PersonaDescriptor {
    /// Reads the descriptor; `Ok(None)` when the file does not exist.
    pub fn load(path: &Path) -> ConfigResult<Option<Self>> {
        read_json(path)
    }

    /// Persona name, ignoring blanks.
    pub fn persona_name(&self) -> Option<&str> {
        self.persona
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

// ============================================================================
// Provider settings
// ============================================================================

/// `voice.json`: per-engine sections plus a few engine-neutral defaults.
///
/// ```json
/// {
///   "default_provider": "openai",
///   "reading_mode": "full",
///   "providers": { "openai": { "voice": "nova" } }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub default_provider: Option<String>,
    pub reading_mode: Option<String>,
    pub max_chars: Option<usize>,
    pub providers: BTreeMap<String, VoiceLayer>,
}

impl ProviderSettings {
    pub fn load(path: &Path) -> ConfigResult<Option<Self>> {
        read_json(path)
    }

    /// Project file first, then the global one. The first document found
    /// wins outright; the two are never merged.
    pub fn discover(project: &Path, global: &Path) -> ConfigResult<Option<(PathBuf, Self)>> {
        for path in [project, global] {
            if let Some(settings) = Self::load(path)? {
                debug!(path = %path.display(), "Using provider settings");
                return Ok(Some((path.to_path_buf(), settings)));
            }
        }
        Ok(None)
    }

    /// The section for `provider`, with the file-wide reading mode and
    /// character cap filled in where the section leaves them out.
    ///
    /// Section keys match case-insensitively. The section's own
    /// `provider` field is ignored.
    pub fn layer_for(&self, provider: Provider) -> VoiceLayer {
        let mut layer = self
            .providers
            .iter()
            .find(|(name, _)| Provider::from_name(name) == Some(provider))
            .map(|(_, section)| section.clone())
            .unwrap_or_default();
        layer.provider = None;
        layer.mode = layer.mode.or_else(|| self.reading_mode.clone());
        layer.max_chars = layer.max_chars.or(self.max_chars);
        layer
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> ConfigResult<Option<T>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}
