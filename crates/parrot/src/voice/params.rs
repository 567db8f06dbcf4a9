//! Resolved voice parameters and the closed vocabularies they use.

use std::fmt;

use serde::Serialize;

// ============================================================================
// Provider
// ============================================================================

/// A speech engine parrot knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Local VOICEVOX engine
    Voicevox,
    /// Local AivisSpeech engine (VOICEVOX-compatible API)
    AivisSpeech,
    OpenAi,
    ElevenLabs,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::Voicevox,
        Provider::AivisSpeech,
        Provider::OpenAi,
        Provider::ElevenLabs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Voicevox => "voicevox",
            Self::AivisSpeech => "aivisspeech",
            Self::OpenAi => "openai",
            Self::ElevenLabs => "elevenlabs",
        }
    }

    /// Case-insensitive lookup by configuration name.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|provider| provider.as_str().eq_ignore_ascii_case(name))
    }

    /// Runs on this machine and addresses voices by numeric speaker id.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Voicevox | Self::AivisSpeech)
    }

    pub fn default_url(&self) -> &'static str {
        match self {
            Self::Voicevox => "http://127.0.0.1:50021",
            Self::AivisSpeech => "http://127.0.0.1:10101",
            Self::OpenAi => "https://api.openai.com",
            Self::ElevenLabs => "https://api.elevenlabs.io",
        }
    }

    pub fn default_speaker(&self) -> Option<u32> {
        match self {
            Self::Voicevox => Some(3),
            Self::AivisSpeech => Some(888_753_760),
            Self::OpenAi | Self::ElevenLabs => None,
        }
    }

    pub fn default_voice(&self) -> Option<&'static str> {
        match self {
            Self::OpenAi => Some("alloy"),
            Self::ElevenLabs => Some("21m00Tcm4TlvDq8ikWAM"),
            Self::Voicevox | Self::AivisSpeech => None,
        }
    }

    pub fn default_model(&self) -> Option<&'static str> {
        match self {
            Self::OpenAi => Some("gpt-4o-mini-tts"),
            Self::ElevenLabs => Some("eleven_multilingual_v2"),
            Self::Voicevox | Self::AivisSpeech => None,
        }
    }

    /// Environment variable consulted when no layer supplies a key.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::ElevenLabs => Some("ELEVENLABS_API_KEY"),
            Self::Voicevox | Self::AivisSpeech => None,
        }
    }

    pub fn default_format(&self) -> AudioFormat {
        if self.is_local() {
            AudioFormat::Wav
        } else {
            AudioFormat::Mp3
        }
    }

    pub fn supports(&self, format: AudioFormat) -> bool {
        match self {
            Self::Voicevox | Self::AivisSpeech => format == AudioFormat::Wav,
            Self::ElevenLabs => format == AudioFormat::Mp3,
            Self::OpenAi => true,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Reading mode / audio format
// ============================================================================

/// How much of a reply gets spoken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingMode {
    /// First line only
    #[default]
    Short,
    /// Whole reply, capped at `max_chars` when that is non-zero
    Full,
}

impl ReadingMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "short" => Some(Self::Short),
            "full" => Some(Self::Full),
            _ => None,
        }
    }

    /// Cuts already-normalized text down to what should be spoken.
    pub fn apply(&self, text: &str, max_chars: usize) -> String {
        match self {
            Self::Short => text
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .unwrap_or_default()
                .to_string(),
            Self::Full if max_chars > 0 => text.trim().chars().take(max_chars).collect(),
            Self::Full => text.trim().to_string(),
        }
    }
}

/// Audio container requested from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Wav,
    Mp3,
}

impl AudioFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "wav" => Some(Self::Wav),
            "mp3" => Some(Self::Mp3),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
        }
    }

    /// File suffix including the dot, for temp files handed to players.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Wav => ".wav",
            Self::Mp3 => ".mp3",
        }
    }
}

// ============================================================================
// EffectiveVoiceParameters
// ============================================================================

/// Everything one synthesis call needs, after all layers are merged.
///
/// Built only by [`crate::voice::resolve`]; read through accessors.
/// Engine-specific fields that do not apply to the selected provider are
/// always `None`.
#[derive(Clone, PartialEq, Serialize)]
pub struct EffectiveVoiceParameters {
    pub(super) provider: Provider,
    pub(super) speaker: Option<u32>,
    pub(super) voice: Option<String>,
    pub(super) volume: f64,
    pub(super) speed: f64,
    pub(super) mode: ReadingMode,
    pub(super) max_chars: usize,
    pub(super) format: AudioFormat,
    #[serde(skip_serializing)]
    pub(super) api_key: Option<String>,
    pub(super) url: String,
    pub(super) model: Option<String>,
    pub(super) instructions: Option<String>,
    pub(super) stability: Option<f64>,
    pub(super) similarity_boost: Option<f64>,
}

impl EffectiveVoiceParameters {
    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn speaker(&self) -> Option<u32> {
        self.speaker
    }

    pub fn voice(&self) -> Option<&str> {
        self.voice.as_deref()
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn mode(&self) -> ReadingMode {
        self.mode
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Engine base URL without a trailing slash.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    pub fn stability(&self) -> Option<f64> {
        self.stability
    }

    pub fn similarity_boost(&self) -> Option<f64> {
        self.similarity_boost
    }

    /// Applies the reading mode and character cap to normalized text.
    pub fn shape_text(&self, text: &str) -> String {
        self.mode.apply(text, self.max_chars)
    }
}

impl fmt::Debug for EffectiveVoiceParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectiveVoiceParameters")
            .field("provider", &self.provider)
            .field("speaker", &self.speaker)
            .field("voice", &self.voice)
            .field("volume", &self.volume)
            .field("speed", &self.speed)
            .field("mode", &self.mode)
            .field("max_chars", &self.max_chars)
            .field("format", &self.format)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("url", &self.url)
            .field("model", &self.model)
            .field("instructions", &self.instructions)
            .field("stability", &self.stability)
            .field("similarity_boost", &self.similarity_boost)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_names_case_insensitive() {
        assert_eq!(Provider::from_name("VOICEVOX"), Some(Provider::Voicevox));
        assert_eq!(Provider::from_name(" AivisSpeech "), Some(Provider::AivisSpeech));
        assert_eq!(Provider::from_name("OpenAI"), Some(Provider::OpenAi));
        assert_eq!(Provider::from_name("festival"), None);
        for provider in Provider::ALL {
            assert_eq!(Provider::from_name(provider.as_str()), Some(provider));
        }
    }

    #[test]
    fn test_engine_defaults_are_disjoint() {
        assert_eq!(Provider::Voicevox.default_speaker(), Some(3));
        assert_eq!(Provider::AivisSpeech.default_speaker(), Some(888_753_760));
        assert_eq!(Provider::OpenAi.default_speaker(), None);
        assert_eq!(Provider::Voicevox.default_voice(), None);
        assert_eq!(Provider::ElevenLabs.default_voice(), Some("21m00Tcm4TlvDq8ikWAM"));
    }

    #[test]
    fn test_format_support() {
        assert!(Provider::Voicevox.supports(AudioFormat::Wav));
        assert!(!Provider::Voicevox.supports(AudioFormat::Mp3));
        assert!(!Provider::ElevenLabs.supports(AudioFormat::Wav));
        assert!(Provider::OpenAi.supports(AudioFormat::Wav));
        assert_eq!(Provider::OpenAi.default_format(), AudioFormat::Mp3);
    }

    #[test]
    fn test_short_mode_takes_first_line() {
        let text = "\n  First line.  \nSecond line.";
        assert_eq!(ReadingMode::Short.apply(text, 0), "First line.");
        assert_eq!(ReadingMode::Short.apply("", 0), "");
    }

    #[test]
    fn test_full_mode_caps_by_chars() {
        let text = "こんにちは世界です";
        assert_eq!(ReadingMode::Full.apply(text, 5), "こんにちは");
        assert_eq!(ReadingMode::Full.apply(text, 0), text);
    }
}
