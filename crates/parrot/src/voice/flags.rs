//! Command-line voice flags.
//!
//! Flags keep plain types with "unset" sentinel defaults so `--help`
//! shows real values; [`VoiceFlags::to_layer`] turns them into a
//! presence-based [`VoiceLayer`] before anything is merged.

use clap::Args;

use super::layer::VoiceLayer;

/// One flag per resolvable voice parameter.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct VoiceFlags {
    /// Speech engine: voicevox, aivisspeech, openai or elevenlabs
    #[arg(long, default_value_t = String::new(), hide_default_value = true)]
    pub provider: String,

    /// Speaker id for local engines (0 = unset)
    #[arg(long, default_value_t = 0)]
    pub speaker: u32,

    /// Voice id for cloud providers
    #[arg(long, default_value_t = String::new(), hide_default_value = true)]
    pub voice: String,

    #[arg(long, default_value_t = 1.0)]
    pub volume: f64,

    #[arg(long, default_value_t = 1.0)]
    pub speed: f64,

    /// Reading mode: short (first line) or full
    #[arg(long, default_value_t = String::new(), hide_default_value = true)]
    pub mode: String,

    /// Character cap in full mode (0 = unset)
    #[arg(long, default_value_t = 0)]
    pub max_chars: usize,

    /// Audio format: wav or mp3
    #[arg(long, default_value_t = String::new(), hide_default_value = true)]
    pub format: String,

    #[arg(long, default_value_t = String::new(), hide_default_value = true)]
    pub api_key: String,

    /// Engine base URL
    #[arg(long, default_value_t = String::new(), hide_default_value = true)]
    pub url: String,

    #[arg(long, default_value_t = String::new(), hide_default_value = true)]
    pub model: String,

    /// Style instructions (openai)
    #[arg(long, default_value_t = String::new(), hide_default_value = true)]
    pub instructions: String,

    /// Voice stability 0.0-1.0 (elevenlabs)
    #[arg(long)]
    pub stability: Option<f64>,

    /// Similarity boost 0.0-1.0 (elevenlabs)
    #[arg(long)]
    pub similarity_boost: Option<f64>,
}

impl Default for VoiceFlags {
    fn default() -> Self {
        Self {
            provider: String::new(),
            speaker: 0,
            voice: String::new(),
            volume: 1.0,
            speed: 1.0,
            mode: String::new(),
            max_chars: 0,
            format: String::new(),
            api_key: String::new(),
            url: String::new(),
            model: String::new(),
            instructions: String::new(),
            stability: None,
            similarity_boost: None,
        }
    }
}

impl VoiceFlags {
    /// Converts to a layer holding only the flags actually set.
    pub fn to_layer(&self) -> VoiceLayer {
        VoiceLayer {
            provider: Some(self.provider.clone()),
            speaker: Some(self.speaker),
            voice: Some(self.voice.clone()),
            volume: Some(self.volume),
            speed: Some(self.speed),
            mode: Some(self.mode.clone()),
            max_chars: Some(self.max_chars),
            format: Some(self.format.clone()),
            api_key: Some(self.api_key.clone()),
            url: Some(self.url.clone()),
            model: Some(self.model.clone()),
            instructions: Some(self.instructions.clone()),
            stability: self.stability,
            similarity_boost: self.similarity_boost,
        }
        .without_sentinels()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        voice: VoiceFlags,
    }

    #[test]
    fn test_default_flags_are_empty_layer() {
        assert_eq!(VoiceFlags::default().to_layer(), VoiceLayer::default());
        let cli = Cli::try_parse_from(["parrot"]).unwrap();
        assert_eq!(cli.voice, VoiceFlags::default());
    }

    #[test]
    fn test_set_flags_survive() {
        let cli = Cli::try_parse_from([
            "parrot",
            "--provider",
            "openai",
            "--voice",
            "nova",
            "--speed",
            "1.5",
            "--max-chars",
            "80",
            "--api-key",
            "sk-test",
            "--similarity-boost",
            "0.3",
        ])
        .unwrap();
        let layer = cli.voice.to_layer();

        assert_eq!(layer.provider.as_deref(), Some("openai"));
        assert_eq!(layer.voice.as_deref(), Some("nova"));
        assert_eq!(layer.speed, Some(1.5));
        assert_eq!(layer.max_chars, Some(80));
        assert_eq!(layer.api_key.as_deref(), Some("sk-test"));
        assert_eq!(layer.similarity_boost, Some(0.3));
        assert_eq!(layer.volume, None);
        assert_eq!(layer.speaker, None);
    }
}
