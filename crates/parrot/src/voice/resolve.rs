//! Per-field precedence merge of the four voice layers.
//!
//! ```text
//! 1. CLI flags            (sentinels already stripped)
//! 2. persona voice block  (sentinels stripped; engine fields isolated)
//! 3. provider settings    (section for the selected provider)
//! 4. built-in defaults    (keyed per provider)
//! ```
//!
//! Each field is resolved on its own: a flag for `speed` says nothing
//! about where `voice` comes from. The provider is resolved first because
//! every engine-specific field depends on it.

use tracing::debug;

use super::layer::{PersonaDescriptor, ProviderSettings, VoiceLayer};
use super::params::{AudioFormat, EffectiveVoiceParameters, Provider, ReadingMode};
use crate::error::{ConfigError, ConfigResult};

/// Merges all layers into the parameters for one synthesis call.
///
/// `env` looks up environment variables; pass `|k| std::env::var(k).ok()`
/// in production and a fixed map in tests. The result depends on nothing
/// but the arguments.
pub fn resolve<E>(
    cli: &VoiceLayer,
    persona: Option<&PersonaDescriptor>,
    settings: Option<&ProviderSettings>,
    env: E,
) -> ConfigResult<EffectiveVoiceParameters>
where
    E: Fn(&str) -> Option<String>,
{
    let cli = cli.clone().without_sentinels();
    let persona_block = persona
        .and_then(|p| p.voice.clone())
        .map(VoiceLayer::without_sentinels)
        .unwrap_or_default();

    let provider_name = cli
        .provider
        .clone()
        .or_else(|| persona_block.provider.clone())
        .or_else(|| {
            settings
                .and_then(|s| s.default_provider.clone())
                .filter(|name| !name.trim().is_empty())
        });
    let provider = match provider_name {
        Some(name) => {
            Provider::from_name(&name).ok_or_else(|| ConfigError::UnknownProvider(name))?
        }
        None => Provider::Voicevox,
    };

    // A persona block written for another engine keeps only its
    // engine-neutral fields.
    let persona_applies = persona_block
        .provider
        .as_deref()
        .map_or(true, |name| Provider::from_name(name) == Some(provider));
    let persona_layer = if persona_applies {
        persona_block
    } else {
        debug!(
            selected = %provider,
            declared = ?persona_block.provider,
            "Persona voice is for another engine; using engine-neutral fields only"
        );
        persona_block.engine_neutral()
    };

    let settings_layer = settings
        .map(|s| s.layer_for(provider))
        .unwrap_or_default();

    let layers = Layers {
        stack: [&cli, &persona_layer, &settings_layer],
    };

    let volume = positive("volume", layers.first(|l| l.volume).unwrap_or(1.0))?;
    let speed = positive("speed", layers.first(|l| l.speed).unwrap_or(1.0))?;

    let mode = match layers.first(|l| l.mode.clone()) {
        Some(name) => ReadingMode::from_name(&name).ok_or(ConfigError::InvalidValue {
            field: "mode",
            value: name,
            expected: "short or full",
        })?,
        None => ReadingMode::default(),
    };
    let max_chars = layers.first(|l| l.max_chars).unwrap_or(0);

    let format = match layers.first(|l| l.format.clone()) {
        Some(name) => AudioFormat::from_name(&name).ok_or(ConfigError::InvalidValue {
            field: "format",
            value: name,
            expected: "wav or mp3",
        })?,
        None => provider.default_format(),
    };
    if !provider.supports(format) {
        return Err(ConfigError::UnsupportedFormat {
            provider: provider.as_str(),
            format: format.as_str(),
        });
    }

    let url = layers
        .first(|l| l.url.clone())
        .unwrap_or_else(|| provider.default_url().to_string())
        .trim_end_matches('/')
        .to_string();

    let (speaker, voice, model) = if provider.is_local() {
        let speaker = layers.first(|l| l.speaker).or(provider.default_speaker());
        (speaker, None, None)
    } else {
        let voice = layers
            .first(|l| l.voice.clone())
            .or_else(|| provider.default_voice().map(str::to_string));
        let model = layers
            .first(|l| l.model.clone())
            .or_else(|| provider.default_model().map(str::to_string));
        (None, voice, model)
    };

    let api_key = match provider.api_key_env() {
        Some(env_var) => {
            let key = layers
                .first(|l| l.api_key.clone())
                .or_else(|| env(env_var).filter(|k| !k.trim().is_empty()))
                .ok_or(ConfigError::MissingCredential {
                    provider: provider.as_str(),
                    field: "api_key",
                    env_var,
                })?;
            Some(key)
        }
        None => None,
    };

    let instructions = match provider {
        Provider::OpenAi => layers.first(|l| l.instructions.clone()),
        _ => None,
    };

    let (stability, similarity_boost) = match provider {
        Provider::ElevenLabs => (
            layers
                .first(|l| l.stability)
                .map(|v| unit_interval("stability", v))
                .transpose()?,
            layers
                .first(|l| l.similarity_boost)
                .map(|v| unit_interval("similarity_boost", v))
                .transpose()?,
        ),
        _ => (None, None),
    };

    Ok(EffectiveVoiceParameters {
        provider,
        speaker,
        voice,
        volume,
        speed,
        mode,
        max_chars,
        format,
        api_key,
        url,
        model,
        instructions,
        stability,
        similarity_boost,
    })
}

/// Layers 1-3 in precedence order.
struct Layers<'a> {
    stack: [&'a VoiceLayer; 3],
}

impl Layers<'_> {
    fn first<T>(&self, field: impl Fn(&VoiceLayer) -> Option<T>) -> Option<T> {
        self.stack.iter().find_map(|layer| field(*layer))
    }
}

fn positive(field: &'static str, value: f64) -> ConfigResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            field,
            value: value.to_string(),
            expected: "a positive number",
        })
    }
}

fn unit_interval(field: &'static str, value: f64) -> ConfigResult<f64> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            field,
            value: value.to_string(),
            expected: "a number between 0.0 and 1.0",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_all_defaults() {
        let params = resolve(&VoiceLayer::default(), None, None, no_env).unwrap();

        assert_eq!(params.provider(), Provider::Voicevox);
        assert_eq!(params.speaker(), Some(3));
        assert_eq!(params.voice(), None);
        assert_eq!(params.volume(), 1.0);
        assert_eq!(params.speed(), 1.0);
        assert_eq!(params.mode(), ReadingMode::Short);
        assert_eq!(params.max_chars(), 0);
        assert_eq!(params.format(), AudioFormat::Wav);
        assert_eq!(params.api_key(), None);
        assert_eq!(params.url(), "http://127.0.0.1:50021");
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let cli = VoiceLayer {
            provider: Some("festival".to_string()),
            ..VoiceLayer::default()
        };
        assert!(matches!(
            resolve(&cli, None, None, no_env),
            Err(ConfigError::UnknownProvider(name)) if name == "festival"
        ));
    }

    #[test]
    fn test_unknown_settings_provider_ignored_when_overridden() {
        let settings = ProviderSettings {
            default_provider: Some("festival".to_string()),
            ..ProviderSettings::default()
        };
        let cli = VoiceLayer {
            provider: Some("aivisspeech".to_string()),
            ..VoiceLayer::default()
        };
        let params = resolve(&cli, None, Some(&settings), no_env).unwrap();
        assert_eq!(params.provider(), Provider::AivisSpeech);
    }

    #[test]
    fn test_cloud_key_from_env() {
        let cli = VoiceLayer {
            provider: Some("openai".to_string()),
            ..VoiceLayer::default()
        };
        let env = |key: &str| (key == "OPENAI_API_KEY").then(|| "sk-env".to_string());
        let params = resolve(&cli, None, None, env).unwrap();

        assert_eq!(params.api_key(), Some("sk-env"));
        assert_eq!(params.voice(), Some("alloy"));
        assert_eq!(params.model(), Some("gpt-4o-mini-tts"));
        assert_eq!(params.speaker(), None);
        assert_eq!(params.format(), AudioFormat::Mp3);
    }

    #[test]
    fn test_missing_cloud_key() {
        let cli = VoiceLayer {
            provider: Some("elevenlabs".to_string()),
            ..VoiceLayer::default()
        };
        let err = resolve(&cli, None, None, no_env).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingCredential {
                provider: "elevenlabs",
                env_var: "ELEVENLABS_API_KEY",
                ..
            }
        ));
    }

    #[test]
    fn test_unsupported_format() {
        let cli = VoiceLayer {
            format: Some("mp3".to_string()),
            ..VoiceLayer::default()
        };
        assert!(matches!(
            resolve(&cli, None, None, no_env),
            Err(ConfigError::UnsupportedFormat {
                provider: "voicevox",
                format: "mp3"
            })
        ));
    }

    #[test]
    fn test_invalid_values() {
        let bad_speed = VoiceLayer {
            speed: Some(-2.0),
            ..VoiceLayer::default()
        };
        assert!(matches!(
            resolve(&bad_speed, None, None, no_env),
            Err(ConfigError::InvalidValue { field: "speed", .. })
        ));

        let bad_mode = VoiceLayer {
            mode: Some("loud".to_string()),
            ..VoiceLayer::default()
        };
        assert!(matches!(
            resolve(&bad_mode, None, None, no_env),
            Err(ConfigError::InvalidValue { field: "mode", .. })
        ));
    }

    #[test]
    fn test_elevenlabs_only_fields() {
        let cli = VoiceLayer {
            stability: Some(0.4),
            instructions: Some("whisper".to_string()),
            ..VoiceLayer::default()
        };
        let params = resolve(&cli, None, None, no_env).unwrap();
        assert_eq!(params.stability(), None);
        assert_eq!(params.instructions(), None);

        let cli = VoiceLayer {
            provider: Some("elevenlabs".to_string()),
            api_key: Some("xi".to_string()),
            stability: Some(1.5),
            ..VoiceLayer::default()
        };
        assert!(matches!(
            resolve(&cli, None, None, no_env),
            Err(ConfigError::InvalidValue {
                field: "stability",
                ..
            })
        ));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let cli = VoiceLayer {
            url: Some("http://gpu-box:50021/".to_string()),
            ..VoiceLayer::default()
        };
        let params = resolve(&cli, None, None, no_env).unwrap();
        assert_eq!(params.url(), "http://gpu-box:50021");
    }

    #[test]
    fn test_debug_redacts_key() {
        let cli = VoiceLayer {
            provider: Some("openai".to_string()),
            api_key: Some("sk-secret".to_string()),
            ..VoiceLayer::default()
        };
        let params = resolve(&cli, None, None, no_env).unwrap();
        let debug = format!("{params:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));

        let json = serde_json::to_string(&params).unwrap();
        assert!(!json.contains("sk-secret"));
        assert!(json.contains("\"provider\":\"openai\""));
    }
}
