//! Per-field precedence of the voice resolver across all four layers.
//!
//! Tests CAN use `.unwrap()` and `.expect()` - this is allowed.

use std::collections::BTreeMap;

use parrot_cli::voice::{
    resolve, AudioFormat, PersonaDescriptor, Provider, ProviderSettings, ReadingMode, VoiceFlags,
    VoiceLayer,
};
use parrot_cli::ConfigError;

fn no_env(_: &str) -> Option<String> {
    None
}

fn persona(voice: VoiceLayer) -> PersonaDescriptor {
    PersonaDescriptor {
        persona: Some("pirate".to_string()),
        voice: Some(voice),
    }
}

fn settings(default_provider: Option<&str>, sections: &[(&str, VoiceLayer)]) -> ProviderSettings {
    ProviderSettings {
        default_provider: default_provider.map(str::to_string),
        reading_mode: None,
        max_chars: None,
        providers: sections
            .iter()
            .map(|(name, layer)| (name.to_string(), layer.clone()))
            .collect::<BTreeMap<_, _>>(),
    }
}

// ============================================================================
// Precedence
// ============================================================================

#[test]
fn test_each_layer_wins_only_its_own_fields() {
    // speed from CLI, volume from persona, mode from settings, rest default
    let cli = VoiceFlags {
        speed: 1.4,
        ..VoiceFlags::default()
    }
    .to_layer();
    let persona = persona(VoiceLayer {
        speed: Some(0.8),
        volume: Some(0.6),
        ..VoiceLayer::default()
    });
    let settings = settings(
        None,
        &[(
            "voicevox",
            VoiceLayer {
                speed: Some(0.5),
                volume: Some(0.3),
                mode: Some("full".to_string()),
                ..VoiceLayer::default()
            },
        )],
    );

    let params = resolve(&cli, Some(&persona), Some(&settings), no_env).unwrap();

    assert_eq!(params.speed(), 1.4);
    assert_eq!(params.volume(), 0.6);
    assert_eq!(params.mode(), ReadingMode::Full);
    assert_eq!(params.speaker(), Some(3));
    assert_eq!(params.format(), AudioFormat::Wav);
}

#[test]
fn test_sentinel_flags_fall_through() {
    // Flags left at their sentinels must not shadow lower layers
    let cli = VoiceFlags::default().to_layer();
    let persona = persona(VoiceLayer {
        speaker: Some(8),
        volume: Some(0.7),
        ..VoiceLayer::default()
    });

    let params = resolve(&cli, Some(&persona), None, no_env).unwrap();

    assert_eq!(params.speaker(), Some(8));
    assert_eq!(params.volume(), 0.7);
}

#[test]
fn test_persona_sentinels_fall_through_to_settings() {
    let persona = persona(VoiceLayer {
        speaker: Some(0),
        volume: Some(1.0),
        ..VoiceLayer::default()
    });
    let settings = settings(
        None,
        &[(
            "voicevox",
            VoiceLayer {
                speaker: Some(2),
                volume: Some(0.9),
                ..VoiceLayer::default()
            },
        )],
    );

    let params = resolve(&VoiceLayer::default(), Some(&persona), Some(&settings), no_env).unwrap();

    assert_eq!(params.speaker(), Some(2));
    assert_eq!(params.volume(), 0.9);
}

#[test]
fn test_provider_precedence() {
    let settings = settings(Some("aivisspeech"), &[]);
    let persona = persona(VoiceLayer {
        provider: Some("voicevox".to_string()),
        ..VoiceLayer::default()
    });
    let cli = VoiceLayer {
        provider: Some("openai".to_string()),
        api_key: Some("sk".to_string()),
        ..VoiceLayer::default()
    };

    let from_settings = resolve(&VoiceLayer::default(), None, Some(&settings), no_env).unwrap();
    assert_eq!(from_settings.provider(), Provider::AivisSpeech);

    let from_persona =
        resolve(&VoiceLayer::default(), Some(&persona), Some(&settings), no_env).unwrap();
    assert_eq!(from_persona.provider(), Provider::Voicevox);

    let from_cli = resolve(&cli, Some(&persona), Some(&settings), no_env).unwrap();
    assert_eq!(from_cli.provider(), Provider::OpenAi);
}

// ============================================================================
// Engine isolation
// ============================================================================

#[test]
fn test_switching_local_engine_never_leaks_speaker() {
    let persona = persona(VoiceLayer {
        provider: Some("voicevox".to_string()),
        speaker: Some(8),
        volume: Some(0.5),
        ..VoiceLayer::default()
    });
    let settings = settings(
        None,
        &[
            (
                "voicevox",
                VoiceLayer {
                    speaker: Some(13),
                    ..VoiceLayer::default()
                },
            ),
            (
                "aivisspeech",
                VoiceLayer {
                    speaker: Some(1_431_611_904),
                    ..VoiceLayer::default()
                },
            ),
        ],
    );
    let switch_to_aivis = VoiceLayer {
        provider: Some("aivisspeech".to_string()),
        ..VoiceLayer::default()
    };

    let voicevox = resolve(&VoiceLayer::default(), Some(&persona), Some(&settings), no_env).unwrap();
    assert_eq!(voicevox.speaker(), Some(8));

    let aivis = resolve(&switch_to_aivis, Some(&persona), Some(&settings), no_env).unwrap();
    assert_eq!(aivis.provider(), Provider::AivisSpeech);
    assert_eq!(aivis.speaker(), Some(1_431_611_904));
    // Engine-neutral persona fields still apply
    assert_eq!(aivis.volume(), 0.5);

    let aivis_defaults = resolve(&switch_to_aivis, Some(&persona), None, no_env).unwrap();
    assert_eq!(aivis_defaults.speaker(), Some(888_753_760));
}

#[test]
fn test_persona_without_provider_applies_to_any_engine() {
    let persona = persona(VoiceLayer {
        voice: Some("nova".to_string()),
        ..VoiceLayer::default()
    });
    let cli = VoiceLayer {
        provider: Some("openai".to_string()),
        ..VoiceLayer::default()
    };
    let env = |key: &str| (key == "OPENAI_API_KEY").then(|| "sk-env".to_string());

    let params = resolve(&cli, Some(&persona), None, env).unwrap();
    assert_eq!(params.voice(), Some("nova"));
    assert_eq!(params.speaker(), None);
}

#[test]
fn test_cloud_voice_from_other_provider_not_used() {
    let persona = persona(VoiceLayer {
        provider: Some("openai".to_string()),
        voice: Some("nova".to_string()),
        api_key: Some("sk-openai".to_string()),
        ..VoiceLayer::default()
    });
    let cli = VoiceLayer {
        provider: Some("elevenlabs".to_string()),
        ..VoiceLayer::default()
    };
    let env = |key: &str| (key == "ELEVENLABS_API_KEY").then(|| "xi-env".to_string());

    let params = resolve(&cli, Some(&persona), None, env).unwrap();
    assert_eq!(params.voice(), Some("21m00Tcm4TlvDq8ikWAM"));
    assert_eq!(params.api_key(), Some("xi-env"));
}

// ============================================================================
// Credentials and determinism
// ============================================================================

#[test]
fn test_missing_credential_names_variable() {
    let settings = settings(Some("openai"), &[]);
    let err = resolve(&VoiceLayer::default(), None, Some(&settings), no_env).unwrap_err();

    assert!(matches!(
        err,
        ConfigError::MissingCredential {
            env_var: "OPENAI_API_KEY",
            ..
        }
    ));
    assert!(err.to_string().contains("OPENAI_API_KEY"));
}

#[test]
fn test_settings_key_beats_environment() {
    let settings = settings(
        Some("openai"),
        &[(
            "openai",
            VoiceLayer {
                api_key: Some("sk-file".to_string()),
                ..VoiceLayer::default()
            },
        )],
    );
    let env = |_: &str| Some("sk-env".to_string());

    let params = resolve(&VoiceLayer::default(), None, Some(&settings), env).unwrap();
    assert_eq!(params.api_key(), Some("sk-file"));
}

#[test]
fn test_resolve_is_deterministic() {
    let cli = VoiceLayer {
        speed: Some(1.2),
        ..VoiceLayer::default()
    };
    let persona = persona(VoiceLayer {
        provider: Some("aivisspeech".to_string()),
        speaker: Some(5),
        ..VoiceLayer::default()
    });
    let settings = settings(Some("voicevox"), &[]);

    let first = resolve(&cli, Some(&persona), Some(&settings), no_env).unwrap();
    let second = resolve(&cli, Some(&persona), Some(&settings), no_env).unwrap();
    assert_eq!(first, second);
}
