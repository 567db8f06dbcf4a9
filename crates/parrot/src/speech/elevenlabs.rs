//! ElevenLabs text-to-speech.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};

use super::{audio_bytes, send, SpeechProvider};
use crate::error::SpeechResult;
use crate::voice::{EffectiveVoiceParameters, Provider};

const OUTPUT_FORMAT: &str = "mp3_44100_128";

pub struct ElevenLabs {
    client: Client,
}

impl ElevenLabs {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SpeechProvider for ElevenLabs {
    async fn synthesize(
        &self,
        text: &str,
        params: &EffectiveVoiceParameters,
    ) -> SpeechResult<Vec<u8>> {
        let base = params.url();
        let voice = params.voice().unwrap_or_default();
        let request = self
            .client
            .post(format!("{base}/v1/text-to-speech/{voice}"))
            .query(&[("output_format", OUTPUT_FORMAT)])
            .header("xi-api-key", params.api_key().unwrap_or_default())
            .json(&request_body(text, params));
        let response = send(Provider::ElevenLabs, base, request).await?;
        audio_bytes(Provider::ElevenLabs, response).await
    }
}

fn request_body(text: &str, params: &EffectiveVoiceParameters) -> Value {
    let mut settings = Map::new();
    if let Some(stability) = params.stability() {
        settings.insert("stability".to_string(), json!(stability));
    }
    if let Some(boost) = params.similarity_boost() {
        settings.insert("similarity_boost".to_string(), json!(boost));
    }
    if params.speed() != 1.0 {
        // Accepted range is 0.7-1.2
        settings.insert("speed".to_string(), json!(params.speed().clamp(0.7, 1.2)));
    }

    let mut body = json!({
        "text": text,
        "model_id": params.model().unwrap_or_default(),
    });
    if let Some(fields) = body.as_object_mut() {
        if !settings.is_empty() {
            fields.insert("voice_settings".to_string(), Value::Object(settings));
        }
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::{resolve, VoiceLayer};

    fn params(layer: VoiceLayer) -> EffectiveVoiceParameters {
        let layer = VoiceLayer {
            provider: Some("elevenlabs".to_string()),
            api_key: Some("xi-test".to_string()),
            ..layer
        };
        resolve(&layer, None, None, |_| None).unwrap()
    }

    #[test]
    fn test_body_without_settings() {
        let body = request_body("Hello", &params(VoiceLayer::default()));
        assert_eq!(
            body,
            json!({"text": "Hello", "model_id": "eleven_multilingual_v2"})
        );
    }

    #[test]
    fn test_body_with_voice_settings() {
        let body = request_body(
            "Hello",
            &params(VoiceLayer {
                stability: Some(0.4),
                similarity_boost: Some(0.9),
                speed: Some(2.0),
                ..VoiceLayer::default()
            }),
        );
        assert_eq!(
            body["voice_settings"],
            json!({"stability": 0.4, "similarity_boost": 0.9, "speed": 1.2})
        );
    }
}
