//! OpenAI text-to-speech.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{audio_bytes, send, SpeechProvider};
use crate::error::SpeechResult;
use crate::voice::{EffectiveVoiceParameters, Provider};

pub struct OpenAi {
    client: Client,
}

impl OpenAi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SpeechProvider for OpenAi {
    async fn synthesize(
        &self,
        text: &str,
        params: &EffectiveVoiceParameters,
    ) -> SpeechResult<Vec<u8>> {
        let base = params.url();
        let request = self
            .client
            .post(format!("{base}/v1/audio/speech"))
            .bearer_auth(params.api_key().unwrap_or_default())
            .json(&request_body(text, params));
        let response = send(Provider::OpenAi, base, request).await?;
        audio_bytes(Provider::OpenAi, response).await
    }
}

fn request_body(text: &str, params: &EffectiveVoiceParameters) -> Value {
    let mut body = json!({
        "model": params.model().unwrap_or_default(),
        "input": text,
        "voice": params.voice().unwrap_or_default(),
        "response_format": params.format().as_str(),
        // Accepted range is 0.25-4.0
        "speed": params.speed().clamp(0.25, 4.0),
    });
    if let (Some(instructions), Some(fields)) = (params.instructions(), body.as_object_mut()) {
        fields.insert("instructions".to_string(), json!(instructions));
    }
    body
}
