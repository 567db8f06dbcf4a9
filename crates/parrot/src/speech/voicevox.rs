//! VOICEVOX-compatible engines.
//!
//! Synthesis is two calls: `POST /audio_query` builds an editable query
//! for the text, then `POST /synthesis` renders it to WAV. Volume and
//! speed are applied by editing the query in between.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{audio_bytes, send, SpeechProvider};
use crate::error::{SpeechError, SpeechResult};
use crate::voice::{EffectiveVoiceParameters, Provider};

pub struct VoicevoxEngine {
    client: Client,
    provider: Provider,
}

impl VoicevoxEngine {
    /// `provider` is either `Voicevox` or `AivisSpeech`; it only affects
    /// error messages and the fallback speaker.
    pub fn new(client: Client, provider: Provider) -> Self {
        Self { client, provider }
    }
}

#[async_trait]
impl SpeechProvider for VoicevoxEngine {
    async fn synthesize(
        &self,
        text: &str,
        params: &EffectiveVoiceParameters,
    ) -> SpeechResult<Vec<u8>> {
        let speaker = params
            .speaker()
            .or(self.provider.default_speaker())
            .unwrap_or_default()
            .to_string();
        let base = params.url();

        let request = self
            .client
            .post(format!("{base}/audio_query"))
            .query(&[("text", text), ("speaker", speaker.as_str())]);
        let response = send(self.provider, base, request).await?;
        let mut query: Value = response.json().await.map_err(|source| SpeechError::Request {
            provider: self.provider.as_str(),
            source,
        })?;
        apply_scales(&mut query, params);

        let request = self
            .client
            .post(format!("{base}/synthesis"))
            .query(&[("speaker", speaker.as_str())])
            .json(&query);
        let response = send(self.provider, base, request).await?;
        audio_bytes(self.provider, response).await
    }
}

fn apply_scales(query: &mut Value, params: &EffectiveVoiceParameters) {
    if let Some(fields) = query.as_object_mut() {
        fields.insert("volumeScale".to_string(), json!(params.volume()));
        fields.insert("speedScale".to_string(), json!(params.speed()));
    }
}
