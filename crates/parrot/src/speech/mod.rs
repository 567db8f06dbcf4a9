//! Speech synthesis and playback.
//!
//! - `voicevox` - VOICEVOX-compatible local engines (VOICEVOX, AivisSpeech)
//! - `openai` - OpenAI `/v1/audio/speech`
//! - `elevenlabs` - ElevenLabs `/v1/text-to-speech/{voice}`
//! - `player` - hands audio bytes to a platform player
//!
//! Requests are never retried. A hook that cannot speak logs and moves on.

mod elevenlabs;
mod openai;
mod player;
mod voicevox;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::debug;

pub use elevenlabs::ElevenLabs;
pub use openai::OpenAi;
pub use player::Player;
pub use voicevox::VoicevoxEngine;

use crate::error::{SpeechError, SpeechResult};
use crate::voice::{EffectiveVoiceParameters, Provider};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const ERROR_BODY_LIMIT: usize = 200;

// ============================================================================
// Traits
// ============================================================================

/// Turns text into encoded audio.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        params: &EffectiveVoiceParameters,
    ) -> SpeechResult<Vec<u8>>;
}

/// Speaks text end to end. The dispatcher only sees this seam.
#[async_trait]
pub trait SpeechSink: Send + Sync {
    async fn speak(&self, text: &str, params: &EffectiveVoiceParameters) -> SpeechResult<()>;
}

// ============================================================================
// Speaker
// ============================================================================

/// Synthesizes with the selected provider and plays the result.
pub struct Speaker {
    client: Client,
    player: Player,
}

impl Speaker {
    pub fn new(player: Player) -> Self {
        Self {
            client: http_client(),
            player,
        }
    }

    /// Synthesizes without playing; used by `speak --output`.
    pub async fn synthesize(
        &self,
        text: &str,
        params: &EffectiveVoiceParameters,
    ) -> SpeechResult<Vec<u8>> {
        let provider = provider_for(params.provider(), self.client.clone());
        let audio = provider.synthesize(text, params).await?;
        debug!(
            provider = %params.provider(),
            bytes = audio.len(),
            "Synthesized speech"
        );
        Ok(audio)
    }
}

#[async_trait]
impl SpeechSink for Speaker {
    async fn speak(&self, text: &str, params: &EffectiveVoiceParameters) -> SpeechResult<()> {
        let audio = self.synthesize(text, params).await?;
        self.player.play(&audio, params).await
    }
}

/// Picks the implementation for `provider`.
pub fn provider_for(provider: Provider, client: Client) -> Box<dyn SpeechProvider> {
    match provider {
        Provider::Voicevox | Provider::AivisSpeech => {
            Box::new(VoicevoxEngine::new(client, provider))
        }
        Provider::OpenAi => Box::new(OpenAi::new(client)),
        Provider::ElevenLabs => Box::new(ElevenLabs::new(client)),
    }
}

// ============================================================================
// HTTP helpers
// ============================================================================

/// Shared client with the speech timeouts applied.
pub fn http_client() -> Client {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Sends `request` and maps transport failures and error statuses.
pub(crate) async fn send(
    provider: Provider,
    url: &str,
    request: RequestBuilder,
) -> SpeechResult<Response> {
    let response = request.send().await.map_err(|source| {
        if source.is_connect() {
            SpeechError::Unreachable {
                provider: provider.as_str(),
                url: url.to_string(),
                source,
            }
        } else {
            SpeechError::Request {
                provider: provider.as_str(),
                source,
            }
        }
    })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(provider, status, &body))
}

/// Reads a successful response body.
pub(crate) async fn audio_bytes(provider: Provider, response: Response) -> SpeechResult<Vec<u8>> {
    response
        .bytes()
        .await
        .map(|bytes| bytes.to_vec())
        .map_err(|source| SpeechError::Request {
            provider: provider.as_str(),
            source,
        })
}

fn status_error(provider: Provider, status: StatusCode, body: &str) -> SpeechError {
    let provider = provider.as_str();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SpeechError::Auth {
            provider,
            status: status.as_u16(),
        },
        StatusCode::TOO_MANY_REQUESTS | StatusCode::PAYMENT_REQUIRED => {
            SpeechError::Quota { provider }
        }
        _ => SpeechError::Http {
            provider,
            status: status.as_u16(),
            body: body.trim().chars().take(ERROR_BODY_LIMIT).collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(Provider::OpenAi, StatusCode::UNAUTHORIZED, ""),
            SpeechError::Auth {
                provider: "openai",
                status: 401
            }
        ));
        assert!(matches!(
            status_error(Provider::ElevenLabs, StatusCode::TOO_MANY_REQUESTS, ""),
            SpeechError::Quota {
                provider: "elevenlabs"
            }
        ));
        assert!(matches!(
            status_error(Provider::Voicevox, StatusCode::UNPROCESSABLE_ENTITY, "bad speaker"),
            SpeechError::Http { status: 422, ref body, .. } if body == "bad speaker"
        ));
    }

    #[test]
    fn test_error_body_truncated() {
        let long = "x".repeat(1000);
        let SpeechError::Http { body, .. } =
            status_error(Provider::OpenAi, StatusCode::INTERNAL_SERVER_ERROR, &long)
        else {
            panic!("expected Http error");
        };
        assert_eq!(body.len(), ERROR_BODY_LIMIT);
    }
}
