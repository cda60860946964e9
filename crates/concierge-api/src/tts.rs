// Text-to-speech rendering
//
// Synthesis is strictly optional: every failure degrades the response to
// text-only with a TTS_UNAVAILABLE warning. Output audio is never persisted.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

const DEFAULT_API_URL: &str = "https://api.elevenlabs.io/v1/text-to-speech";
const DEFAULT_MODEL_ID: &str = "eleven_multilingual_v2";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Synthesized audio
#[derive(Debug, Clone)]
pub struct TtsAudio {
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// TTS failure classification
#[derive(Debug, Error)]
pub enum TtsError {
    /// Provider not configured (missing API key or voice)
    #[error("TTS not configured")]
    Unavailable,

    /// Provider call failed
    #[error("TTS synthesis failed: {0}")]
    Synthesis(String),
}

/// Seam between the turn controller and the TTS provider
#[async_trait]
pub trait TtsClient: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<TtsAudio, TtsError>;
}

/// REST client for an ElevenLabs-style synthesis API
pub struct HttpTtsClient {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    voice_id: Option<String>,
    model_id: String,
}

impl HttpTtsClient {
    pub fn new(api_key: Option<String>, voice_id: Option<String>, model_id: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_url: DEFAULT_API_URL.to_string(),
            api_key,
            voice_id,
            model_id: model_id.unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
        }
    }

    pub fn with_base_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

#[async_trait]
impl TtsClient for HttpTtsClient {
    async fn synthesize(&self, text: &str) -> Result<TtsAudio, TtsError> {
        if text.trim().is_empty() {
            return Err(TtsError::Synthesis("empty text".into()));
        }
        let (Some(api_key), Some(voice_id)) = (&self.api_key, &self.voice_id) else {
            return Err(TtsError::Unavailable);
        };

        debug!(text_len = text.len(), "TTS synthesis starting");

        let url = format!(
            "{}/{voice_id}?output_format=mp3_44100_128",
            self.api_url
        );
        let response = self
            .client
            .post(&url)
            .header("xi-api-key", api_key)
            .json(&json!({ "text": text, "model_id": self.model_id }))
            .send()
            .await
            .map_err(|e| TtsError::Synthesis(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(TtsError::Synthesis(format!("provider returned {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TtsError::Synthesis(e.to_string()))?;

        debug!(audio_bytes = bytes.len(), "TTS synthesis completed");
        Ok(TtsAudio {
            mime_type: "audio/mpeg",
            bytes: bytes.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_client_is_unavailable() {
        let client = HttpTtsClient::new(None, None, None);
        assert!(matches!(
            client.synthesize("Hello").await,
            Err(TtsError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn empty_text_is_rejected_before_the_provider() {
        let client = HttpTtsClient::new(Some("k".into()), Some("v".into()), None);
        assert!(matches!(
            client.synthesize("   ").await,
            Err(TtsError::Synthesis(_))
        ));
    }
}
