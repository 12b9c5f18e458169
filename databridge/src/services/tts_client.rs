//! Text-to-speech API client (thin)

use databridge_common::config::SpeechConfig;
use thiserror::Error;

const USER_AGENT: &str = concat!("DataBridge/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum TtsError {
    #[error("Speech configuration incomplete: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error {0}: {1}")]
    Api(u16, String),
}

/// Text-to-speech client
pub struct TtsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl TtsClient {
    pub fn new(config: &SpeechConfig) -> Result<Self, TtsError> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| TtsError::Config("speech.base_url is not set".into()))?;
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| TtsError::Config("speech.api_key is not set".into()))?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Synthesize `text` with the named voice, returning raw audio bytes
    pub async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, TtsError> {
        let url = format!("{}/v1/synthesize", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "text": text, "voice": voice }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TtsError::Api(status.as_u16(), body));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
