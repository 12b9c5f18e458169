//! Transactional email API client (thin)

use databridge_common::config::EmailConfig;
use thiserror::Error;

const USER_AGENT: &str = concat!("DataBridge/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email configuration incomplete: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error {0}: {1}")]
    Api(u16, String),
}

/// Transactional email client
pub struct EmailClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    from_address: String,
}

impl EmailClient {
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| EmailError::Config("email.base_url is not set".into()))?;
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| EmailError::Config("email.api_key is not set".into()))?;
        let from_address = config
            .from_address
            .clone()
            .ok_or_else(|| EmailError::Config("email.from_address is not set".into()))?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            from_address,
        })
    }

    /// Send one plain-text email
    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError> {
        let url = format!("{}/v3/mail/send", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "from": { "email": self.from_address },
                "personalizations": [{ "to": [{ "email": to }] }],
                "subject": subject,
                "content": [{ "type": "text/plain", "value": body }],
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(EmailError::Api(status.as_u16(), text));
        }

        Ok(())
    }
}
