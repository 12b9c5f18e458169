//! PIM / product-content API client
//!
//! Bearer authentication with tokens supplied by the credential refresh
//! service. The product listing comes back spreadsheet-shaped (a header row
//! plus value rows) and feeds the product import.

use super::token_service::{CredentialExchange, IssuedTokens, TokenService};
use async_trait::async_trait;
use databridge_common::config::PimConfig;
use serde::Deserialize;
use thiserror::Error;

const USER_AGENT: &str = concat!("DataBridge/", env!("CARGO_PKG_VERSION"));

/// PIM client errors
#[derive(Debug, Error)]
pub enum PimError {
    #[error("PIM configuration incomplete: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Credential error: {0}")]
    Credential(#[from] super::token_service::TokenError),
}

/// Spreadsheet-shaped product listing
#[derive(Debug, Clone, Deserialize)]
pub struct ProductSheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: u64,
}

/// Credential-exchange implementation against the PIM token endpoints
pub struct PimAuthenticator {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
}

impl PimAuthenticator {
    pub fn new(config: &PimConfig) -> Result<Self, PimError> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| PimError::Config("pim.base_url is not set".into()))?;
        let client_id = config
            .client_id
            .clone()
            .ok_or_else(|| PimError::Config("pim.client_id is not set".into()))?;
        let client_secret = config
            .client_secret
            .clone()
            .ok_or_else(|| PimError::Config("pim.client_secret is not set".into()))?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
        })
    }

    async fn token_call(&self, form: &[(&str, &str)]) -> anyhow::Result<IssuedTokens> {
        let url = format!("{}/oauth/token", self.base_url);
        let response = self.http.post(&url).form(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("token endpoint returned {}: {}", status, body);
        }

        let token: TokenResponse = response.json().await?;
        Ok(IssuedTokens {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_in_secs: token.expires_in,
        })
    }
}

#[async_trait]
impl CredentialExchange for PimAuthenticator {
    async fn acquire(&self) -> anyhow::Result<IssuedTokens> {
        self.token_call(&[
            ("grant_type", "client_credentials"),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ])
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> anyhow::Result<IssuedTokens> {
        self.token_call(&[
            ("grant_type", "refresh_token"),
            ("client_id", &self.client_id),
            ("refresh_token", refresh_token),
        ])
        .await
    }
}

/// PIM API client
pub struct PimClient {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenService,
}

impl PimClient {
    pub fn new(config: &PimConfig, tokens: TokenService) -> Result<Self, PimError> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| PimError::Config("pim.base_url is not set".into()))?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    /// Fetch the full product listing as a header row plus value rows
    pub async fn fetch_product_sheet(&self) -> Result<ProductSheet, PimError> {
        let pair = self.tokens.get_valid_tokens().await?;

        let url = format!("{}/api/v1/products/export", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&pair.access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PimError::Api(status.as_u16(), body));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_sheet_deserializes() {
        let body = r#"{
            "headers": ["ArticleId", "Name", "TreePath"],
            "rows": [["1234", "Widget", "/1000/15500"]]
        }"#;
        let sheet: ProductSheet = serde_json::from_str(body).unwrap();
        assert_eq!(sheet.headers.len(), 3);
        assert_eq!(sheet.rows[0][0], "1234");
    }

    #[test]
    fn missing_client_id_is_a_config_error() {
        let config = PimConfig {
            base_url: Some("https://pim.example.com".into()),
            client_id: None,
            client_secret: Some("s".into()),
        };
        assert!(matches!(
            PimAuthenticator::new(&config),
            Err(PimError::Config(_))
        ));
    }
}
