//! Configuration loading and resolution
//!
//! Configuration is resolved in priority order:
//! 1. Command-line argument (config file path, highest priority)
//! 2. `DATABRIDGE_CONFIG` environment variable
//! 3. Platform config directory (`~/.config/databridge/config.toml`)
//!
//! Individual vendor credentials may additionally be overridden through
//! environment variables so secrets can stay out of the TOML file.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP bind address, e.g. "127.0.0.1:5800"
    pub bind_address: Option<String>,
    /// SQLite database file path
    pub database_path: Option<PathBuf>,
    #[serde(default)]
    pub mailer: MailerConfig,
    #[serde(default)]
    pub messaging: MessagingConfig,
    #[serde(default)]
    pub pim: PimConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub email: EmailConfig,
}

/// Email-marketing API (static header auth)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MailerConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

/// Customer-messaging API (OAuth1-signed, discovery-based base URI)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MessagingConfig {
    pub account_id: Option<String>,
    pub discovery_url: Option<String>,
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
    pub access_token: Option<String>,
    pub token_secret: Option<String>,
}

/// PIM / product-content API (bearer token via credential exchange)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PimConfig {
    pub base_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Text-to-speech API
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SpeechConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

/// LLM chat-completion API
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ChatConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
}

/// Transactional email API
#[derive(Debug, Clone, Deserialize, Default)]
pub struct EmailConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub from_address: Option<String>,
}

impl AppConfig {
    /// Load configuration following the priority chain described above.
    ///
    /// A missing config file is not an error: every field has a usable
    /// default or is validated at the point of use.
    pub fn load(cli_path: Option<&str>) -> Result<Self> {
        let path = resolve_config_path(cli_path);

        let mut config = match path {
            Some(ref p) if p.exists() => {
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content)
                    .map_err(|e| Error::Config(format!("Parse {} failed: {}", p.display(), e)))?
            }
            _ => AppConfig::default(),
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Environment variables take priority over TOML for secrets
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("DATABRIDGE_MAILER_API_KEY") {
            self.mailer.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("DATABRIDGE_MESSAGING_CONSUMER_SECRET") {
            self.messaging.consumer_secret = Some(v);
        }
        if let Ok(v) = std::env::var("DATABRIDGE_MESSAGING_TOKEN_SECRET") {
            self.messaging.token_secret = Some(v);
        }
        if let Ok(v) = std::env::var("DATABRIDGE_PIM_CLIENT_SECRET") {
            self.pim.client_secret = Some(v);
        }
        if let Ok(v) = std::env::var("DATABRIDGE_SPEECH_API_KEY") {
            self.speech.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("DATABRIDGE_CHAT_API_KEY") {
            self.chat.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("DATABRIDGE_EMAIL_API_KEY") {
            self.email.api_key = Some(v);
        }
    }

    /// HTTP bind address with compiled default
    pub fn bind_address(&self) -> String {
        self.bind_address
            .clone()
            .unwrap_or_else(|| "127.0.0.1:5800".to_string())
    }

    /// Database path with platform default fallback
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| default_data_dir().join("databridge.db"))
    }
}

/// Resolve config file path: CLI arg, then env var, then platform default
fn resolve_config_path(cli_path: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(PathBuf::from(path));
    }

    if let Ok(path) = std::env::var("DATABRIDGE_CONFIG") {
        return Some(PathBuf::from(path));
    }

    dirs::config_dir().map(|d| d.join("databridge").join("config.toml"))
}

/// OS-dependent default data folder
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("databridge"))
        .unwrap_or_else(|| PathBuf::from("./databridge_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = AppConfig::load(Some("/nonexistent/databridge.toml")).unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:5800");
        assert!(config.mailer.base_url.is_none());
    }

    #[test]
    fn toml_sections_parse() {
        let content = r#"
            bind_address = "0.0.0.0:9000"

            [mailer]
            base_url = "https://mailer.example.com/api"
            api_key = "k"

            [messaging]
            account_id = "12345"
            discovery_url = "https://discovery.example.com"

            [pim]
            base_url = "https://pim.example.com"
            client_id = "cid"
        "#;

        let config: AppConfig = toml::from_str(content).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:9000");
        assert_eq!(
            config.mailer.base_url.as_deref(),
            Some("https://mailer.example.com/api")
        );
        assert_eq!(config.messaging.account_id.as_deref(), Some("12345"));
        assert_eq!(config.pim.client_id.as_deref(), Some("cid"));
    }
}
