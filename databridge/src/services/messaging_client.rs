//! Customer-messaging API client
//!
//! Requests are OAuth1-signed (HMAC-SHA1). The message-history base URI is
//! per-tenant and resolved through a discovery call before the first
//! substantive request, then cached for the process lifetime. Conversation
//! history is fetched in fixed-size pages by offset.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use databridge_common::config::MessagingConfig;
use hmac::{Hmac, Mac};
use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;
use sha1::Sha1;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info};

type HmacSha1 = Hmac<Sha1>;

const USER_AGENT: &str = concat!("DataBridge/", env!("CARGO_PKG_VERSION"));

/// Messaging client errors
#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("Messaging configuration incomplete: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Service discovery failed: {0}")]
    Discovery(String),

    #[error("Request signing failed: {0}")]
    Signing(String),
}

/// OAuth1 credential set for request signing
#[derive(Debug, Clone)]
struct OAuth1Credentials {
    consumer_key: String,
    consumer_secret: String,
    access_token: String,
    token_secret: String,
}

/// Percent-encode per RFC 3986 (unreserved characters pass through)
fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Compute the OAuth1 HMAC-SHA1 signature over `method`, the unqueried
/// `base_url` and the combined oauth + query parameters.
fn sign_request(
    method: &str,
    base_url: &str,
    params: &[(String, String)],
    consumer_secret: &str,
    token_secret: &str,
) -> Result<String, MessagingError> {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();

    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let base_string = format!(
        "{}&{}&{}",
        method,
        percent_encode(base_url),
        percent_encode(&param_string)
    );

    let signing_key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    );

    let mut mac = HmacSha1::new_from_slice(signing_key.as_bytes())
        .map_err(|e| MessagingError::Signing(e.to_string()))?;
    mac.update(base_string.as_bytes());

    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

impl OAuth1Credentials {
    /// Build the `Authorization: OAuth ...` header value for one request
    fn authorization_header(
        &self,
        method: &str,
        base_url: &str,
        query: &[(String, String)],
    ) -> Result<String, MessagingError> {
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();
        let timestamp = chrono::Utc::now().timestamp().to_string();

        let oauth_params = vec![
            ("oauth_consumer_key".to_string(), self.consumer_key.clone()),
            ("oauth_nonce".to_string(), nonce),
            ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
            ("oauth_timestamp".to_string(), timestamp),
            ("oauth_token".to_string(), self.access_token.clone()),
            ("oauth_version".to_string(), "1.0".to_string()),
        ];

        let mut all_params = oauth_params.clone();
        all_params.extend_from_slice(query);

        let signature = sign_request(
            method,
            base_url,
            &all_params,
            &self.consumer_secret,
            &self.token_secret,
        )?;

        let mut header = String::from("OAuth ");
        for (k, v) in &oauth_params {
            header.push_str(&format!("{}=\"{}\", ", k, percent_encode(v)));
        }
        header.push_str(&format!("oauth_signature=\"{}\"", percent_encode(&signature)));

        Ok(header)
    }
}

// --- Wire DTOs for the nested conversation-history payload ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    #[serde(default)]
    pub conversation_history_records: Vec<ConversationRecord>,
}

/// One raw conversation record: a tree of one header, zero-or-one campaign
/// and the nested child collections.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    pub info: Option<InfoDto>,
    pub campaign: Option<CampaignDto>,
    #[serde(default)]
    pub message_records: Vec<MessageRecordDto>,
    #[serde(default)]
    pub message_scores: Vec<MessageScoreDto>,
    #[serde(default)]
    pub message_statuses: Vec<MessageStatusDto>,
    #[serde(default)]
    pub transfers: Vec<TransferDto>,
    #[serde(default)]
    pub interactions: Vec<InteractionDto>,
    #[serde(default)]
    pub consumer_participants: Vec<ConsumerParticipantDto>,
    #[serde(default)]
    pub conversation_surveys: Vec<ConversationSurveyDto>,
    /// Doubly-encoded JSON summary document, still wearing its outer quotes
    pub summary: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoDto {
    pub conversation_id: Option<String>,
    pub status: Option<String>,
    pub conversation_end_reason: Option<String>,
    pub start_time: Option<String>,
    #[serde(rename = "startTimeL")]
    pub start_time_ms: Option<i64>,
    pub end_time: Option<String>,
    #[serde(rename = "endTimeL")]
    pub end_time_ms: Option<i64>,
    pub device: Option<String>,
    pub browser: Option<String>,
    pub operating_system: Option<String>,
    pub latest_agent_id: Option<String>,
    pub latest_skill_name: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignDto {
    pub campaign_id: Option<String>,
    pub campaign_name: Option<String>,
    pub campaign_engagement_id: Option<String>,
    pub campaign_engagement_name: Option<String>,
    pub goal_id: Option<String>,
    pub goal_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecordDto {
    pub message_id: Option<String>,
    pub participant_id: Option<String>,
    pub sent_by: Option<String>,
    pub audience: Option<String>,
    #[serde(rename = "type")]
    pub message_type: Option<String>,
    pub message_data: Option<MessageDataDto>,
    pub time: Option<String>,
    #[serde(rename = "timeL")]
    pub time_ms: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDataDto {
    pub msg: Option<MsgDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgDto {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageScoreDto {
    pub message_id: Option<String>,
    pub mcs: Option<i64>,
    pub sentiment: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageStatusDto {
    pub message_id: Option<String>,
    pub message_delivery_status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferDto {
    pub time: Option<String>,
    #[serde(rename = "timeL")]
    pub time_ms: Option<i64>,
    pub assigned_agent_id: Option<String>,
    pub target_skill_id: Option<i64>,
    pub target_skill_name: Option<String>,
    pub source_skill_id: Option<i64>,
    pub source_skill_name: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionDto {
    pub dialog_id: Option<String>,
    #[serde(rename = "interactiveSequence")]
    pub sequence: Option<i64>,
    pub agent_id: Option<String>,
    pub interaction_time: Option<String>,
    #[serde(rename = "interactionTimeL")]
    pub interaction_time_ms: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerParticipantDto {
    pub participant_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub time: Option<String>,
    #[serde(rename = "timeL")]
    pub time_ms: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSurveyDto {
    pub survey_type: Option<String>,
    #[serde(default)]
    pub survey_data: Vec<SurveyAnswerDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyAnswerDto {
    pub answer_id: Option<String>,
    pub question_id: Option<String>,
    pub answer_seq: Option<String>,
    pub question: Option<String>,
    pub answer: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DiscoveryResponse {
    #[serde(rename = "baseURI")]
    base_uri: String,
}

/// Customer-messaging API client
pub struct MessagingClient {
    http: reqwest::Client,
    account_id: String,
    discovery_url: String,
    credentials: OAuth1Credentials,
    base_url: OnceCell<String>,
}

impl MessagingClient {
    pub fn new(config: &MessagingConfig) -> Result<Self, MessagingError> {
        let require = |value: &Option<String>, name: &str| {
            value
                .clone()
                .ok_or_else(|| MessagingError::Config(format!("messaging.{} is not set", name)))
        };

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        Ok(Self {
            http,
            account_id: require(&config.account_id, "account_id")?,
            discovery_url: require(&config.discovery_url, "discovery_url")?
                .trim_end_matches('/')
                .to_string(),
            credentials: OAuth1Credentials {
                consumer_key: require(&config.consumer_key, "consumer_key")?,
                consumer_secret: require(&config.consumer_secret, "consumer_secret")?,
                access_token: require(&config.access_token, "access_token")?,
                token_secret: require(&config.token_secret, "token_secret")?,
            },
            base_url: OnceCell::new(),
        })
    }

    /// Test constructor: skip discovery and talk to `base_url` directly
    pub fn with_base_url(config: &MessagingConfig, base_url: String) -> Result<Self, MessagingError> {
        let client = Self::new(config)?;
        Ok(Self {
            base_url: OnceCell::new_with(Some(base_url.trim_end_matches('/').to_string())),
            ..client
        })
    }

    /// Resolve (once) the per-account message-history base URI
    async fn resolve_base_url(&self) -> Result<&str, MessagingError> {
        let url = self
            .base_url
            .get_or_try_init(|| async {
                let discovery = format!(
                    "{}/api/account/{}/service/msgHist/baseURI?version=1.0",
                    self.discovery_url, self.account_id
                );
                debug!(url = %discovery, "Resolving messaging base URI");

                let response = self.http.get(&discovery).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(MessagingError::Discovery(format!(
                        "discovery returned {}",
                        status
                    )));
                }

                let dto: DiscoveryResponse = response
                    .json()
                    .await
                    .map_err(|e| MessagingError::Discovery(e.to_string()))?;

                let resolved = if dto.base_uri.starts_with("http") {
                    dto.base_uri.trim_end_matches('/').to_string()
                } else {
                    format!("https://{}", dto.base_uri.trim_end_matches('/'))
                };
                info!(base_uri = %resolved, "Messaging base URI resolved");
                Ok(resolved)
            })
            .await?;

        Ok(url)
    }

    /// Fetch one page of conversation history.
    ///
    /// The API exposes no total count or next-page token; the caller stops
    /// on the first empty page.
    pub async fn fetch_history_page(
        &self,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<ConversationRecord>, MessagingError> {
        let base = self.resolve_base_url().await?;
        let url = format!(
            "{}/messaging_history/api/account/{}/conversations/search",
            base, self.account_id
        );

        let query = vec![
            ("offset".to_string(), offset.to_string()),
            ("limit".to_string(), limit.to_string()),
        ];
        let authorization = self
            .credentials
            .authorization_header("POST", &url, &query)?;

        let response = self
            .http
            .post(&url)
            .query(&[("offset", offset), ("limit", limit)])
            .header("Authorization", authorization)
            .json(&serde_json::json!({}))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MessagingError::Api(status.as_u16(), body));
        }

        let history: HistoryResponse = response.json().await?;
        debug!(
            offset,
            limit,
            records = history.conversation_history_records.len(),
            "Fetched conversation history page"
        );
        Ok(history.conversation_history_records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_encoding_covers_reserved_characters() {
        assert_eq!(percent_encode("abc-._~XYZ123"), "abc-._~XYZ123");
        assert_eq!(percent_encode("a b&c=d"), "a%20b%26c%3Dd");
        assert_eq!(percent_encode("https://x"), "https%3A%2F%2Fx");
    }

    #[test]
    fn signature_is_deterministic_for_fixed_inputs() {
        let params = vec![
            ("oauth_consumer_key".to_string(), "ck".to_string()),
            ("oauth_nonce".to_string(), "fixed".to_string()),
            ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
            ("oauth_timestamp".to_string(), "1700000000".to_string()),
            ("oauth_token".to_string(), "at".to_string()),
            ("oauth_version".to_string(), "1.0".to_string()),
        ];

        let a = sign_request("POST", "https://api.example.com/search", &params, "cs", "ts")
            .unwrap();
        let b = sign_request("POST", "https://api.example.com/search", &params, "cs", "ts")
            .unwrap();
        assert_eq!(a, b);

        // Any parameter change must change the signature
        let mut altered = params.clone();
        altered[1].1 = "other".to_string();
        let c = sign_request("POST", "https://api.example.com/search", &altered, "cs", "ts")
            .unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn authorization_header_carries_oauth_fields() {
        let credentials = OAuth1Credentials {
            consumer_key: "ck".into(),
            consumer_secret: "cs".into(),
            access_token: "at".into(),
            token_secret: "ts".into(),
        };
        let header = credentials
            .authorization_header("POST", "https://api.example.com/search", &[])
            .unwrap();

        assert!(header.starts_with("OAuth "));
        assert!(header.contains("oauth_consumer_key=\"ck\""));
        assert!(header.contains("oauth_signature_method=\"HMAC-SHA1\""));
        assert!(header.contains("oauth_signature=\""));
    }

    #[test]
    fn history_payload_deserializes_nested_graph() {
        let body = r#"{
            "conversationHistoryRecords": [{
                "info": {
                    "conversationId": "c-1",
                    "status": "CLOSE",
                    "startTimeL": 1700000000000
                },
                "campaign": { "campaignId": "camp-1", "campaignName": "Spring" },
                "messageRecords": [{
                    "messageId": "m-1",
                    "sentBy": "Consumer",
                    "messageData": { "msg": { "text": "hello" } },
                    "timeL": 1700000001000
                }],
                "messageScores": [{ "messageId": "m-1", "mcs": 1 }],
                "messageStatuses": [{ "messageId": "m-1", "messageDeliveryStatus": "READ" }],
                "interactions": [{ "dialogId": "d-1", "interactiveSequence": 0 }],
                "conversationSurveys": [{
                    "surveyType": "CSAT",
                    "surveyData": [{ "answerId": "a-1", "questionId": "q-1", "answer": "5 - great" }]
                }]
            }]
        }"#;

        let parsed: HistoryResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.conversation_history_records.len(), 1);

        let record = &parsed.conversation_history_records[0];
        let info = record.info.as_ref().unwrap();
        assert_eq!(info.conversation_id.as_deref(), Some("c-1"));
        assert_eq!(record.message_records[0].message_id.as_deref(), Some("m-1"));
        assert_eq!(
            record.message_records[0]
                .message_data
                .as_ref()
                .and_then(|d| d.msg.as_ref())
                .and_then(|m| m.text.as_deref()),
            Some("hello")
        );
        assert_eq!(record.interactions[0].sequence, Some(0));
        assert_eq!(record.conversation_surveys[0].survey_data.len(), 1);
    }
}
