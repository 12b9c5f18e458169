//! Conversation graph entities
//!
//! One customer-messaging session (a conversation) is the aggregate root;
//! messages, transfers, interactions, consumer participants, survey answers
//! and the summary all hang off it by conversation id.

use super::NaturalKey;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One customer-messaging session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversation {
    pub conversation_id: String,
    /// Weak reference: the campaign row may not exist yet, or ever
    pub campaign_id: Option<String>,
    pub status: Option<String>,
    pub end_reason: Option<String>,
    pub start_time: Option<String>,
    pub start_time_ms: Option<i64>,
    pub end_time: Option<String>,
    pub end_time_ms: Option<i64>,
    pub device: Option<String>,
    pub browser: Option<String>,
    pub operating_system: Option<String>,
    pub latest_agent_id: Option<String>,
    pub latest_skill_name: Option<String>,
    pub source: Option<String>,
}

impl NaturalKey for Conversation {
    type Key = String;

    fn natural_key(&self) -> String {
        self.conversation_id.clone()
    }
}

/// One message within a conversation, with sentiment score and delivery
/// status joined in from the vendor's separate score/status sub-payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub message_id: String,
    /// Nullable: a message can be orphaned when the conversation header is
    /// missing from the record
    pub conversation_id: Option<String>,
    pub participant_id: Option<String>,
    pub sent_by: Option<String>,
    pub audience: Option<String>,
    pub message_type: Option<String>,
    pub text: Option<String>,
    pub sent_at: Option<String>,
    pub sent_at_ms: Option<i64>,
    pub score: Option<i64>,
    pub sentiment: Option<String>,
    pub delivery_status: Option<String>,
}

impl NaturalKey for Message {
    type Key = String;

    fn natural_key(&self) -> String {
        self.message_id.clone()
    }
}

/// Agent transfer event. No reliable vendor key, so the full field tuple
/// is the identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transfer {
    pub conversation_id: Option<String>,
    pub transfer_time: Option<String>,
    pub transfer_time_ms: Option<i64>,
    pub assigned_agent_id: Option<String>,
    pub target_skill_id: Option<i64>,
    pub target_skill_name: Option<String>,
    pub source_skill_id: Option<i64>,
    pub source_skill_name: Option<String>,
    pub reason: Option<String>,
}

impl NaturalKey for Transfer {
    type Key = (
        Option<String>,
        Option<String>,
        Option<i64>,
        Option<String>,
        Option<i64>,
        Option<String>,
        Option<i64>,
        Option<String>,
        Option<String>,
    );

    fn natural_key(&self) -> Self::Key {
        (
            self.conversation_id.clone(),
            self.transfer_time.clone(),
            self.transfer_time_ms,
            self.assigned_agent_id.clone(),
            self.target_skill_id,
            self.target_skill_name.clone(),
            self.source_skill_id,
            self.source_skill_name.clone(),
            self.reason.clone(),
        )
    }
}

/// Agent interaction, keyed by (dialog id, sequence number)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interaction {
    pub dialog_id: String,
    pub sequence: i64,
    pub conversation_id: Option<String>,
    pub agent_id: Option<String>,
    pub interaction_time: Option<String>,
    pub interaction_time_ms: Option<i64>,
}

impl NaturalKey for Interaction {
    type Key = (String, i64);

    fn natural_key(&self) -> (String, i64) {
        (self.dialog_id.clone(), self.sequence)
    }
}

/// Consumer-side participant. Like transfers, deduplicated by full value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsumerParticipant {
    pub conversation_id: Option<String>,
    pub participant_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub joined_at: Option<String>,
    pub joined_at_ms: Option<i64>,
}

impl NaturalKey for ConsumerParticipant {
    type Key = (
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<i64>,
    );

    fn natural_key(&self) -> Self::Key {
        (
            self.conversation_id.clone(),
            self.participant_id.clone(),
            self.first_name.clone(),
            self.last_name.clone(),
            self.email.clone(),
            self.phone.clone(),
            self.joined_at.clone(),
            self.joined_at_ms,
        )
    }
}

/// One survey answer for a conversation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurveyData {
    pub answer_id: String,
    pub conversation_id: String,
    pub question_id: String,
    pub answer_seq: String,
    pub question: Option<String>,
    pub answer: Option<String>,
    pub answer_score: Option<i64>,
    pub survey_type: Option<String>,
}

impl NaturalKey for SurveyData {
    type Key = (String, String, String, String);

    fn natural_key(&self) -> Self::Key {
        (
            self.answer_id.clone(),
            self.conversation_id.clone(),
            self.question_id.clone(),
            self.answer_seq.clone(),
        )
    }
}

/// Derive the numeric answer score from a free-text survey answer.
///
/// The score is the leading digit only when that digit is immediately
/// followed by whitespace ("5 - satisfied" scores 5, "Satisfied" and "5"
/// alone do not score).
pub fn answer_score(answer: &str) -> Option<i64> {
    let mut chars = answer.chars();
    let first = chars.next()?;
    let second = chars.next()?;

    if first.is_ascii_digit() && second.is_whitespace() {
        Some(i64::from(first as u8 - b'0'))
    } else {
        None
    }
}

/// Conversation summary, parsed out of the doubly-encoded payload field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryData {
    pub conversation_id: String,
    pub text: Option<String>,
    pub last_updated_ms: Option<i64>,
}

impl NaturalKey for SummaryData {
    type Key = String;

    fn natural_key(&self) -> String {
        self.conversation_id.clone()
    }
}

/// Inner summary document once the outer string layer is removed
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SummaryPayload {
    pub text: Option<String>,
    #[serde(rename = "lastUpdatedTime")]
    pub last_updated_time: Option<i64>,
}

/// Failure decoding the doubly-encoded summary field
#[derive(Debug, Error)]
pub enum SummaryDecodeError {
    #[error("Summary value too short to decode: {0:?}")]
    TooShort(String),

    #[error("Summary JSON parse failed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Decode the vendor's summary field.
///
/// The API delivers the summary as a JSON string literal wrapped in its own
/// quotes, i.e. the field value is `"{\"text\":...}"` with the outer quotes
/// still attached. The outer layer is only stripped when the value is
/// actually quote-wrapped; an unwrapped value parses directly instead of
/// being blindly sliced.
pub fn decode_summary(raw: &str) -> Result<SummaryPayload, SummaryDecodeError> {
    if raw.is_empty() {
        return Err(SummaryDecodeError::TooShort(raw.to_string()));
    }

    let inner = if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        &raw[1..raw.len() - 1]
    } else {
        raw
    };

    let payload = serde_json::from_str(inner)?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_score_leading_digit_with_whitespace() {
        assert_eq!(answer_score("5 - satisfied"), Some(5));
        assert_eq!(answer_score("1\tpoor"), Some(1));
    }

    #[test]
    fn answer_score_rejects_non_scoring_answers() {
        assert_eq!(answer_score("Satisfied"), None);
        assert_eq!(answer_score(""), None);
        assert_eq!(answer_score("5"), None);
        assert_eq!(answer_score("55 out of range"), None);
    }

    #[test]
    fn decode_summary_strips_outer_quotes() {
        // Field value as it arrives: the JSON document still wearing its
        // own outer quotes.
        let field = format!(
            "\"{}\"",
            r#"{"text":"resolved billing issue","lastUpdatedTime":1700000000000}"#
        );
        let payload = decode_summary(&field).unwrap();
        assert_eq!(payload.text.as_deref(), Some("resolved billing issue"));
        assert_eq!(payload.last_updated_time, Some(1_700_000_000_000));
    }

    #[test]
    fn decode_summary_accepts_unwrapped_document() {
        let raw = r#"{"text":"plain","lastUpdatedTime":5}"#;
        let payload = decode_summary(raw).unwrap();
        assert_eq!(payload.text.as_deref(), Some("plain"));
    }

    #[test]
    fn decode_summary_rejects_garbage() {
        assert!(decode_summary("").is_err());
        assert!(decode_summary("\"").is_err());
        assert!(decode_summary("not json at all").is_err());
    }

    #[test]
    fn interaction_key_is_dialog_and_sequence() {
        let a = Interaction {
            dialog_id: "d1".into(),
            sequence: 3,
            conversation_id: Some("c1".into()),
            agent_id: None,
            interaction_time: None,
            interaction_time_ms: None,
        };
        let mut b = a.clone();
        b.agent_id = Some("agent".into());

        // Same natural key even when non-key fields differ
        assert_eq!(a.natural_key(), b.natural_key());
    }

    #[test]
    fn transfer_key_covers_every_field() {
        let a = Transfer {
            conversation_id: Some("c1".into()),
            transfer_time: None,
            transfer_time_ms: Some(1),
            assigned_agent_id: None,
            target_skill_id: Some(2),
            target_skill_name: None,
            source_skill_id: None,
            source_skill_name: None,
            reason: None,
        };
        let mut b = a.clone();
        assert_eq!(a.natural_key(), b.natural_key());

        b.reason = Some("escalation".into());
        assert_ne!(a.natural_key(), b.natural_key());
    }
}
