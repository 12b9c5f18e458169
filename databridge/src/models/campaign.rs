//! Marketing campaign and flat email-marketing resources
//!
//! Flat resources have no nested children and sync by set-difference
//! insert-only logic. Segments, reports and mailing approvals carry vendor
//! ids; send/open/clickthrough events do not, so their identity is the
//! full field tuple.

use super::NaturalKey;
use serde::Serialize;

/// Marketing campaign referenced (weakly) by conversations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Campaign {
    pub campaign_id: String,
    pub campaign_name: Option<String>,
    pub engagement_id: Option<String>,
    pub engagement_name: Option<String>,
    pub goal_id: Option<String>,
    pub goal_name: Option<String>,
}

impl NaturalKey for Campaign {
    type Key = String;

    fn natural_key(&self) -> String {
        self.campaign_id.clone()
    }
}

/// Mailing-list segment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub segment_id: i64,
    pub name: Option<String>,
    pub description: Option<String>,
    pub member_count: Option<i64>,
}

impl NaturalKey for Segment {
    type Key = i64;

    fn natural_key(&self) -> i64 {
        self.segment_id
    }
}

/// Mailing performance report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub report_id: i64,
    pub name: Option<String>,
    pub subject: Option<String>,
    pub sent_date: Option<String>,
    pub total_sent: Option<i64>,
    pub total_opens: Option<i64>,
    pub total_clicks: Option<i64>,
}

impl NaturalKey for Report {
    type Key = i64;

    fn natural_key(&self) -> i64 {
        self.report_id
    }
}

/// Email send event (no vendor id)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Send {
    pub email: Option<String>,
    pub mailing_id: Option<i64>,
    pub sent_at: Option<String>,
    pub status: Option<String>,
}

impl NaturalKey for Send {
    type Key = (Option<String>, Option<i64>, Option<String>, Option<String>);

    fn natural_key(&self) -> Self::Key {
        (
            self.email.clone(),
            self.mailing_id,
            self.sent_at.clone(),
            self.status.clone(),
        )
    }
}

/// Email open event (no vendor id)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Open {
    pub email: Option<String>,
    pub mailing_id: Option<i64>,
    pub opened_at: Option<String>,
    pub ip_address: Option<String>,
}

impl NaturalKey for Open {
    type Key = (Option<String>, Option<i64>, Option<String>, Option<String>);

    fn natural_key(&self) -> Self::Key {
        (
            self.email.clone(),
            self.mailing_id,
            self.opened_at.clone(),
            self.ip_address.clone(),
        )
    }
}

/// Link clickthrough event (no vendor id)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Clickthrough {
    pub email: Option<String>,
    pub mailing_id: Option<i64>,
    pub clicked_at: Option<String>,
    pub uri: Option<String>,
}

impl NaturalKey for Clickthrough {
    type Key = (Option<String>, Option<i64>, Option<String>, Option<String>);

    fn natural_key(&self) -> Self::Key {
        (
            self.email.clone(),
            self.mailing_id,
            self.clicked_at.clone(),
            self.uri.clone(),
        )
    }
}

/// Pending or resolved mailing approval
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MailingApproval {
    pub mailing_id: i64,
    pub name: Option<String>,
    pub status: Option<String>,
    pub requested_at: Option<String>,
    pub approved_at: Option<String>,
}

impl NaturalKey for MailingApproval {
    type Key = i64;

    fn natural_key(&self) -> i64 {
        self.mailing_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_identity_is_the_full_tuple() {
        let a = Send {
            email: Some("a@example.com".into()),
            mailing_id: Some(7),
            sent_at: Some("2026-01-01T10:00:00Z".into()),
            status: Some("delivered".into()),
        };
        let same = a.clone();
        assert_eq!(a.natural_key(), same.natural_key());

        let mut other = a.clone();
        other.status = Some("bounced".into());
        assert_ne!(a.natural_key(), other.natural_key());
    }

    #[test]
    fn segment_identity_is_vendor_id() {
        let a = Segment {
            segment_id: 42,
            name: Some("VIP".into()),
            description: None,
            member_count: Some(10),
        };
        let mut renamed = a.clone();
        renamed.name = Some("VIP renamed".into());
        assert_eq!(a.natural_key(), renamed.natural_key());
    }
}
