//! Email-marketing API client
//!
//! Static header authentication; every endpoint returns a JSON array. The
//! caller assembles the trailing date window, the client only appends it as
//! query parameters.

use crate::models::{Clickthrough, MailingApproval, Open, Report, Segment, Send};
use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;
use thiserror::Error;

const USER_AGENT: &str = concat!("DataBridge/", env!("CARGO_PKG_VERSION"));

/// Email-marketing client errors
#[derive(Debug, Error)]
pub enum MailerError {
    #[error("Mailer configuration incomplete: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error {0}: {1}")]
    Api(u16, String),
}

/// Inclusive date range appended to event-feed requests
#[derive(Debug, Clone, Copy)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Window covering the trailing `days` days up to today
    pub fn trailing_days(days: i64) -> Self {
        let end = Utc::now().date_naive();
        Self {
            start: end - Duration::days(days),
            end,
        }
    }

    fn query(&self) -> String {
        format!("dateStart={}&dateEnd={}", self.start, self.end)
    }
}

#[derive(Debug, Deserialize)]
struct SegmentDto {
    #[serde(rename = "SegmentID")]
    segment_id: i64,
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Description")]
    description: Option<String>,
    #[serde(rename = "MemberCount")]
    member_count: Option<i64>,
}

impl From<SegmentDto> for Segment {
    fn from(dto: SegmentDto) -> Self {
        Segment {
            segment_id: dto.segment_id,
            name: dto.name,
            description: dto.description,
            member_count: dto.member_count,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReportDto {
    #[serde(rename = "ReportID")]
    report_id: i64,
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Subject")]
    subject: Option<String>,
    #[serde(rename = "SentDate")]
    sent_date: Option<String>,
    #[serde(rename = "TotalSent")]
    total_sent: Option<i64>,
    #[serde(rename = "TotalOpens")]
    total_opens: Option<i64>,
    #[serde(rename = "TotalClicks")]
    total_clicks: Option<i64>,
}

impl From<ReportDto> for Report {
    fn from(dto: ReportDto) -> Self {
        Report {
            report_id: dto.report_id,
            name: dto.name,
            subject: dto.subject,
            sent_date: dto.sent_date,
            total_sent: dto.total_sent,
            total_opens: dto.total_opens,
            total_clicks: dto.total_clicks,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SendDto {
    #[serde(rename = "Email")]
    email: Option<String>,
    #[serde(rename = "MailingID")]
    mailing_id: Option<i64>,
    #[serde(rename = "SentDateTime")]
    sent_at: Option<String>,
    #[serde(rename = "Status")]
    status: Option<String>,
}

impl From<SendDto> for Send {
    fn from(dto: SendDto) -> Self {
        Send {
            email: dto.email,
            mailing_id: dto.mailing_id,
            sent_at: dto.sent_at,
            status: dto.status,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenDto {
    #[serde(rename = "Email")]
    email: Option<String>,
    #[serde(rename = "MailingID")]
    mailing_id: Option<i64>,
    #[serde(rename = "OpenDateTime")]
    opened_at: Option<String>,
    #[serde(rename = "IPAddress")]
    ip_address: Option<String>,
}

impl From<OpenDto> for Open {
    fn from(dto: OpenDto) -> Self {
        Open {
            email: dto.email,
            mailing_id: dto.mailing_id,
            opened_at: dto.opened_at,
            ip_address: dto.ip_address,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ClickthroughDto {
    #[serde(rename = "Email")]
    email: Option<String>,
    #[serde(rename = "MailingID")]
    mailing_id: Option<i64>,
    #[serde(rename = "ClickDateTime")]
    clicked_at: Option<String>,
    #[serde(rename = "URI")]
    uri: Option<String>,
}

impl From<ClickthroughDto> for Clickthrough {
    fn from(dto: ClickthroughDto) -> Self {
        Clickthrough {
            email: dto.email,
            mailing_id: dto.mailing_id,
            clicked_at: dto.clicked_at,
            uri: dto.uri,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MailingApprovalDto {
    #[serde(rename = "MailingID")]
    mailing_id: i64,
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Status")]
    status: Option<String>,
    #[serde(rename = "RequestedDateTime")]
    requested_at: Option<String>,
    #[serde(rename = "ApprovedDateTime")]
    approved_at: Option<String>,
}

impl From<MailingApprovalDto> for MailingApproval {
    fn from(dto: MailingApprovalDto) -> Self {
        MailingApproval {
            mailing_id: dto.mailing_id,
            name: dto.name,
            status: dto.status,
            requested_at: dto.requested_at,
            approved_at: dto.approved_at,
        }
    }
}

/// Email-marketing API client
pub struct MailerClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl MailerClient {
    pub fn new(
        config: &databridge_common::config::MailerConfig,
    ) -> Result<Self, MailerError> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| MailerError::Config("mailer.base_url is not set".into()))?;
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| MailerError::Config("mailer.api_key is not set".into()))?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Fetch a JSON array listing from `path_and_query`
    async fn get_list<T: serde::de::DeserializeOwned>(
        &self,
        path_and_query: &str,
    ) -> Result<Vec<T>, MailerError> {
        let url = format!("{}/{}", self.base_url, path_and_query);
        let response = self
            .http
            .get(&url)
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailerError::Api(status.as_u16(), body));
        }

        Ok(response.json().await?)
    }

    pub async fn fetch_segments(&self) -> Result<Vec<Segment>, MailerError> {
        let dtos: Vec<SegmentDto> = self.get_list("segments").await?;
        Ok(dtos.into_iter().map(Segment::from).collect())
    }

    pub async fn fetch_reports(&self, window: &DateWindow) -> Result<Vec<Report>, MailerError> {
        let dtos: Vec<ReportDto> = self
            .get_list(&format!("reports?{}", window.query()))
            .await?;
        Ok(dtos.into_iter().map(Report::from).collect())
    }

    pub async fn fetch_sends(&self, window: &DateWindow) -> Result<Vec<Send>, MailerError> {
        let dtos: Vec<SendDto> = self
            .get_list(&format!("reports/sends?{}", window.query()))
            .await?;
        Ok(dtos.into_iter().map(Send::from).collect())
    }

    pub async fn fetch_opens(&self, window: &DateWindow) -> Result<Vec<Open>, MailerError> {
        let dtos: Vec<OpenDto> = self
            .get_list(&format!("reports/opens?{}", window.query()))
            .await?;
        Ok(dtos.into_iter().map(Open::from).collect())
    }

    pub async fn fetch_clickthroughs(
        &self,
        window: &DateWindow,
    ) -> Result<Vec<Clickthrough>, MailerError> {
        let dtos: Vec<ClickthroughDto> = self
            .get_list(&format!("reports/clickthroughs?{}", window.query()))
            .await?;
        Ok(dtos.into_iter().map(Clickthrough::from).collect())
    }

    pub async fn fetch_mailing_approvals(&self) -> Result<Vec<MailingApproval>, MailerError> {
        let dtos: Vec<MailingApprovalDto> = self.get_list("mailings/approvals").await?;
        Ok(dtos.into_iter().map(MailingApproval::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_window_spans_requested_days() {
        let window = DateWindow::trailing_days(30);
        assert_eq!(window.end - window.start, Duration::days(30));
    }

    #[test]
    fn window_query_uses_iso_dates() {
        let window = DateWindow {
            start: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
        };
        assert_eq!(window.query(), "dateStart=2026-01-01&dateEnd=2026-01-31");
    }

    #[test]
    fn missing_base_url_is_a_config_error() {
        let config = databridge_common::config::MailerConfig {
            base_url: None,
            api_key: Some("k".into()),
        };
        assert!(matches!(
            MailerClient::new(&config),
            Err(MailerError::Config(_))
        ));
    }
}
