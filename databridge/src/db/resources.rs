//! Flat resource database operations
//!
//! Implements the flat sync engine's persistence seam for every insert-only
//! resource, plus the listing queries the web API reads from.

use crate::models::{Clickthrough, MailingApproval, Open, Report, Segment, Send};
use crate::sync::flat::FlatEntity;
use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

#[async_trait]
impl FlatEntity for Segment {
    const TABLE: &'static str = "segments";

    async fn load_all(pool: &SqlitePool) -> Result<Vec<Self>> {
        let rows = sqlx::query(
            "SELECT segment_id, name, description, member_count FROM segments",
        )
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Segment {
                segment_id: row.get("segment_id"),
                name: row.get("name"),
                description: row.get("description"),
                member_count: row.get("member_count"),
            })
            .collect())
    }

    async fn insert(&self, tx: &mut Transaction<'_, Sqlite>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO segments (segment_id, name, description, member_count, created_at)
            VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP)
            "#,
        )
        .bind(self.segment_id)
        .bind(&self.name)
        .bind(&self.description)
        .bind(self.member_count)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl FlatEntity for Report {
    const TABLE: &'static str = "reports";

    async fn load_all(pool: &SqlitePool) -> Result<Vec<Self>> {
        let rows = sqlx::query(
            r#"
            SELECT report_id, name, subject, sent_date, total_sent, total_opens, total_clicks
            FROM reports
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Report {
                report_id: row.get("report_id"),
                name: row.get("name"),
                subject: row.get("subject"),
                sent_date: row.get("sent_date"),
                total_sent: row.get("total_sent"),
                total_opens: row.get("total_opens"),
                total_clicks: row.get("total_clicks"),
            })
            .collect())
    }

    async fn insert(&self, tx: &mut Transaction<'_, Sqlite>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reports (
                report_id, name, subject, sent_date, total_sent, total_opens, total_clicks, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            "#,
        )
        .bind(self.report_id)
        .bind(&self.name)
        .bind(&self.subject)
        .bind(&self.sent_date)
        .bind(self.total_sent)
        .bind(self.total_opens)
        .bind(self.total_clicks)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl FlatEntity for Send {
    const TABLE: &'static str = "sends";

    async fn load_all(pool: &SqlitePool) -> Result<Vec<Self>> {
        let rows = sqlx::query("SELECT email, mailing_id, sent_at, status FROM sends")
            .fetch_all(pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| Send {
                email: row.get("email"),
                mailing_id: row.get("mailing_id"),
                sent_at: row.get("sent_at"),
                status: row.get("status"),
            })
            .collect())
    }

    async fn insert(&self, tx: &mut Transaction<'_, Sqlite>) -> Result<()> {
        sqlx::query("INSERT INTO sends (email, mailing_id, sent_at, status) VALUES (?, ?, ?, ?)")
            .bind(&self.email)
            .bind(self.mailing_id)
            .bind(&self.sent_at)
            .bind(&self.status)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl FlatEntity for Open {
    const TABLE: &'static str = "opens";

    async fn load_all(pool: &SqlitePool) -> Result<Vec<Self>> {
        let rows = sqlx::query("SELECT email, mailing_id, opened_at, ip_address FROM opens")
            .fetch_all(pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| Open {
                email: row.get("email"),
                mailing_id: row.get("mailing_id"),
                opened_at: row.get("opened_at"),
                ip_address: row.get("ip_address"),
            })
            .collect())
    }

    async fn insert(&self, tx: &mut Transaction<'_, Sqlite>) -> Result<()> {
        sqlx::query(
            "INSERT INTO opens (email, mailing_id, opened_at, ip_address) VALUES (?, ?, ?, ?)",
        )
        .bind(&self.email)
        .bind(self.mailing_id)
        .bind(&self.opened_at)
        .bind(&self.ip_address)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl FlatEntity for Clickthrough {
    const TABLE: &'static str = "clickthroughs";

    async fn load_all(pool: &SqlitePool) -> Result<Vec<Self>> {
        let rows = sqlx::query("SELECT email, mailing_id, clicked_at, uri FROM clickthroughs")
            .fetch_all(pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| Clickthrough {
                email: row.get("email"),
                mailing_id: row.get("mailing_id"),
                clicked_at: row.get("clicked_at"),
                uri: row.get("uri"),
            })
            .collect())
    }

    async fn insert(&self, tx: &mut Transaction<'_, Sqlite>) -> Result<()> {
        sqlx::query(
            "INSERT INTO clickthroughs (email, mailing_id, clicked_at, uri) VALUES (?, ?, ?, ?)",
        )
        .bind(&self.email)
        .bind(self.mailing_id)
        .bind(&self.clicked_at)
        .bind(&self.uri)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl FlatEntity for MailingApproval {
    const TABLE: &'static str = "mailing_approvals";

    async fn load_all(pool: &SqlitePool) -> Result<Vec<Self>> {
        let rows = sqlx::query(
            "SELECT mailing_id, name, status, requested_at, approved_at FROM mailing_approvals",
        )
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| MailingApproval {
                mailing_id: row.get("mailing_id"),
                name: row.get("name"),
                status: row.get("status"),
                requested_at: row.get("requested_at"),
                approved_at: row.get("approved_at"),
            })
            .collect())
    }

    async fn insert(&self, tx: &mut Transaction<'_, Sqlite>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO mailing_approvals (mailing_id, name, status, requested_at, approved_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(self.mailing_id)
        .bind(&self.name)
        .bind(&self.status)
        .bind(&self.requested_at)
        .bind(&self.approved_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

pub async fn list_segments(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<Segment>> {
    let rows = sqlx::query(
        r#"
        SELECT segment_id, name, description, member_count
        FROM segments ORDER BY segment_id LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| Segment {
            segment_id: row.get("segment_id"),
            name: row.get("name"),
            description: row.get("description"),
            member_count: row.get("member_count"),
        })
        .collect())
}

pub async fn list_reports(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<Report>> {
    let rows = sqlx::query(
        r#"
        SELECT report_id, name, subject, sent_date, total_sent, total_opens, total_clicks
        FROM reports ORDER BY report_id LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| Report {
            report_id: row.get("report_id"),
            name: row.get("name"),
            subject: row.get("subject"),
            sent_date: row.get("sent_date"),
            total_sent: row.get("total_sent"),
            total_opens: row.get("total_opens"),
            total_clicks: row.get("total_clicks"),
        })
        .collect())
}
