//! Conversation summary database operations

use crate::models::SummaryData;
use anyhow::Result;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::collections::HashSet;

pub async fn insert_summary(tx: &mut Transaction<'_, Sqlite>, s: &SummaryData) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO summaries (conversation_id, text, last_updated_ms, created_at, updated_at)
        VALUES (?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(&s.conversation_id)
    .bind(&s.text)
    .bind(s.last_updated_ms)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Field-level merge of an incoming summary into its existing row
pub async fn update_summary(tx: &mut Transaction<'_, Sqlite>, s: &SummaryData) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE summaries SET
            text = ?,
            last_updated_ms = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE conversation_id = ?
        "#,
    )
    .bind(&s.text)
    .bind(s.last_updated_ms)
    .bind(&s.conversation_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Conversation ids that already have a summary row
pub async fn load_conversation_ids(pool: &SqlitePool) -> Result<HashSet<String>> {
    let ids: Vec<String> =
        sqlx::query_scalar("SELECT conversation_id FROM summaries WHERE conversation_id IS NOT NULL")
            .fetch_all(pool)
            .await?;

    Ok(ids.into_iter().collect())
}

pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM summaries")
        .fetch_one(pool)
        .await?;

    Ok(count)
}
