//! Conversation database operations

use crate::models::Conversation;
use anyhow::Result;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::collections::HashSet;

pub async fn insert_conversation(
    tx: &mut Transaction<'_, Sqlite>,
    c: &Conversation,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO conversations (
            conversation_id, campaign_id, status, end_reason,
            start_time, start_time_ms, end_time, end_time_ms,
            device, browser, operating_system,
            latest_agent_id, latest_skill_name, source,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(&c.conversation_id)
    .bind(&c.campaign_id)
    .bind(&c.status)
    .bind(&c.end_reason)
    .bind(&c.start_time)
    .bind(c.start_time_ms)
    .bind(&c.end_time)
    .bind(c.end_time_ms)
    .bind(&c.device)
    .bind(&c.browser)
    .bind(&c.operating_system)
    .bind(&c.latest_agent_id)
    .bind(&c.latest_skill_name)
    .bind(&c.source)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Field-level merge of an incoming conversation into its existing row.
/// Every mapped field is listed explicitly; no generic object-mapper.
pub async fn update_conversation(
    tx: &mut Transaction<'_, Sqlite>,
    c: &Conversation,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE conversations SET
            campaign_id = ?,
            status = ?,
            end_reason = ?,
            start_time = ?,
            start_time_ms = ?,
            end_time = ?,
            end_time_ms = ?,
            device = ?,
            browser = ?,
            operating_system = ?,
            latest_agent_id = ?,
            latest_skill_name = ?,
            source = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE conversation_id = ?
        "#,
    )
    .bind(&c.campaign_id)
    .bind(&c.status)
    .bind(&c.end_reason)
    .bind(&c.start_time)
    .bind(c.start_time_ms)
    .bind(&c.end_time)
    .bind(c.end_time_ms)
    .bind(&c.device)
    .bind(&c.browser)
    .bind(&c.operating_system)
    .bind(&c.latest_agent_id)
    .bind(&c.latest_skill_name)
    .bind(&c.source)
    .bind(&c.conversation_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// All persisted conversation ids, as a hash set for O(1) lookup during
/// the page loop (conversations are the one type expected to be large).
pub async fn load_ids(pool: &SqlitePool) -> Result<HashSet<String>> {
    let ids: Vec<String> = sqlx::query_scalar("SELECT conversation_id FROM conversations")
        .fetch_all(pool)
        .await?;

    Ok(ids.into_iter().collect())
}

pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM conversations")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

pub async fn list(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<Conversation>> {
    let rows = sqlx::query(
        r#"
        SELECT conversation_id, campaign_id, status, end_reason,
               start_time, start_time_ms, end_time, end_time_ms,
               device, browser, operating_system,
               latest_agent_id, latest_skill_name, source
        FROM conversations
        ORDER BY start_time_ms DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| row_to_conversation(&row)).collect())
}

pub async fn load_by_id(pool: &SqlitePool, conversation_id: &str) -> Result<Option<Conversation>> {
    let row = sqlx::query(
        r#"
        SELECT conversation_id, campaign_id, status, end_reason,
               start_time, start_time_ms, end_time, end_time_ms,
               device, browser, operating_system,
               latest_agent_id, latest_skill_name, source
        FROM conversations
        WHERE conversation_id = ?
        "#,
    )
    .bind(conversation_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| row_to_conversation(&row)))
}

fn row_to_conversation(row: &sqlx::sqlite::SqliteRow) -> Conversation {
    Conversation {
        conversation_id: row.get("conversation_id"),
        campaign_id: row.get("campaign_id"),
        status: row.get("status"),
        end_reason: row.get("end_reason"),
        start_time: row.get("start_time"),
        start_time_ms: row.get("start_time_ms"),
        end_time: row.get("end_time"),
        end_time_ms: row.get("end_time_ms"),
        device: row.get("device"),
        browser: row.get("browser"),
        operating_system: row.get("operating_system"),
        latest_agent_id: row.get("latest_agent_id"),
        latest_skill_name: row.get("latest_skill_name"),
        source: row.get("source"),
    }
}
