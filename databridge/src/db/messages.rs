//! Message database operations

use crate::models::Message;
use anyhow::Result;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::collections::HashSet;

pub async fn insert_message(tx: &mut Transaction<'_, Sqlite>, m: &Message) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO messages (
            message_id, conversation_id, participant_id, sent_by, audience,
            message_type, text, sent_at, sent_at_ms,
            score, sentiment, delivery_status,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(&m.message_id)
    .bind(&m.conversation_id)
    .bind(&m.participant_id)
    .bind(&m.sent_by)
    .bind(&m.audience)
    .bind(&m.message_type)
    .bind(&m.text)
    .bind(&m.sent_at)
    .bind(m.sent_at_ms)
    .bind(m.score)
    .bind(&m.sentiment)
    .bind(&m.delivery_status)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Field-level merge of an incoming message into its existing row
pub async fn update_message(tx: &mut Transaction<'_, Sqlite>, m: &Message) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE messages SET
            conversation_id = ?,
            participant_id = ?,
            sent_by = ?,
            audience = ?,
            message_type = ?,
            text = ?,
            sent_at = ?,
            sent_at_ms = ?,
            score = ?,
            sentiment = ?,
            delivery_status = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE message_id = ?
        "#,
    )
    .bind(&m.conversation_id)
    .bind(&m.participant_id)
    .bind(&m.sent_by)
    .bind(&m.audience)
    .bind(&m.message_type)
    .bind(&m.text)
    .bind(&m.sent_at)
    .bind(m.sent_at_ms)
    .bind(m.score)
    .bind(&m.sentiment)
    .bind(&m.delivery_status)
    .bind(&m.message_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// All persisted message ids
pub async fn load_ids(pool: &SqlitePool) -> Result<HashSet<String>> {
    let ids: Vec<String> = sqlx::query_scalar("SELECT message_id FROM messages")
        .fetch_all(pool)
        .await?;

    Ok(ids.into_iter().collect())
}

pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

pub async fn list_by_conversation(
    pool: &SqlitePool,
    conversation_id: &str,
) -> Result<Vec<Message>> {
    let rows = sqlx::query(
        r#"
        SELECT message_id, conversation_id, participant_id, sent_by, audience,
               message_type, text, sent_at, sent_at_ms, score, sentiment, delivery_status
        FROM messages
        WHERE conversation_id = ?
        ORDER BY sent_at_ms
        "#,
    )
    .bind(conversation_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| Message {
            message_id: row.get("message_id"),
            conversation_id: row.get("conversation_id"),
            participant_id: row.get("participant_id"),
            sent_by: row.get("sent_by"),
            audience: row.get("audience"),
            message_type: row.get("message_type"),
            text: row.get("text"),
            sent_at: row.get("sent_at"),
            sent_at_ms: row.get("sent_at_ms"),
            score: row.get("score"),
            sentiment: row.get("sentiment"),
            delivery_status: row.get("delivery_status"),
        })
        .collect())
}
