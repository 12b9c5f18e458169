//! Consumer participant database operations
//!
//! Same dedup model as transfers: synthetic identity, full-value presence.

use crate::models::ConsumerParticipant;
use anyhow::Result;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

pub async fn insert_consumer(
    tx: &mut Transaction<'_, Sqlite>,
    c: &ConsumerParticipant,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO consumer_participants (
            conversation_id, participant_id, first_name, last_name,
            email, phone, joined_at, joined_at_ms
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&c.conversation_id)
    .bind(&c.participant_id)
    .bind(&c.first_name)
    .bind(&c.last_name)
    .bind(&c.email)
    .bind(&c.phone)
    .bind(&c.joined_at)
    .bind(c.joined_at_ms)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

pub async fn load_all(pool: &SqlitePool) -> Result<Vec<ConsumerParticipant>> {
    let rows = sqlx::query(
        r#"
        SELECT conversation_id, participant_id, first_name, last_name,
               email, phone, joined_at, joined_at_ms
        FROM consumer_participants
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| ConsumerParticipant {
            conversation_id: row.get("conversation_id"),
            participant_id: row.get("participant_id"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            email: row.get("email"),
            phone: row.get("phone"),
            joined_at: row.get("joined_at"),
            joined_at_ms: row.get("joined_at_ms"),
        })
        .collect())
}

pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM consumer_participants")
        .fetch_one(pool)
        .await?;

    Ok(count)
}
