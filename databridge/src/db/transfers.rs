//! Transfer database operations
//!
//! Transfers carry a synthetic auto-increment identity; reconciliation
//! deduplicates by full value, so only insert and full-row load exist.

use crate::models::Transfer;
use anyhow::Result;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

pub async fn insert_transfer(tx: &mut Transaction<'_, Sqlite>, t: &Transfer) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO transfers (
            conversation_id, transfer_time, transfer_time_ms, assigned_agent_id,
            target_skill_id, target_skill_name, source_skill_id, source_skill_name, reason
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&t.conversation_id)
    .bind(&t.transfer_time)
    .bind(t.transfer_time_ms)
    .bind(&t.assigned_agent_id)
    .bind(t.target_skill_id)
    .bind(&t.target_skill_name)
    .bind(t.source_skill_id)
    .bind(&t.source_skill_name)
    .bind(&t.reason)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

pub async fn load_all(pool: &SqlitePool) -> Result<Vec<Transfer>> {
    let rows = sqlx::query(
        r#"
        SELECT conversation_id, transfer_time, transfer_time_ms, assigned_agent_id,
               target_skill_id, target_skill_name, source_skill_id, source_skill_name, reason
        FROM transfers
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| Transfer {
            conversation_id: row.get("conversation_id"),
            transfer_time: row.get("transfer_time"),
            transfer_time_ms: row.get("transfer_time_ms"),
            assigned_agent_id: row.get("assigned_agent_id"),
            target_skill_id: row.get("target_skill_id"),
            target_skill_name: row.get("target_skill_name"),
            source_skill_id: row.get("source_skill_id"),
            source_skill_name: row.get("source_skill_name"),
            reason: row.get("reason"),
        })
        .collect())
}

pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transfers")
        .fetch_one(pool)
        .await?;

    Ok(count)
}
