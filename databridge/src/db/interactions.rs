//! Interaction database operations (composite key: dialog id + sequence)

use crate::models::Interaction;
use anyhow::Result;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::collections::HashSet;

pub async fn insert_interaction(
    tx: &mut Transaction<'_, Sqlite>,
    i: &Interaction,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO interactions (
            dialog_id, sequence, conversation_id, agent_id,
            interaction_time, interaction_time_ms
        ) VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&i.dialog_id)
    .bind(i.sequence)
    .bind(&i.conversation_id)
    .bind(&i.agent_id)
    .bind(&i.interaction_time)
    .bind(i.interaction_time_ms)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Field-level merge of an incoming interaction into its existing row
pub async fn update_interaction(
    tx: &mut Transaction<'_, Sqlite>,
    i: &Interaction,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE interactions SET
            conversation_id = ?,
            agent_id = ?,
            interaction_time = ?,
            interaction_time_ms = ?
        WHERE dialog_id = ? AND sequence = ?
        "#,
    )
    .bind(&i.conversation_id)
    .bind(&i.agent_id)
    .bind(&i.interaction_time)
    .bind(i.interaction_time_ms)
    .bind(&i.dialog_id)
    .bind(i.sequence)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// All persisted (dialog_id, sequence) keys
pub async fn load_keys(pool: &SqlitePool) -> Result<HashSet<(String, i64)>> {
    let keys: Vec<(String, i64)> =
        sqlx::query_as("SELECT dialog_id, sequence FROM interactions")
            .fetch_all(pool)
            .await?;

    Ok(keys.into_iter().collect())
}

pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM interactions")
        .fetch_one(pool)
        .await?;

    Ok(count)
}
