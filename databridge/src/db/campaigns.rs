//! Campaign database operations

use crate::models::Campaign;
use anyhow::Result;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::collections::HashSet;

pub async fn insert_campaign(tx: &mut Transaction<'_, Sqlite>, c: &Campaign) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO campaigns (
            campaign_id, campaign_name, engagement_id, engagement_name,
            goal_id, goal_name, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(&c.campaign_id)
    .bind(&c.campaign_name)
    .bind(&c.engagement_id)
    .bind(&c.engagement_name)
    .bind(&c.goal_id)
    .bind(&c.goal_name)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Field-level merge of an incoming campaign into its existing row
pub async fn update_campaign(tx: &mut Transaction<'_, Sqlite>, c: &Campaign) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE campaigns SET
            campaign_name = ?,
            engagement_id = ?,
            engagement_name = ?,
            goal_id = ?,
            goal_name = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE campaign_id = ?
        "#,
    )
    .bind(&c.campaign_name)
    .bind(&c.engagement_id)
    .bind(&c.engagement_name)
    .bind(&c.goal_id)
    .bind(&c.goal_name)
    .bind(&c.campaign_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// All persisted campaign ids
pub async fn load_ids(pool: &SqlitePool) -> Result<HashSet<String>> {
    let ids: Vec<String> = sqlx::query_scalar("SELECT campaign_id FROM campaigns")
        .fetch_all(pool)
        .await?;

    Ok(ids.into_iter().collect())
}

pub async fn list(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<Campaign>> {
    let rows = sqlx::query(
        r#"
        SELECT campaign_id, campaign_name, engagement_id, engagement_name, goal_id, goal_name
        FROM campaigns
        ORDER BY campaign_id
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| Campaign {
            campaign_id: row.get("campaign_id"),
            campaign_name: row.get("campaign_name"),
            engagement_id: row.get("engagement_id"),
            engagement_name: row.get("engagement_name"),
            goal_id: row.get("goal_id"),
            goal_name: row.get("goal_name"),
        })
        .collect())
}
