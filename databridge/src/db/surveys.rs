//! Survey answer database operations
//!
//! Natural key: (answer_id, conversation_id, question_id, answer_seq).

use crate::models::SurveyData;
use anyhow::Result;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::collections::HashSet;

pub async fn insert_survey(tx: &mut Transaction<'_, Sqlite>, s: &SurveyData) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO survey_data (
            answer_id, conversation_id, question_id, answer_seq,
            question, answer, answer_score, survey_type
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&s.answer_id)
    .bind(&s.conversation_id)
    .bind(&s.question_id)
    .bind(&s.answer_seq)
    .bind(&s.question)
    .bind(&s.answer)
    .bind(s.answer_score)
    .bind(&s.survey_type)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Field-level merge of an incoming survey answer into its existing row
pub async fn update_survey(tx: &mut Transaction<'_, Sqlite>, s: &SurveyData) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE survey_data SET
            question = ?,
            answer = ?,
            answer_score = ?,
            survey_type = ?
        WHERE answer_id = ? AND conversation_id = ? AND question_id = ? AND answer_seq = ?
        "#,
    )
    .bind(&s.question)
    .bind(&s.answer)
    .bind(s.answer_score)
    .bind(&s.survey_type)
    .bind(&s.answer_id)
    .bind(&s.conversation_id)
    .bind(&s.question_id)
    .bind(&s.answer_seq)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// All persisted survey composite keys
pub async fn load_keys(pool: &SqlitePool) -> Result<HashSet<(String, String, String, String)>> {
    let keys: Vec<(String, String, String, String)> = sqlx::query_as(
        "SELECT answer_id, conversation_id, question_id, answer_seq FROM survey_data",
    )
    .fetch_all(pool)
    .await?;

    Ok(keys.into_iter().collect())
}

pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM survey_data")
        .fetch_one(pool)
        .await?;

    Ok(count)
}
