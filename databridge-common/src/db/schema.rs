//! Table schema creation
//!
//! One table per persisted entity. Creation is idempotent
//! (`CREATE TABLE IF NOT EXISTS`) and runs on every startup.
//!
//! Identity columns are vendor-supplied where the vendor provides a stable
//! id, and locally auto-incremented where it does not (sends, opens,
//! clickthroughs, transfers, consumer participants). `campaign_id` on
//! conversations is a weak reference: conversations may arrive before or
//! without their campaign, so no foreign key constraint is declared there.

use crate::Result;
use sqlx::SqlitePool;

/// Create every DataBridge table and index
pub async fn create_all_tables(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;

    // Conversation graph
    create_campaigns_table(pool).await?;
    create_conversations_table(pool).await?;
    create_summaries_table(pool).await?;
    create_messages_table(pool).await?;
    create_interactions_table(pool).await?;
    create_transfers_table(pool).await?;
    create_consumer_participants_table(pool).await?;
    create_survey_data_table(pool).await?;

    // Flat marketing resources
    create_segments_table(pool).await?;
    create_reports_table(pool).await?;
    create_sends_table(pool).await?;
    create_opens_table(pool).await?;
    create_clickthroughs_table(pool).await?;
    create_mailing_approvals_table(pool).await?;

    // Product content
    create_products_table(pool).await?;

    Ok(())
}

/// Create the settings table
///
/// Stores application configuration key-value pairs and sync watermarks.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_campaigns_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS campaigns (
            campaign_id TEXT PRIMARY KEY,
            campaign_name TEXT,
            engagement_id TEXT,
            engagement_name TEXT,
            goal_id TEXT,
            goal_name TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the conversations table
///
/// The aggregate root of the messaging graph. Timestamps are stored in
/// both the vendor's string form and epoch milliseconds, as received.
pub async fn create_conversations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS conversations (
            conversation_id TEXT PRIMARY KEY,
            campaign_id TEXT,
            status TEXT,
            end_reason TEXT,
            start_time TEXT,
            start_time_ms INTEGER,
            end_time TEXT,
            end_time_ms INTEGER,
            device TEXT,
            browser TEXT,
            operating_system TEXT,
            latest_agent_id TEXT,
            latest_skill_name TEXT,
            source TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_conversations_campaign ON conversations(campaign_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_conversations_start ON conversations(start_time_ms)")
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn create_summaries_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS summaries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            conversation_id TEXT UNIQUE REFERENCES conversations(conversation_id),
            text TEXT,
            last_updated_ms INTEGER,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_messages_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            message_id TEXT PRIMARY KEY,
            conversation_id TEXT REFERENCES conversations(conversation_id),
            participant_id TEXT,
            sent_by TEXT,
            audience TEXT,
            message_type TEXT,
            text TEXT,
            sent_at TEXT,
            sent_at_ms INTEGER,
            score INTEGER,
            sentiment TEXT,
            delivery_status TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the interactions table
///
/// Natural key is the composite (dialog_id, sequence).
pub async fn create_interactions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS interactions (
            dialog_id TEXT NOT NULL,
            sequence INTEGER NOT NULL,
            conversation_id TEXT REFERENCES conversations(conversation_id),
            agent_id TEXT,
            interaction_time TEXT,
            interaction_time_ms INTEGER,
            PRIMARY KEY (dialog_id, sequence)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_interactions_conversation ON interactions(conversation_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the transfers table
///
/// The vendor's key space is not unique across pagination, so a synthetic
/// auto-increment identity is used and rows deduplicate by full value.
pub async fn create_transfers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transfers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            conversation_id TEXT REFERENCES conversations(conversation_id),
            transfer_time TEXT,
            transfer_time_ms INTEGER,
            assigned_agent_id TEXT,
            target_skill_id INTEGER,
            target_skill_name TEXT,
            source_skill_id INTEGER,
            source_skill_name TEXT,
            reason TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_transfers_conversation ON transfers(conversation_id)")
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn create_consumer_participants_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS consumer_participants (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            conversation_id TEXT REFERENCES conversations(conversation_id),
            participant_id TEXT,
            first_name TEXT,
            last_name TEXT,
            email TEXT,
            phone TEXT,
            joined_at TEXT,
            joined_at_ms INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_consumer_participants_conversation ON consumer_participants(conversation_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the survey_data table
///
/// Natural key is (answer_id, conversation_id, question_id, answer_seq).
pub async fn create_survey_data_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS survey_data (
            answer_id TEXT NOT NULL,
            conversation_id TEXT NOT NULL REFERENCES conversations(conversation_id),
            question_id TEXT NOT NULL,
            answer_seq TEXT NOT NULL DEFAULT '',
            question TEXT,
            answer TEXT,
            answer_score INTEGER,
            survey_type TEXT,
            PRIMARY KEY (answer_id, conversation_id, question_id, answer_seq)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_segments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS segments (
            segment_id INTEGER PRIMARY KEY,
            name TEXT,
            description TEXT,
            member_count INTEGER,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_reports_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reports (
            report_id INTEGER PRIMARY KEY,
            name TEXT,
            subject TEXT,
            sent_date TEXT,
            total_sent INTEGER,
            total_opens INTEGER,
            total_clicks INTEGER,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the sends table
///
/// Send events carry no vendor id; two events with all identical fields
/// are the same event, so dedup happens by full value in the sync engine.
pub async fn create_sends_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sends (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT,
            mailing_id INTEGER,
            sent_at TEXT,
            status TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sends_mailing ON sends(mailing_id)")
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn create_opens_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS opens (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT,
            mailing_id INTEGER,
            opened_at TEXT,
            ip_address TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_opens_mailing ON opens(mailing_id)")
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn create_clickthroughs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS clickthroughs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT,
            mailing_id INTEGER,
            clicked_at TEXT,
            uri TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_clickthroughs_mailing ON clickthroughs(mailing_id)")
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn create_mailing_approvals_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS mailing_approvals (
            mailing_id INTEGER PRIMARY KEY,
            name TEXT,
            status TEXT,
            requested_at TEXT,
            approved_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the products table
///
/// A wide denormalized record keyed by the vendor's integer article id.
/// Dimension and class id columns are derived from the delimited
/// tree_path / class_mapping source fields at import time.
pub async fn create_products_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            article_id INTEGER PRIMARY KEY,
            name TEXT,
            description TEXT,
            brand TEXT,
            color TEXT,
            tree_path TEXT,
            class_mapping TEXT,
            dimension1 INTEGER,
            dimension2 INTEGER,
            dimension3 INTEGER,
            dimension4 INTEGER,
            dimension5 INTEGER,
            dimension6 INTEGER,
            class_id1 INTEGER,
            class_id2 INTEGER,
            class_id3 INTEGER,
            class_id4 INTEGER,
            class_id5 INTEGER,
            price REAL,
            weight_kg REAL,
            in_stock INTEGER,
            discontinued INTEGER,
            launch_date TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_brand ON products(brand)")
        .execute(pool)
        .await?;

    Ok(())
}
