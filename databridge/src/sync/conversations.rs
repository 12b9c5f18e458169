//! Conversation reconciliation engine
//!
//! One page of raw conversation-history records is flattened into per-type
//! candidate sets, diffed against the persisted rows by natural key, and
//! committed in a single transaction: unseen candidates insert, known ones
//! get a full field-level overwrite (last writer wins). Transfers and
//! consumer participants have no reliable vendor key, so they only insert
//! when their full value is absent.
//!
//! The engine runs in a tight loop over successive API pages; each page is
//! its own unit of work so nothing accumulates across pages.

use crate::db;
use crate::models::{
    answer_score, decode_summary, Campaign, ConsumerParticipant, Conversation, Interaction,
    Message, NaturalKey, SummaryData, SurveyData, Transfer,
};
use crate::services::messaging_client::{ConversationRecord, MessagingClient};
use anyhow::Result;
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

/// Keep the first occurrence of each natural key
fn dedup_by_key<T: NaturalKey>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.natural_key()))
        .collect()
}

/// One page's worth of candidates, flattened and batch-deduplicated
#[derive(Debug, Default)]
pub struct FlattenedBatch {
    pub campaigns: Vec<Campaign>,
    pub conversations: Vec<Conversation>,
    pub summaries: Vec<SummaryData>,
    pub messages: Vec<Message>,
    pub interactions: Vec<Interaction>,
    pub transfers: Vec<Transfer>,
    pub consumers: Vec<ConsumerParticipant>,
    pub surveys: Vec<SurveyData>,
}

impl FlattenedBatch {
    /// Project every nested collection across the page into flat candidate
    /// sets. If the same natural key appears twice in one page, the first
    /// occurrence wins.
    pub fn from_records(records: &[ConversationRecord]) -> Self {
        let mut batch = FlattenedBatch::default();

        for record in records {
            let conversation_id = record
                .info
                .as_ref()
                .and_then(|info| info.conversation_id.clone());

            if let Some(campaign) = &record.campaign {
                if let Some(campaign_id) = &campaign.campaign_id {
                    batch.campaigns.push(Campaign {
                        campaign_id: campaign_id.clone(),
                        campaign_name: campaign.campaign_name.clone(),
                        engagement_id: campaign.campaign_engagement_id.clone(),
                        engagement_name: campaign.campaign_engagement_name.clone(),
                        goal_id: campaign.goal_id.clone(),
                        goal_name: campaign.goal_name.clone(),
                    });
                }
            }

            if let (Some(info), Some(id)) = (&record.info, &conversation_id) {
                batch.conversations.push(Conversation {
                    conversation_id: id.clone(),
                    campaign_id: record
                        .campaign
                        .as_ref()
                        .and_then(|c| c.campaign_id.clone()),
                    status: info.status.clone(),
                    end_reason: info.conversation_end_reason.clone(),
                    start_time: info.start_time.clone(),
                    start_time_ms: info.start_time_ms,
                    end_time: info.end_time.clone(),
                    end_time_ms: info.end_time_ms,
                    device: info.device.clone(),
                    browser: info.browser.clone(),
                    operating_system: info.operating_system.clone(),
                    latest_agent_id: info.latest_agent_id.clone(),
                    latest_skill_name: info.latest_skill_name.clone(),
                    source: info.source.clone(),
                });
            }

            // Summary: decode failure skips this record's summary only
            if let (Some(raw), Some(id)) = (&record.summary, &conversation_id) {
                if !raw.is_empty() {
                    match decode_summary(raw) {
                        Ok(payload) => batch.summaries.push(SummaryData {
                            conversation_id: id.clone(),
                            text: payload.text,
                            last_updated_ms: payload.last_updated_time,
                        }),
                        Err(e) => {
                            warn!(conversation_id = %id, error = %e, "Summary decode failed, skipping");
                        }
                    }
                }
            }

            // Score and delivery status arrive as separate sub-payloads,
            // joined onto messages by message id
            let scores: HashMap<&str, _> = record
                .message_scores
                .iter()
                .filter_map(|s| s.message_id.as_deref().map(|id| (id, s)))
                .collect();
            let statuses: HashMap<&str, _> = record
                .message_statuses
                .iter()
                .filter_map(|s| s.message_id.as_deref().map(|id| (id, s)))
                .collect();

            for msg in &record.message_records {
                let Some(message_id) = &msg.message_id else {
                    continue;
                };
                let score = scores.get(message_id.as_str());
                let status = statuses.get(message_id.as_str());

                batch.messages.push(Message {
                    message_id: message_id.clone(),
                    conversation_id: conversation_id.clone(),
                    participant_id: msg.participant_id.clone(),
                    sent_by: msg.sent_by.clone(),
                    audience: msg.audience.clone(),
                    message_type: msg.message_type.clone(),
                    text: msg
                        .message_data
                        .as_ref()
                        .and_then(|d| d.msg.as_ref())
                        .and_then(|m| m.text.clone()),
                    sent_at: msg.time.clone(),
                    sent_at_ms: msg.time_ms,
                    score: score.and_then(|s| s.mcs),
                    sentiment: score.and_then(|s| s.sentiment.clone()),
                    delivery_status: status.and_then(|s| s.message_delivery_status.clone()),
                });
            }

            for interaction in &record.interactions {
                let (Some(dialog_id), Some(sequence)) =
                    (&interaction.dialog_id, interaction.sequence)
                else {
                    continue;
                };
                batch.interactions.push(Interaction {
                    dialog_id: dialog_id.clone(),
                    sequence,
                    conversation_id: conversation_id.clone(),
                    agent_id: interaction.agent_id.clone(),
                    interaction_time: interaction.interaction_time.clone(),
                    interaction_time_ms: interaction.interaction_time_ms,
                });
            }

            for transfer in &record.transfers {
                batch.transfers.push(Transfer {
                    conversation_id: conversation_id.clone(),
                    transfer_time: transfer.time.clone(),
                    transfer_time_ms: transfer.time_ms,
                    assigned_agent_id: transfer.assigned_agent_id.clone(),
                    target_skill_id: transfer.target_skill_id,
                    target_skill_name: transfer.target_skill_name.clone(),
                    source_skill_id: transfer.source_skill_id,
                    source_skill_name: transfer.source_skill_name.clone(),
                    reason: transfer.reason.clone(),
                });
            }

            for consumer in &record.consumer_participants {
                batch.consumers.push(ConsumerParticipant {
                    conversation_id: conversation_id.clone(),
                    participant_id: consumer.participant_id.clone(),
                    first_name: consumer.first_name.clone(),
                    last_name: consumer.last_name.clone(),
                    email: consumer.email.clone(),
                    phone: consumer.phone.clone(),
                    joined_at: consumer.time.clone(),
                    joined_at_ms: consumer.time_ms,
                });
            }

            if let Some(id) = &conversation_id {
                for survey in &record.conversation_surveys {
                    for answer in &survey.survey_data {
                        let score = answer.answer.as_deref().and_then(answer_score);
                        batch.surveys.push(SurveyData {
                            answer_id: answer.answer_id.clone().unwrap_or_default(),
                            conversation_id: id.clone(),
                            question_id: answer.question_id.clone().unwrap_or_default(),
                            answer_seq: answer.answer_seq.clone().unwrap_or_default(),
                            question: answer.question.clone(),
                            answer: answer.answer.clone(),
                            answer_score: score,
                            survey_type: survey.survey_type.clone(),
                        });
                    }
                }
            }
        }

        batch.campaigns = dedup_by_key(batch.campaigns);
        batch.conversations = dedup_by_key(batch.conversations);
        batch.summaries = dedup_by_key(batch.summaries);
        batch.messages = dedup_by_key(batch.messages);
        batch.interactions = dedup_by_key(batch.interactions);
        batch.transfers = dedup_by_key(batch.transfers);
        batch.consumers = dedup_by_key(batch.consumers);
        batch.surveys = dedup_by_key(batch.surveys);

        batch
    }
}

/// Outcome of reconciling one page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageReport {
    pub records: usize,
    pub inserted: usize,
    pub updated: usize,
}

/// Reconcile one flattened page against the store in one transaction.
///
/// Entity order is fixed: campaigns, conversations, summaries, messages,
/// interactions, transfers, consumers, surveys. Conversations insert before
/// their children so the child foreign keys resolve within the same
/// transaction.
pub async fn reconcile_page(pool: &SqlitePool, records: &[ConversationRecord]) -> Result<PageReport> {
    let batch = FlattenedBatch::from_records(records);

    let existing_campaigns = db::campaigns::load_ids(pool).await?;
    let existing_conversations = db::conversations::load_ids(pool).await?;
    let existing_summaries = db::summaries::load_conversation_ids(pool).await?;
    let existing_messages = db::messages::load_ids(pool).await?;
    let existing_interactions = db::interactions::load_keys(pool).await?;
    let existing_surveys = db::surveys::load_keys(pool).await?;
    let existing_transfers: HashSet<_> = db::transfers::load_all(pool)
        .await?
        .iter()
        .map(NaturalKey::natural_key)
        .collect();
    let existing_consumers: HashSet<_> = db::consumers::load_all(pool)
        .await?
        .iter()
        .map(NaturalKey::natural_key)
        .collect();

    let mut report = PageReport {
        records: records.len(),
        ..Default::default()
    };
    let mut tx = pool.begin().await?;

    for campaign in &batch.campaigns {
        if existing_campaigns.contains(&campaign.campaign_id) {
            db::campaigns::update_campaign(&mut tx, campaign).await?;
            report.updated += 1;
        } else {
            db::campaigns::insert_campaign(&mut tx, campaign).await?;
            report.inserted += 1;
        }
    }

    for conversation in &batch.conversations {
        if existing_conversations.contains(&conversation.conversation_id) {
            db::conversations::update_conversation(&mut tx, conversation).await?;
            report.updated += 1;
        } else {
            db::conversations::insert_conversation(&mut tx, conversation).await?;
            report.inserted += 1;
        }
    }

    for summary in &batch.summaries {
        if existing_summaries.contains(&summary.conversation_id) {
            db::summaries::update_summary(&mut tx, summary).await?;
            report.updated += 1;
        } else {
            db::summaries::insert_summary(&mut tx, summary).await?;
            report.inserted += 1;
        }
    }

    for message in &batch.messages {
        if existing_messages.contains(&message.message_id) {
            db::messages::update_message(&mut tx, message).await?;
            report.updated += 1;
        } else {
            db::messages::insert_message(&mut tx, message).await?;
            report.inserted += 1;
        }
    }

    for interaction in &batch.interactions {
        if existing_interactions.contains(&interaction.natural_key()) {
            db::interactions::update_interaction(&mut tx, interaction).await?;
            report.updated += 1;
        } else {
            db::interactions::insert_interaction(&mut tx, interaction).await?;
            report.inserted += 1;
        }
    }

    // No reliable vendor key: present-by-value rows are left untouched
    for transfer in &batch.transfers {
        if !existing_transfers.contains(&transfer.natural_key()) {
            db::transfers::insert_transfer(&mut tx, transfer).await?;
            report.inserted += 1;
        }
    }

    for consumer in &batch.consumers {
        if !existing_consumers.contains(&consumer.natural_key()) {
            db::consumers::insert_consumer(&mut tx, consumer).await?;
            report.inserted += 1;
        }
    }

    for survey in &batch.surveys {
        if existing_surveys.contains(&survey.natural_key()) {
            db::surveys::update_survey(&mut tx, survey).await?;
            report.updated += 1;
        } else {
            db::surveys::insert_survey(&mut tx, survey).await?;
            report.inserted += 1;
        }
    }

    tx.commit().await?;
    Ok(report)
}

/// Outcome of one full conversation sync run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub pages: usize,
    pub fetched: usize,
    pub inserted: usize,
    pub updated: usize,
}

/// Drive the reconciliation engine over successive pages.
///
/// Offset advances by the page size; the loop stops at the configured
/// record cap or on the first empty page, whichever comes first. The API
/// has no has-more signal, so the empty page is the sole natural
/// termination.
pub async fn sync_conversations(
    pool: &SqlitePool,
    client: &MessagingClient,
    max_records: u32,
    page_size: u32,
) -> Result<SyncOutcome> {
    let mut outcome = SyncOutcome::default();
    let mut offset = 0u32;

    loop {
        let records = client.fetch_history_page(offset, page_size).await?;
        if records.is_empty() {
            break;
        }

        let report = reconcile_page(pool, &records).await?;
        outcome.pages += 1;
        outcome.fetched += report.records;
        outcome.inserted += report.inserted;
        outcome.updated += report.updated;

        offset += page_size;
        if offset >= max_records {
            break;
        }
    }

    info!(
        pages = outcome.pages,
        fetched = outcome.fetched,
        inserted = outcome.inserted,
        updated = outcome.updated,
        "Conversation sync complete"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::messaging_client::{
        CampaignDto, ConsumerParticipantDto, ConversationSurveyDto, InfoDto, InteractionDto,
        MessageDataDto, MessageRecordDto, MessageScoreDto, MessageStatusDto, MsgDto,
        SurveyAnswerDto, TransferDto,
    };
    use databridge_common::db::init_memory_database;

    fn record(conversation_id: &str) -> ConversationRecord {
        ConversationRecord {
            info: Some(InfoDto {
                conversation_id: Some(conversation_id.to_string()),
                status: Some("OPEN".into()),
                start_time_ms: Some(1_700_000_000_000),
                ..Default::default()
            }),
            campaign: Some(CampaignDto {
                campaign_id: Some("camp-1".into()),
                campaign_name: Some("Spring".into()),
                campaign_engagement_id: None,
                campaign_engagement_name: None,
                goal_id: None,
                goal_name: None,
            }),
            message_records: vec![MessageRecordDto {
                message_id: Some(format!("{}-m1", conversation_id)),
                sent_by: Some("Consumer".into()),
                message_data: Some(MessageDataDto {
                    msg: Some(MsgDto {
                        text: Some("hello".into()),
                    }),
                }),
                time_ms: Some(1_700_000_001_000),
                ..Default::default()
            }],
            message_scores: vec![MessageScoreDto {
                message_id: Some(format!("{}-m1", conversation_id)),
                mcs: Some(1),
                sentiment: Some("positive".into()),
            }],
            message_statuses: vec![MessageStatusDto {
                message_id: Some(format!("{}-m1", conversation_id)),
                message_delivery_status: Some("READ".into()),
            }],
            transfers: vec![TransferDto {
                time_ms: Some(1_700_000_002_000),
                target_skill_name: Some("billing".into()),
                ..Default::default()
            }],
            interactions: vec![InteractionDto {
                dialog_id: Some(conversation_id.to_string()),
                sequence: Some(0),
                agent_id: Some("agent-1".into()),
                ..Default::default()
            }],
            consumer_participants: vec![ConsumerParticipantDto {
                participant_id: Some("p-1".into()),
                email: Some("c@example.com".into()),
                ..Default::default()
            }],
            conversation_surveys: vec![ConversationSurveyDto {
                survey_type: Some("CSAT".into()),
                survey_data: vec![SurveyAnswerDto {
                    answer_id: Some("a-1".into()),
                    question_id: Some("q-1".into()),
                    answer_seq: Some("0".into()),
                    question: Some("Satisfied?".into()),
                    answer: Some("5 - very".into()),
                }],
            }],
            summary: Some(format!(
                "\"{}\"",
                r#"{"text":"resolved","lastUpdatedTime":1700000003000}"#
            )),
        }
    }

    #[test]
    fn flatten_joins_scores_and_statuses_onto_messages() {
        let batch = FlattenedBatch::from_records(&[record("c-1")]);

        assert_eq!(batch.messages.len(), 1);
        let message = &batch.messages[0];
        assert_eq!(message.score, Some(1));
        assert_eq!(message.sentiment.as_deref(), Some("positive"));
        assert_eq!(message.delivery_status.as_deref(), Some("READ"));
        assert_eq!(message.text.as_deref(), Some("hello"));
    }

    #[test]
    fn flatten_deduplicates_within_the_page() {
        let batch = FlattenedBatch::from_records(&[record("c-1"), record("c-1")]);

        assert_eq!(batch.conversations.len(), 1);
        assert_eq!(batch.campaigns.len(), 1);
        assert_eq!(batch.messages.len(), 1);
        assert_eq!(batch.interactions.len(), 1);
        assert_eq!(batch.surveys.len(), 1);
    }

    #[test]
    fn flatten_scores_survey_answers() {
        let batch = FlattenedBatch::from_records(&[record("c-1")]);
        assert_eq!(batch.surveys[0].answer_score, Some(5));
    }

    #[test]
    fn undecodable_summary_is_skipped_not_fatal() {
        let mut bad = record("c-1");
        bad.summary = Some("not json at all".into());

        let batch = FlattenedBatch::from_records(&[bad]);
        assert!(batch.summaries.is_empty());
        assert_eq!(batch.conversations.len(), 1);
    }

    #[tokio::test]
    async fn first_pass_inserts_second_pass_only_updates() {
        let pool = init_memory_database().await.unwrap();
        let records = vec![record("c-1"), record("c-2")];

        let first = reconcile_page(&pool, &records).await.unwrap();
        assert!(first.inserted > 0);
        assert_eq!(first.updated, 0);

        let second = reconcile_page(&pool, &records).await.unwrap();
        assert_eq!(second.inserted, 0);
        assert!(second.updated > 0);

        let conversations = db::conversations::count(&pool).await.unwrap();
        let messages = db::messages::count(&pool).await.unwrap();
        let transfers = db::transfers::count(&pool).await.unwrap();
        let surveys = db::surveys::count(&pool).await.unwrap();
        let summaries = db::summaries::count(&pool).await.unwrap();
        let interactions = db::interactions::count(&pool).await.unwrap();
        let consumers = db::consumers::count(&pool).await.unwrap();
        assert_eq!(conversations, 2);
        assert_eq!(messages, 2);
        assert_eq!(transfers, 2);
        assert_eq!(surveys, 2);
        assert_eq!(summaries, 2);
        assert_eq!(interactions, 2);
        assert_eq!(consumers, 2);
    }

    #[tokio::test]
    async fn conversation_without_campaign_row_still_persists() {
        let pool = init_memory_database().await.unwrap();
        let mut orphan = record("c-9");
        orphan.campaign = None;

        let report = reconcile_page(&pool, &[orphan]).await.unwrap();
        assert!(report.inserted > 0);

        let conversation = db::conversations::load_by_id(&pool, "c-9")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conversation.campaign_id, None);
    }

    #[tokio::test]
    async fn updated_fields_overwrite_existing_rows() {
        let pool = init_memory_database().await.unwrap();
        reconcile_page(&pool, &[record("c-1")]).await.unwrap();

        let mut changed = record("c-1");
        if let Some(info) = changed.info.as_mut() {
            info.status = Some("CLOSE".into());
        }
        reconcile_page(&pool, &[changed]).await.unwrap();

        let conversation = db::conversations::load_by_id(&pool, "c-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conversation.status.as_deref(), Some("CLOSE"));
    }
}
