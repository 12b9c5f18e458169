//! Recurring sync jobs
//!
//! Each job is a tokio task that sleeps until its next cron occurrence,
//! runs to completion and records the outcome in a shared status map read
//! by the health endpoint. Failures are logged and never retried in-band;
//! the next scheduled tick is the retry.

use crate::services::mailer_client::{DateWindow, MailerClient};
use crate::services::messaging_client::MessagingClient;
use crate::services::pim_client::PimClient;
use crate::services::token_service::TokenService;
use crate::sync;
use anyhow::Result;
use chrono::{DateTime, Utc};
use croner::Cron;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

const HOURLY: &str = "0 * * * *";
const DAILY: &str = "0 1 * * *";
const DAILY_PRODUCTS: &str = "0 3 * * *";
const WEEKLY: &str = "0 2 * * 0";

/// Trailing window applied to the hourly event feeds
const EVENT_WINDOW_DAYS: i64 = 30;

/// Record caps for the hourly and weekly conversation syncs
const CONVERSATION_BATCH: u32 = 200;
const CONVERSATION_FULL_BATCH: u32 = 20_000;
const CONVERSATION_PAGE_SIZE: u32 = 100;

/// Last recorded outcome of one job
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub last_run: DateTime<Utc>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Shared status map keyed by job name, read by the health endpoint
pub type JobStatusMap = Arc<RwLock<HashMap<String, JobStatus>>>;

/// Most recent job error across all jobs
pub type LastError = Arc<RwLock<Option<String>>>;

/// Everything the job set needs; vendor clients are optional because an
/// unconfigured integration simply has no jobs.
#[derive(Clone)]
pub struct JobContext {
    pub pool: SqlitePool,
    pub mailer: Option<Arc<MailerClient>>,
    pub messaging: Option<Arc<MessagingClient>>,
    pub pim: Option<Arc<PimClient>>,
    pub tokens: Option<TokenService>,
    pub statuses: JobStatusMap,
    pub last_error: LastError,
}

async fn record_outcome(
    name: &str,
    statuses: &JobStatusMap,
    last_error: &LastError,
    result: Result<()>,
) {
    let status = match &result {
        Ok(()) => JobStatus {
            last_run: Utc::now(),
            success: true,
            error: None,
        },
        Err(e) => {
            error!(job = name, error = %e, "Job failed");
            let message = format!("{}: {:#}", name, e);
            *last_error.write().await = Some(message);
            JobStatus {
                last_run: Utc::now(),
                success: false,
                error: Some(format!("{:#}", e)),
            }
        }
    };
    statuses.write().await.insert(name.to_string(), status);
}

/// Spawn one recurring job driven by a cron expression
fn spawn_job<F, Fut>(
    name: &'static str,
    cron_expr: &str,
    statuses: JobStatusMap,
    last_error: LastError,
    task: F,
) -> Result<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send,
{
    let cron = Cron::new(cron_expr)
        .parse()
        .map_err(|e| anyhow::anyhow!("cron expression {:?} for {}: {}", cron_expr, name, e))?;

    tokio::spawn(async move {
        info!(job = name, "Job scheduled");
        loop {
            let now = Utc::now();
            let next = match cron.find_next_occurrence(&now, false) {
                Ok(next) => next,
                Err(e) => {
                    error!(job = name, error = %e, "No next occurrence, job stopping");
                    break;
                }
            };

            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            info!(job = name, "Job starting");
            let result = task().await;
            record_outcome(name, &statuses, &last_error, result).await;
        }
    });

    Ok(())
}

/// Record a per-resource sync watermark for operator visibility
async fn touch_watermark(pool: &SqlitePool, resource: &str) -> Result<()> {
    let key = format!("last_sync_{}", resource);
    databridge_common::db::set_setting(pool, &key, &Utc::now().to_rfc3339()).await?;
    Ok(())
}

/// Register and spawn the full recurring job set
pub fn start_jobs(ctx: JobContext) -> Result<()> {
    if let Some(tokens) = ctx.tokens.clone() {
        spawn_job(
            "issue-credential",
            DAILY,
            ctx.statuses.clone(),
            ctx.last_error.clone(),
            move || {
                let tokens = tokens.clone();
                async move {
                    tokens.get_valid_tokens().await?;
                    Ok(())
                }
            },
        )?;
    } else {
        warn!("PIM credentials not configured, issue-credential job disabled");
    }

    if let Some(mailer) = ctx.mailer.clone() {
        let flat_jobs: [(&'static str, &'static str); 6] = [
            ("sync-segments", "segments"),
            ("sync-reports", "reports"),
            ("sync-sends", "sends"),
            ("sync-opens", "opens"),
            ("sync-clickthroughs", "clickthroughs"),
            ("sync-mailing-approvals", "mailing_approvals"),
        ];

        for (job_name, resource) in flat_jobs {
            let mailer = mailer.clone();
            let pool = ctx.pool.clone();
            spawn_job(
                job_name,
                HOURLY,
                ctx.statuses.clone(),
                ctx.last_error.clone(),
                move || {
                    let mailer = mailer.clone();
                    let pool = pool.clone();
                    async move {
                        let window = DateWindow::trailing_days(EVENT_WINDOW_DAYS);
                        match resource {
                            "segments" => {
                                let listing = mailer.fetch_segments().await?;
                                sync::flat::sync_flat(&pool, listing).await?;
                            }
                            "reports" => {
                                let listing = mailer.fetch_reports(&window).await?;
                                sync::flat::sync_flat(&pool, listing).await?;
                            }
                            "sends" => {
                                let listing = mailer.fetch_sends(&window).await?;
                                sync::flat::sync_flat(&pool, listing).await?;
                            }
                            "opens" => {
                                let listing = mailer.fetch_opens(&window).await?;
                                sync::flat::sync_flat(&pool, listing).await?;
                            }
                            "clickthroughs" => {
                                let listing = mailer.fetch_clickthroughs(&window).await?;
                                sync::flat::sync_flat(&pool, listing).await?;
                            }
                            _ => {
                                let listing = mailer.fetch_mailing_approvals().await?;
                                sync::flat::sync_flat(&pool, listing).await?;
                            }
                        }
                        touch_watermark(&pool, resource).await
                    }
                },
            )?;
        }
    } else {
        warn!("Mailer not configured, email-marketing sync jobs disabled");
    }

    if let Some(messaging) = ctx.messaging.clone() {
        let pool = ctx.pool.clone();
        let client = messaging.clone();
        spawn_job(
            "sync-conversations",
            HOURLY,
            ctx.statuses.clone(),
            ctx.last_error.clone(),
            move || {
                let client = client.clone();
                let pool = pool.clone();
                async move {
                    sync::conversations::sync_conversations(
                        &pool,
                        &client,
                        CONVERSATION_BATCH,
                        CONVERSATION_PAGE_SIZE,
                    )
                    .await?;
                    touch_watermark(&pool, "conversations").await
                }
            },
        )?;

        let pool = ctx.pool.clone();
        spawn_job(
            "sync-conversations-full",
            WEEKLY,
            ctx.statuses.clone(),
            ctx.last_error.clone(),
            move || {
                let client = messaging.clone();
                let pool = pool.clone();
                async move {
                    sync::conversations::sync_conversations(
                        &pool,
                        &client,
                        CONVERSATION_FULL_BATCH,
                        CONVERSATION_PAGE_SIZE,
                    )
                    .await?;
                    touch_watermark(&pool, "conversations_full").await
                }
            },
        )?;
    } else {
        warn!("Messaging not configured, conversation sync jobs disabled");
    }

    if let Some(pim) = ctx.pim.clone() {
        let pool = ctx.pool.clone();
        spawn_job(
            "sync-products",
            DAILY_PRODUCTS,
            ctx.statuses.clone(),
            ctx.last_error.clone(),
            move || {
                let pim = pim.clone();
                let pool = pool.clone();
                async move {
                    let sheet = pim.fetch_product_sheet().await?;
                    sync::products::import_products(&pool, &sheet.headers, &sheet.rows).await?;
                    touch_watermark(&pool, "products").await
                }
            },
        )?;
    } else {
        warn!("PIM not configured, product sync job disabled");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_cron_expressions_parse() {
        for expr in [HOURLY, DAILY, DAILY_PRODUCTS, WEEKLY] {
            let cron = Cron::new(expr).parse().unwrap();
            assert!(cron.find_next_occurrence(&Utc::now(), false).is_ok());
        }
    }

    #[test]
    fn hourly_next_occurrence_is_within_an_hour() {
        let cron = Cron::new(HOURLY).parse().unwrap();
        let now = Utc::now();
        let next = cron.find_next_occurrence(&now, false).unwrap();
        assert!(next > now);
        assert!(next - now <= chrono::Duration::hours(1));
    }

    #[tokio::test]
    async fn failed_outcome_lands_in_status_map_and_last_error() {
        let statuses: JobStatusMap = Arc::new(RwLock::new(HashMap::new()));
        let last_error: LastError = Arc::new(RwLock::new(None));

        record_outcome(
            "sync-segments",
            &statuses,
            &last_error,
            Err(anyhow::anyhow!("vendor returned 503")),
        )
        .await;

        let map = statuses.read().await;
        let status = map.get("sync-segments").unwrap();
        assert!(!status.success);
        assert!(status.error.as_deref().unwrap().contains("503"));
        assert!(last_error.read().await.as_deref().unwrap().contains("sync-segments"));
    }
}
