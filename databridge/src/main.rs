//! DataBridge - data-integration backend
//!
//! Pulls data from the configured vendor APIs on recurring schedules,
//! persists normalized records into SQLite and serves them over a JSON
//! web API.

use anyhow::Result;
use clap::Parser;
use databridge::jobs::{self, JobContext};
use databridge::services::mailer_client::MailerClient;
use databridge::services::messaging_client::MessagingClient;
use databridge::services::pim_client::{PimAuthenticator, PimClient};
use databridge::services::token_service::TokenService;
use databridge::AppState;
use databridge_common::config::AppConfig;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "databridge", version, about = "Data-integration backend")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    info!("Starting DataBridge");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load(cli.config.as_deref())?;

    let db_path = config.database_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    info!("Database: {}", db_path.display());
    let db_pool = databridge_common::db::init_database(&db_path).await?;

    let state = AppState::new(db_pool.clone());

    // Vendor clients: an unconfigured integration is disabled, not fatal
    let mailer = match MailerClient::new(&config.mailer) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            warn!("Mailer integration disabled: {}", e);
            None
        }
    };

    let messaging = match MessagingClient::new(&config.messaging) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            warn!("Messaging integration disabled: {}", e);
            None
        }
    };

    let (tokens, pim) = match PimAuthenticator::new(&config.pim) {
        Ok(authenticator) => {
            let tokens = TokenService::spawn(authenticator);
            match PimClient::new(&config.pim, tokens.clone()) {
                Ok(client) => (Some(tokens), Some(Arc::new(client))),
                Err(e) => {
                    warn!("PIM integration disabled: {}", e);
                    (Some(tokens), None)
                }
            }
        }
        Err(e) => {
            warn!("PIM integration disabled: {}", e);
            (None, None)
        }
    };

    jobs::start_jobs(JobContext {
        pool: db_pool,
        mailer,
        messaging,
        pim,
        tokens,
        statuses: state.job_statuses.clone(),
        last_error: state.last_error.clone(),
    })?;

    let app = databridge::build_router(state);
    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
