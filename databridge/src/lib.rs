//! DataBridge library interface
//!
//! Exposes the sync engines, vendor clients and web API for integration
//! testing.

pub mod api;
pub mod db;
pub mod error;
pub mod jobs;
pub mod models;
pub mod services;
pub mod sync;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use jobs::{JobStatusMap, LastError};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last recorded outcome per sync job
    pub job_statuses: JobStatusMap,
    /// Most recent job error for diagnostics
    pub last_error: LastError,
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            startup_time: Utc::now(),
            job_statuses: Arc::new(RwLock::new(HashMap::new())),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::entity_routes())
        .merge(api::health_routes())
        .with_state(state)
}
