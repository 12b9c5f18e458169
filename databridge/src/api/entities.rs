//! Versioned read endpoints over the persisted entities

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{Campaign, Conversation, Message, Product, Report, Segment};
use crate::sync::products::ProductImportReport;
use crate::AppState;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

/// Common limit/offset pagination query
#[derive(Debug, Deserialize)]
pub struct Page {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Page {
    fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// GET /api/v1/conversations
async fn list_conversations(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Vec<Conversation>>> {
    let conversations = db::conversations::list(&state.db, page.limit(), page.offset()).await?;
    Ok(Json(conversations))
}

/// GET /api/v1/conversations/:id
async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Conversation>> {
    let conversation = db::conversations::load_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("conversation {}", id)))?;
    Ok(Json(conversation))
}

/// GET /api/v1/conversations/:id/messages
async fn list_conversation_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Message>>> {
    let messages = db::messages::list_by_conversation(&state.db, &id).await?;
    Ok(Json(messages))
}

/// GET /api/v1/campaigns
async fn list_campaigns(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Vec<Campaign>>> {
    let campaigns = db::campaigns::list(&state.db, page.limit(), page.offset()).await?;
    Ok(Json(campaigns))
}

/// GET /api/v1/segments
async fn list_segments(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Vec<Segment>>> {
    let segments = db::resources::list_segments(&state.db, page.limit(), page.offset()).await?;
    Ok(Json(segments))
}

/// GET /api/v1/reports
async fn list_reports(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Vec<Report>>> {
    let reports = db::resources::list_reports(&state.db, page.limit(), page.offset()).await?;
    Ok(Json(reports))
}

/// GET /api/v1/products
async fn list_products(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Vec<Product>>> {
    let products = db::products::list(&state.db, page.limit(), page.offset()).await?;
    Ok(Json(products))
}

/// GET /api/v1/products/:article_id
async fn get_product(
    State(state): State<AppState>,
    Path(article_id): Path<i64>,
) -> ApiResult<Json<Product>> {
    let product = db::products::load_by_article_id(&state.db, article_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("product {}", article_id)))?;
    Ok(Json(product))
}

/// Spreadsheet-shaped product import body
#[derive(Debug, Deserialize)]
pub struct ProductImportBody {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// POST /api/v1/products/import
async fn import_products(
    State(state): State<AppState>,
    Json(body): Json<ProductImportBody>,
) -> ApiResult<Json<ProductImportReport>> {
    if body.headers.is_empty() {
        return Err(ApiError::BadRequest("headers must not be empty".into()));
    }

    let report =
        crate::sync::products::import_products(&state.db, &body.headers, &body.rows).await?;
    Ok(Json(report))
}

/// Build entity routes under /api/v1
pub fn entity_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/conversations", get(list_conversations))
        .route("/api/v1/conversations/:id", get(get_conversation))
        .route(
            "/api/v1/conversations/:id/messages",
            get(list_conversation_messages),
        )
        .route("/api/v1/campaigns", get(list_campaigns))
        .route("/api/v1/segments", get(list_segments))
        .route("/api/v1/reports", get(list_reports))
        .route("/api/v1/products", get(list_products))
        .route("/api/v1/products/:article_id", get(get_product))
        .route("/api/v1/products/import", post(import_products))
}
