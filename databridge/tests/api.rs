//! Web API endpoint tests

use axum::body::Body;
use axum::http::{Request, StatusCode};
use databridge::models::Conversation;
use databridge::{build_router, AppState};
use databridge_common::db::init_memory_database;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn test_state() -> AppState {
    let pool = init_memory_database().await.unwrap();
    AppState::new(pool)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok_with_no_jobs_recorded() {
    let app = build_router(test_state().await);

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn conversations_list_and_get() {
    let state = test_state().await;

    let conversation = Conversation {
        conversation_id: "c-1".into(),
        campaign_id: None,
        status: Some("CLOSE".into()),
        end_reason: None,
        start_time: None,
        start_time_ms: Some(1_700_000_000_000),
        end_time: None,
        end_time_ms: None,
        device: None,
        browser: None,
        operating_system: None,
        latest_agent_id: None,
        latest_skill_name: None,
        source: None,
    };
    let mut tx = state.db.begin().await.unwrap();
    databridge::db::conversations::insert_conversation(&mut tx, &conversation)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let app = build_router(state);

    let response = app
        .clone()
        .oneshot(
            Request::get("/api/v1/conversations")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["conversation_id"], "c-1");

    let response = app
        .clone()
        .oneshot(
            Request::get("/api/v1/conversations/c-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::get("/api/v1/conversations/missing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn product_import_round_trips_through_the_api() {
    let state = test_state().await;
    let app = build_router(state.clone());

    let import = json!({
        "headers": ["ArticleId", "Name", "TreePath", "Price"],
        "rows": [["1234", "Widget", "/1000/15500", "19.95"]]
    });
    let response = app
        .clone()
        .oneshot(
            Request::post("/api/v1/products/import")
                .header("content-type", "application/json")
                .body(Body::from(import.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["imported"], 1);
    assert_eq!(body["failed"], 0);

    let response = app
        .oneshot(
            Request::get("/api/v1/products/1234")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let product = body_json(response).await;
    assert_eq!(product["name"], "Widget");
    assert_eq!(product["dimensions"][0], 1000);
}

#[tokio::test]
async fn empty_headers_are_rejected() {
    let app = build_router(test_state().await);

    let import = json!({ "headers": [], "rows": [] });
    let response = app
        .oneshot(
            Request::post("/api/v1/products/import")
                .header("content-type", "application/json")
                .body(Body::from(import.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
