//! End-to-end flat-resource sync against a fixture vendor API

use databridge::services::mailer_client::MailerClient;
use databridge::sync::flat::sync_flat;
use databridge_common::config::MailerConfig;
use databridge_common::db::init_memory_database;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mailer_config(base_url: &str) -> MailerConfig {
    MailerConfig {
        base_url: Some(base_url.to_string()),
        api_key: Some("test-key".to_string()),
    }
}

#[tokio::test]
async fn segment_sync_is_idempotent_against_fixture() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/segments"))
        .and(header("x-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "SegmentID": 42, "Name": "VIP", "MemberCount": 10 }
        ])))
        .mount(&server)
        .await;

    let pool = init_memory_database().await.unwrap();
    let client = MailerClient::new(&mailer_config(&server.uri())).unwrap();

    // First run inserts the one segment
    let listing = client.fetch_segments().await.unwrap();
    let first = sync_flat(&pool, listing).await.unwrap();
    assert_eq!(first.fetched, 1);
    assert_eq!(first.inserted, 1);

    // Identical re-run inserts nothing
    let listing = client.fetch_segments().await.unwrap();
    let second = sync_flat(&pool, listing).await.unwrap();
    assert_eq!(second.fetched, 1);
    assert_eq!(second.inserted, 0);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM segments WHERE segment_id = 42")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn vendor_failure_propagates_to_the_caller() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/segments"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = MailerClient::new(&mailer_config(&server.uri())).unwrap();
    assert!(client.fetch_segments().await.is_err());
}
