//! Conversation reconciliation driven over a fixture messaging API

use databridge::db;
use databridge::services::messaging_client::MessagingClient;
use databridge::sync::conversations::sync_conversations;
use databridge_common::config::MessagingConfig;
use databridge_common::db::init_memory_database;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ACCOUNT_ID: &str = "12345";
const SEARCH_PATH: &str = "/messaging_history/api/account/12345/conversations/search";

fn messaging_config() -> MessagingConfig {
    MessagingConfig {
        account_id: Some(ACCOUNT_ID.to_string()),
        discovery_url: Some("https://unused.example.com".to_string()),
        consumer_key: Some("ck".to_string()),
        consumer_secret: Some("cs".to_string()),
        access_token: Some("at".to_string()),
        token_secret: Some("ts".to_string()),
    }
}

fn history_page(conversation_ids: &[&str]) -> Value {
    let records: Vec<Value> = conversation_ids
        .iter()
        .map(|id| {
            json!({
                "info": {
                    "conversationId": id,
                    "status": "CLOSE",
                    "startTimeL": 1_700_000_000_000i64
                },
                "messageRecords": [{
                    "messageId": format!("{}-m1", id),
                    "sentBy": "Consumer",
                    "messageData": { "msg": { "text": "hello" } }
                }]
            })
        })
        .collect();
    json!({ "conversationHistoryRecords": records })
}

fn empty_page() -> Value {
    json!({ "conversationHistoryRecords": [] })
}

#[tokio::test]
async fn sync_stops_on_first_empty_page() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(history_page(&["c-1", "c-2"])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(query_param("offset", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_page()))
        .mount(&server)
        .await;

    let pool = init_memory_database().await.unwrap();
    let client = MessagingClient::with_base_url(&messaging_config(), server.uri()).unwrap();

    let outcome = sync_conversations(&pool, &client, 20_000, 100).await.unwrap();
    assert_eq!(outcome.pages, 1);
    assert_eq!(outcome.fetched, 2);

    assert_eq!(db::conversations::count(&pool).await.unwrap(), 2);
    assert_eq!(db::messages::count(&pool).await.unwrap(), 2);
}

#[tokio::test]
async fn sync_stops_at_the_record_cap() {
    let server = MockServer::start().await;
    // Pages exist only for offsets 0 and 1; hitting offset 2 would 404 and
    // fail the run, so reaching the assertions proves the cap stopped it.
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(history_page(&["c-1"])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(query_param("offset", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(history_page(&["c-2"])))
        .mount(&server)
        .await;

    let pool = init_memory_database().await.unwrap();
    let client = MessagingClient::with_base_url(&messaging_config(), server.uri()).unwrap();

    let outcome = sync_conversations(&pool, &client, 2, 1).await.unwrap();
    assert_eq!(outcome.pages, 2);
    assert_eq!(outcome.fetched, 2);
}

#[tokio::test]
async fn refetching_the_same_page_updates_instead_of_duplicating() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(history_page(&["c-1"])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(query_param("offset", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_page()))
        .mount(&server)
        .await;

    let pool = init_memory_database().await.unwrap();
    let client = MessagingClient::with_base_url(&messaging_config(), server.uri()).unwrap();

    let first = sync_conversations(&pool, &client, 20_000, 100).await.unwrap();
    assert!(first.inserted > 0);
    assert_eq!(first.updated, 0);

    let second = sync_conversations(&pool, &client, 20_000, 100).await.unwrap();
    assert_eq!(second.inserted, 0);
    assert!(second.updated > 0);

    assert_eq!(db::conversations::count(&pool).await.unwrap(), 1);
    assert_eq!(db::messages::count(&pool).await.unwrap(), 1);
}

#[tokio::test]
async fn vendor_error_fails_the_run() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let pool = init_memory_database().await.unwrap();
    let client = MessagingClient::with_base_url(&messaging_config(), server.uri()).unwrap();

    assert!(sync_conversations(&pool, &client, 200, 100).await.is_err());
}
