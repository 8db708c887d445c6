use super::*;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, put},
    Json, Router,
};
use serde_json::json;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct ServerState {
    seen: Arc<Mutex<Vec<String>>>,
}

async fn list_categories(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Json<Value> {
    let auth = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state
        .seen
        .lock()
        .await
        .push(format!("GET page={} limit={} auth={auth}", query.page, query.limit));
    Json(json!({ "data": { "data": [{ "id": 1, "name": "Books" }], "total": 11 } }))
}

async fn create_category(
    State(state): State<ServerState>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.seen.lock().await.push(format!("POST {payload}"));
    if payload["name"] == "taken" {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "code": "conflict", "message": "category name already exists" })),
        );
    }
    (StatusCode::CREATED, Json(json!({ "id": 2, "name": payload["name"] })))
}

async fn update_category(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<Value>,
) -> Json<Value> {
    state.seen.lock().await.push(format!("PUT {id} {payload}"));
    Json(json!({ "id": id, "name": payload["name"] }))
}

async fn delete_category(State(state): State<ServerState>, Path(id): Path<i64>) -> StatusCode {
    state.seen.lock().await.push(format!("DELETE {id}"));
    if id == 404 {
        return StatusCode::NOT_FOUND;
    }
    StatusCode::NO_CONTENT
}

async fn spawn_collection_server() -> (String, ServerState) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state = ServerState::default();
    let app = Router::new()
        .route("/api/categories", get(list_categories).post(create_category))
        .route(
            "/api/categories/:id",
            put(update_category).delete(delete_category),
        )
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}/api"), state)
}

fn categories_api(base_url: &str) -> HttpCollectionApi {
    let client = ApiClient::new(base_url, DEFAULT_REQUEST_TIMEOUT)
        .expect("client")
        .with_bearer_token("secret");
    HttpCollectionApi::new(client, ResourceKind::Categories)
}

#[tokio::test]
async fn list_sends_page_query_and_bearer_token() {
    let (base_url, state) = spawn_collection_server().await;
    let api = categories_api(&base_url);

    let body = api
        .list(PageQuery { page: 2, limit: 10 })
        .await
        .expect("list");

    assert_eq!(body["data"]["total"], 11);
    assert_eq!(
        state.seen.lock().await.as_slice(),
        ["GET page=2 limit=10 auth=Bearer secret"]
    );
}

#[tokio::test]
async fn create_and_update_send_json_payloads() {
    let (base_url, state) = spawn_collection_server().await;
    let api = categories_api(&format!("{base_url}/"));

    let created = api
        .create(json!({ "name": "Games" }))
        .await
        .expect("create");
    assert_eq!(created["id"], 2);

    api.update(RecordId(2), json!({ "name": "Board games" }))
        .await
        .expect("update");

    let seen = state.seen.lock().await.clone();
    assert_eq!(seen[0], r#"POST {"name":"Games"}"#);
    assert_eq!(seen[1], r#"PUT 2 {"name":"Board games"}"#);
}

#[tokio::test]
async fn error_envelope_message_is_extracted() {
    let (base_url, _state) = spawn_collection_server().await;
    let api = categories_api(&base_url);

    let failure = api
        .create(json!({ "name": "taken" }))
        .await
        .expect_err("conflict");
    assert_eq!(failure.status, Some(422));
    assert_eq!(failure.user_message(), "category name already exists");
}

#[tokio::test]
async fn error_without_body_falls_back_to_status_text() {
    let (base_url, _state) = spawn_collection_server().await;
    let api = categories_api(&base_url);

    let failure = api.delete(RecordId(404)).await.expect_err("not found");
    assert_eq!(failure.message, None);
    assert_eq!(failure.user_message(), "request failed with status code 404");
}

#[tokio::test]
async fn empty_success_body_reads_as_null() {
    let (base_url, state) = spawn_collection_server().await;
    let api = categories_api(&base_url);

    let body = api.delete(RecordId(9)).await.expect("delete");
    assert_eq!(body, Value::Null);
    assert_eq!(state.seen.lock().await.as_slice(), ["DELETE 9"]);
}

#[tokio::test]
async fn unreachable_server_is_a_transport_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let api = categories_api(&format!("http://{addr}"));
    let failure = api
        .list(PageQuery { page: 1, limit: 10 })
        .await
        .expect_err("connection refused");
    assert_eq!(failure.status, None);
    assert!(!failure.user_message().is_empty());
}

#[test]
fn rejects_non_http_base_urls() {
    assert!(matches!(
        ApiClient::new("ftp://example.com", DEFAULT_REQUEST_TIMEOUT),
        Err(ClientSetupError::UnsupportedBaseUrl(_))
    ));
    assert!(matches!(
        ApiClient::new("not a url", DEFAULT_REQUEST_TIMEOUT),
        Err(ClientSetupError::InvalidBaseUrl(_))
    ));
}

#[test]
fn record_urls_nest_under_base_path() {
    let client = ApiClient::new("https://shop.example.com/api/v1/", DEFAULT_REQUEST_TIMEOUT)
        .expect("client");
    let url = client.endpoint(&["users", "42"]).expect("url");
    assert_eq!(url.as_str(), "https://shop.example.com/api/v1/users/42");
}
