//! Integration tests for the handoff REST API.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use api_rest::{router, AppState};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use handoff_core::{
    AccessCode, CodeGenerator, CoreConfig, FileReference, FsStore, MemoryStore,
    RandomCodeGenerator, ReferenceStore, StoreError, StoreResult,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

// ============================================================================
// Test Types and Helpers
// ============================================================================

struct FixedCodes(Mutex<VecDeque<u32>>);

impl FixedCodes {
    fn new(codes: &[u32]) -> Self {
        Self(Mutex::new(codes.iter().copied().collect()))
    }
}

impl CodeGenerator for FixedCodes {
    fn generate(&self) -> AccessCode {
        let value = self.0.lock().unwrap().pop_front().expect("out of codes");
        AccessCode::new(value, 6).unwrap()
    }
}

/// Every operation fails as if the backing database were down.
struct BrokenStore;

#[async_trait]
impl ReferenceStore for BrokenStore {
    async fn put(&self, _reference: &FileReference) -> StoreResult<()> {
        Err(StoreError::Unavailable("connection refused to db:5432".into()))
    }

    async fn get(&self, _code: &AccessCode) -> StoreResult<Option<FileReference>> {
        Err(StoreError::Unavailable("connection refused to db:5432".into()))
    }

    async fn take(&self, _code: &AccessCode) -> StoreResult<Option<FileReference>> {
        Err(StoreError::Unavailable("connection refused to db:5432".into()))
    }

    async fn delete(&self, _code: &AccessCode) -> StoreResult<bool> {
        Err(StoreError::Unavailable("connection refused to db:5432".into()))
    }

    async fn purge_expired(&self, _now: DateTime<Utc>) -> StoreResult<usize> {
        Err(StoreError::Unavailable("connection refused to db:5432".into()))
    }

    async fn health_check(&self) -> StoreResult<()> {
        Err(StoreError::Unavailable("connection refused to db:5432".into()))
    }
}

fn config(max_attempts: u32, burn_on_read: bool) -> Arc<CoreConfig> {
    Arc::new(
        CoreConfig::new(6, max_attempts, burn_on_read, None, Duration::from_secs(1)).unwrap(),
    )
}

fn create_test_app(store: Arc<dyn ReferenceStore>, codes: &[u32]) -> Router {
    router(AppState::new(
        config(5, false),
        store,
        Arc::new(FixedCodes::new(codes)),
    ))
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

// ============================================================================
// Health Endpoint Tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app(Arc::new(MemoryStore::new()), &[]);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["ok"], true);
}

#[tokio::test]
async fn test_health_reports_broken_store() {
    let app = create_test_app(Arc::new(BrokenStore), &[]);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_openapi_document_lists_operations() {
    let app = create_test_app(Arc::new(MemoryStore::new()), &[]);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["paths"]["/api/storefile"].is_object());
    assert!(json["paths"]["/api/validate"].is_object());
}

// ============================================================================
// Register / Validate Tests
// ============================================================================

#[tokio::test]
async fn test_register_then_validate() {
    let store: Arc<dyn ReferenceStore> = Arc::new(MemoryStore::new());
    let app = create_test_app(store, &[4821]);

    let (status, json) = post_json(
        app.clone(),
        "/api/storefile",
        json!({"fileData": "blob://bucket/a.pdf", "fileName": "a.pdf"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"error": false, "code": "004821"}));

    let (status, json) = post_json(app, "/api/validate", json!({"enteredCode": "004821"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!({"error": false, "file": {"url": "blob://bucket/a.pdf", "name": "a.pdf"}})
    );
}

#[tokio::test]
async fn test_validate_unknown_code_is_not_found() {
    let app = create_test_app(Arc::new(MemoryStore::new()), &[]);

    let (status, json) = post_json(app, "/api/validate", json!({"submittedCode": "999999"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], true);
    assert!(json.get("file").is_none());
    assert!(json["message"].is_string());
}

#[tokio::test]
async fn test_validate_short_code_is_invalid_format() {
    let app = create_test_app(Arc::new(MemoryStore::new()), &[]);

    let (status, json) = post_json(app, "/api/validate", json!({"submittedCode": "42"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], true);
    assert_eq!(json["message"], "Code should be 6 digits");
}

#[tokio::test]
async fn test_validate_non_digit_code_is_invalid_format() {
    let app = create_test_app(Arc::new(MemoryStore::new()), &[]);

    let (status, json) = post_json(app, "/api/validate", json!({"submittedCode": "12a456"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Only numbers allowed");
}

#[tokio::test]
async fn test_register_rejects_blank_name() {
    let app = create_test_app(Arc::new(MemoryStore::new()), &[1]);

    let (status, json) = post_json(
        app,
        "/api/storefile",
        json!({"locationPointer": "blob://bucket/a.pdf", "displayName": "  "}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], true);
    assert!(json.get("code").is_none());
}

#[tokio::test]
async fn test_malformed_body_gets_error_envelope() {
    let app = create_test_app(Arc::new(MemoryStore::new()), &[1]);

    let (status, json) = post_json(app, "/api/storefile", json!({"fileName": "a.pdf"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], true);
}

#[tokio::test]
async fn test_register_exhausted_retries() {
    let store = Arc::new(MemoryStore::new());
    for value in [1, 2, 3, 4, 5] {
        store
            .put(&FileReference {
                code: AccessCode::new(value, 6).unwrap(),
                location_pointer: format!("blob://taken/{value}"),
                display_name: "taken".into(),
                created_at: Utc::now(),
                expires_at: None,
            })
            .await
            .unwrap();
    }
    let app = create_test_app(store, &[1, 2, 3, 4, 5, 6]);

    let (status, json) = post_json(
        app,
        "/api/storefile",
        json!({"fileData": "blob://bucket/new", "fileName": "new"}),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], true);
}

#[tokio::test]
async fn test_broken_store_is_unavailable_not_not_found() {
    let app = create_test_app(Arc::new(BrokenStore), &[1]);

    let (status, json) =
        post_json(app.clone(), "/api/validate", json!({"submittedCode": "004821"})).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"], true);
    assert!(!json["message"].as_str().unwrap().contains("5432"));

    let (status, json) = post_json(
        app,
        "/api/storefile",
        json!({"fileData": "blob://bucket/a.pdf", "fileName": "a.pdf"}),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(json.get("code").is_none());
}

#[tokio::test]
async fn test_burn_on_read_over_http() {
    let store: Arc<dyn ReferenceStore> = Arc::new(MemoryStore::new());
    let app = router(AppState::new(
        config(5, true),
        store,
        Arc::new(FixedCodes::new(&[321])),
    ));

    let (status, _) = post_json(
        app.clone(),
        "/api/storefile",
        json!({"fileData": "blob://bucket/once", "fileName": "once"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (first, _) =
        post_json(app.clone(), "/api/validate", json!({"submittedCode": "000321"})).await;
    let (second, _) = post_json(app, "/api/validate", json!({"submittedCode": "000321"})).await;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_filesystem_store_end_to_end() {
    let temp = TempDir::new().unwrap();
    let store: Arc<dyn ReferenceStore> = Arc::new(FsStore::open(temp.path()).await.unwrap());
    let app = router(AppState::new(
        config(5, false),
        store,
        Arc::new(RandomCodeGenerator::new(6).unwrap()),
    ));

    let (status, json) = post_json(
        app.clone(),
        "/api/storefile",
        json!({
            "locationPointer": "https://storage.example.com/file-upload/report.pdf",
            "displayName": "report.pdf"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let code = json["code"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 6);

    let (status, json) = post_json(app, "/api/validate", json!({"submittedCode": code})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["file"]["name"], "report.pdf");
}
