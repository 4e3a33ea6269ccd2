//! Router behaviour that never reaches the database. The pool points at a closed port and
//! connects lazily, so only request-shape checks and plumbing are exercised here.

mod support;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use huntreasure::{app, model, resolve, AppState};
use rstest::rstest;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use support::{error_code, get, patch, post};
use tower::ServiceExt;

const UNREACHABLE_DB: &str = "postgres://huntreasure@127.0.0.1:1/huntreasure";

fn router_with_body_limit(limit: Option<usize>) -> Router {
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(300))
        .connect_lazy(UNREACHABLE_DB)
        .expect("lazy pool");
    let mut settings = support::settings(UNREACHABLE_DB, "public");
    if let Some(limit) = limit {
        settings.body_limit = limit;
    }
    let model = resolve(&model::definitions(), &settings.schema).expect("model");
    app(AppState::new(pool, model), &settings)
}

fn router() -> Router {
    router_with_body_limit(None)
}

#[tokio::test]
async fn health_is_ok_without_database() {
    let (status, body) = get(&router(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn version_reports_package() {
    let (status, body) = get(&router(), "/version").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "huntreasure");
}

#[tokio::test]
async fn ready_reports_unavailable_database() {
    let (status, body) = get(&router(), "/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["database"], "unavailable");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let (status, body) = get(&router(), "/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/ranger/create"].is_object());
    assert!(body["paths"]["/ranger/{id}"]["patch"].is_object());
}

#[rstest]
#[case(json!({"ph_number": "010-1111-2222"}))]
#[case(json!({"nickname": "scout"}))]
#[case(json!({"nickname": null, "ph_number": "010-1111-2222"}))]
#[case(json!({"nickname": "a".repeat(31), "ph_number": "010-1111-2222"}))]
#[case(json!({"nickname": "scout", "phone": "0".repeat(21)}))]
#[case(json!({"nickname": 42, "ph_number": "010-1111-2222"}))]
#[tokio::test]
async fn create_rejects_bad_shape(#[case] body: Value) {
    let (status, body) = post(&router(), "/ranger/create", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "validation_error");
}

#[tokio::test]
async fn create_rejects_non_object_body() {
    let (status, body) = post(&router(), "/ranger/create", json!(["scout"])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "bad_request");
}

#[tokio::test]
async fn well_formed_create_reaches_database() {
    let (status, body) = post(
        &router(),
        "/ranger/create",
        json!({"nickname": "scout", "phone": "010-1111-2222", "shoe_size": 9}),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_code(&body), "database_error");
}

#[rstest]
#[case(0, 10, "Page number should be positive")]
#[case(-3, 10, "Page number should be positive")]
#[case(1, 101, "Size should be below 100")]
#[case(1, 0, "Size should be positive")]
#[tokio::test]
async fn page_list_bounds(#[case] page: i64, #[case] size: i64, #[case] message: &str) {
    let (status, body) = post(&router(), "/ranger/page-list", json!({"page": page, "size": size})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "validation_error");
    assert!(body["error"]["message"].as_str().unwrap().contains(message));
}

#[rstest]
#[case(json!({"page": 1}))]
#[case(json!({"size": 10}))]
#[case(json!({"page": "one", "size": 10}))]
#[case(json!({"page": 1, "size": 2.5}))]
#[case(json!("page=1&size=10"))]
#[tokio::test]
async fn page_list_rejects_malformed_request(#[case] body: Value) {
    let (status, body) = post(&router(), "/ranger/page-list", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "validation_error");
}

#[tokio::test]
async fn search_rejects_unknown_field() {
    let (status, body) = post(&router(), "/ranger/search", json!({"nickname": "a", "hat": "red"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "bad_request");
}

#[rstest]
#[case(json!({"hat": "red"}), "bad_request")]
#[case(json!({"create_time": "2024-01-01T00:00:00Z"}), "bad_request")]
#[case(json!({"id": "another"}), "bad_request")]
#[case(json!({"nickname": "a".repeat(31)}), "validation_error")]
#[case(json!({"ph_number": 1.2345678901234568e23}), "validation_error")]
#[tokio::test]
async fn patch_rejects_bad_fields(#[case] body: Value, #[case] code: &str) {
    let (status, body) = patch(&router(), "/ranger/abc", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), code);
}

#[tokio::test]
async fn oversized_body_is_refused() {
    let payload = json!({"nickname": "a".repeat(200), "ph_number": "010"}).to_string();
    let req = Request::builder()
        .method(Method::POST)
        .uri("/ranger/create")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, payload.len())
        .body(Body::from(payload))
        .unwrap();
    let response = router_with_body_limit(Some(64)).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let req = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://hunt.example")
        .body(Body::empty())
        .unwrap();
    let response = router().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "https://hunt.example"
    );
}
