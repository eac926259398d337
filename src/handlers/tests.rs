//! # Tests for Handlers

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::Json,
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use serde_json::Value;
use tower::ServiceExt;
use utoipa::OpenApi;

use crate::config::AppConfig;
use crate::handlers::{healthz, root};
use crate::models::ServiceInfo;
use crate::server::{ApiDoc, AppState, create_app};
use crate::telemetry::TRACE_ID_HEADER;

fn test_config() -> AppConfig {
    AppConfig {
        jwt_secret: "handler-tests-secret-0123456789abcdef".to_string(),
        ..AppConfig::default()
    }
}

async fn migrated_state() -> AppState {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    AppState::new(test_config(), db)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_root_handler_returns_expected_service_info() {
    let Json(service_info) = root().await;

    assert_eq!(service_info.service, "databundle");
    assert_eq!(service_info.version, env!("CARGO_PKG_VERSION"));
}

#[test]
fn test_service_info_serializes_both_fields() {
    let json_value = serde_json::to_value(ServiceInfo::default()).unwrap();

    assert_eq!(json_value["service"], "databundle");
    assert!(json_value.get("version").is_some());
}

#[tokio::test]
async fn test_healthz_reports_ok_with_database() {
    let state = migrated_state().await;

    let Json(status) = healthz(State(state)).await.unwrap();
    assert_eq!(status.status, "ok");
}

#[tokio::test]
async fn test_healthz_unavailable_without_database() {
    let state = AppState::new(test_config(), DatabaseConnection::default());

    let err = healthz(State(state)).await.unwrap_err();
    assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(err.retry_after, Some(1));
}

#[tokio::test]
async fn test_every_response_carries_trace_id() {
    let app = create_app(migrated_state().await);

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(&TRACE_ID_HEADER));
}

#[tokio::test]
async fn test_error_body_trace_id_matches_header() {
    let app = create_app(migrated_state().await);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/orders")
                .header(&TRACE_ID_HEADER, "client-trace-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[&TRACE_ID_HEADER], "client-trace-42");
    let body = body_json(response).await;
    assert_eq!(body["trace_id"], "client-trace-42");
    assert_eq!(body["code"], "MISSING_TOKEN");
}

#[tokio::test]
async fn test_malformed_json_is_a_validation_error() {
    let app = create_app(migrated_state().await);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/orders")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_unknown_vendor_login_still_runs_password_verification() {
    let app = create_app(migrated_state().await);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/vendors/login")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"email":"nobody@example.com","password":"whatever-123"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], "INVALID_CREDENTIALS");
    assert!(
        crate::password::ABSENT_ACCOUNT_HASH
            .get()
            .is_some_and(Option::is_some)
    );
}

#[test]
fn test_openapi_documents_guarded_routes() {
    let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();

    for path in [
        "/api/vendors/register",
        "/api/orders/status/{id}",
        "/api/admin/withdrawals/{id}/approve",
        "/api/admin/networks/{id}",
        "/api/admin/analytics",
    ] {
        assert!(doc["paths"].get(path).is_some(), "missing {path}");
    }
    assert!(doc["components"]["securitySchemes"]["bearer_auth"].is_object());
}
