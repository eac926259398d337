//! # API Handlers
//!
//! HTTP endpoint handlers. Store calls are wrapped in [`crate::db::bounded`]
//! so a stalled database surfaces as a retryable 503.

use axum::{extract::State, http::StatusCode, response::Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::db;
use crate::error::ApiError;
use crate::models::ServiceInfo;
use crate::server::AppState;

pub mod admin;
pub mod catalog;
pub mod orders;
pub mod types;
pub mod vendors;
pub mod withdrawals;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Liveness/readiness probe result
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthStatus {
    #[schema(example = "ok")]
    pub status: String,
}

/// Reports whether the database answers
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Service and database are healthy", body = HealthStatus),
        (status = 503, description = "Database unreachable", body = ApiError)
    ),
    tag = "root"
)]
pub async fn healthz(State(state): State<AppState>) -> Result<Json<HealthStatus>, ApiError> {
    match tokio::time::timeout(state.store_timeout(), db::health_check(&state.db)).await {
        Ok(Ok(())) => Ok(Json(HealthStatus {
            status: "ok".to_string(),
        })),
        Ok(Err(err)) => {
            tracing::error!(error = %err, "Health check failed");
            Err(unavailable())
        }
        Err(_) => {
            tracing::error!("Health check timed out");
            Err(unavailable())
        }
    }
}

fn unavailable() -> ApiError {
    ApiError::new(
        StatusCode::SERVICE_UNAVAILABLE,
        "SERVICE_UNAVAILABLE",
        "Database service unavailable",
    )
    .with_retry_after(1)
}

#[cfg(test)]
mod tests;
