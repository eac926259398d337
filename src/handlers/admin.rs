//! # Admin API Handlers
//!
//! Admin login against the configured credentials, and ledger analytics.

use axum::{extract::State, response::Json};
use subtle::ConstantTimeEq;

use super::types::{ApiJson, RequiredFields};
use super::vendors::{LoginRequest, TokenResponse, invalid_credentials, token_response};
use crate::auth::Role;
use crate::db::bounded;
use crate::error::ApiError;
use crate::password::verify_password_blocking;
use crate::repositories::{AnalyticsRepository, AnalyticsSummary, normalize_email};
use crate::server::AppState;

/// Exchange admin credentials for an access token
#[utoipa::path(
    post,
    path = "/api/admin/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Missing fields", body = ApiError),
        (status = 401, description = "Invalid credentials or admin login disabled", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let mut fields = RequiredFields::new();
    let email = fields.text("email", request.email);
    let password = fields.value("password", request.password.filter(|p| !p.is_empty()));
    fields.check()?;

    let (Some(admin_email), Some(admin_hash)) = (
        state.config.admin_email.as_deref(),
        state.config.admin_password_hash.as_deref(),
    ) else {
        tracing::warn!("Admin login attempted but no admin credentials are configured");
        return Err(invalid_credentials());
    };

    let email = normalize_email(&email);
    let email_matches: bool = email.as_bytes().ct_eq(admin_email.as_bytes()).into();
    let password_matches = verify_password_blocking(password, admin_hash.to_string()).await?;

    if !(email_matches && password_matches) {
        tracing::info!("Admin login rejected");
        return Err(invalid_credentials());
    }

    token_response(&state, admin_email, Role::Admin)
}

/// Ledger-wide metrics
#[utoipa::path(
    get,
    path = "/api/admin/analytics",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Aggregated metrics", body = AnalyticsSummary),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 403, description = "Not an admin token", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn analytics(State(state): State<AppState>) -> Result<Json<AnalyticsSummary>, ApiError> {
    let repo = AnalyticsRepository::new(&state.db);
    let summary = bounded(
        state.store_timeout(),
        repo.summary(state.config.top_vendors_limit),
    )
    .await?;
    Ok(Json(summary))
}
