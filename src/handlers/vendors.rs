//! # Vendor API Handlers
//!
//! Registration, login and vendor self-service endpoints.

use axum::{extract::State, http::StatusCode, response::Json};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::types::{ApiJson, MessageResponse, RequiredFields, field_error, validate_phone_number};
use crate::auth::{Role, VendorIdentity};
use crate::db::bounded;
use crate::error::{ApiError, unauthorized, validation_error};
use crate::models::vendor::Model as VendorModel;
use crate::password::{
    hash_password_blocking, verify_absent_account_blocking, verify_password_blocking,
};
use crate::repositories::{AnalyticsRepository, NewVendor, VendorDashboard, VendorRepository};
use crate::server::AppState;

pub(crate) const MIN_PASSWORD_CHARS: usize = 8;

/// Registration payload. All fields are required.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterVendorRequest {
    #[serde(alias = "full_name")]
    #[schema(example = "Ama Mensah")]
    pub full_name: Option<String>,
    #[schema(example = "ama@example.com")]
    pub email: Option<String>,
    /// At least 8 characters
    pub password: Option<String>,
    #[serde(alias = "phone_number")]
    #[schema(example = "+233241234567")]
    pub phone_number: Option<String>,
    /// Mobile-money number that receives payouts
    #[serde(alias = "momo_number")]
    #[schema(example = "0241234567")]
    pub momo_number: Option<String>,
}

/// Public view of a vendor account
#[derive(Debug, Serialize, ToSchema)]
pub struct VendorResponse {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub momo_number: String,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<FixedOffset>,
}

impl From<VendorModel> for VendorResponse {
    fn from(vendor: VendorModel) -> Self {
        Self {
            id: vendor.id,
            full_name: vendor.full_name,
            email: vendor.email,
            phone_number: vendor.phone_number,
            momo_number: vendor.momo_number,
            created_at: vendor.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterVendorResponse {
    #[schema(example = "Vendor registered successfully")]
    pub message: String,
    pub vendor: VendorResponse,
}

/// Credentials for vendor or admin login
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Issued access token
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Seconds until the token expires
    pub expires_in: i64,
    pub role: Role,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(alias = "current_password")]
    pub current_password: Option<String>,
    #[serde(alias = "new_password")]
    pub new_password: Option<String>,
}

pub(crate) fn invalid_credentials() -> ApiError {
    unauthorized("INVALID_CREDENTIALS", "Invalid credentials")
}

pub(crate) fn token_response(
    state: &AppState,
    subject: &str,
    role: Role,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = state.tokens.issue(subject, role)?;
    Ok(Json(TokenResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.tokens.ttl_seconds(),
        role,
    }))
}

fn check_password_length(field: &str, password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(validation_error(
            "Password too short",
            field_error(field, "Must be at least 8 characters"),
        ));
    }
    Ok(())
}

/// Register a vendor account
#[utoipa::path(
    post,
    path = "/api/vendors/register",
    request_body = RegisterVendorRequest,
    responses(
        (status = 201, description = "Vendor registered", body = RegisterVendorResponse),
        (status = 400, description = "Missing or invalid fields", body = ApiError),
        (status = 409, description = "Email already registered", body = ApiError),
        (status = 503, description = "Store unavailable", body = ApiError)
    ),
    tag = "vendors"
)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterVendorRequest>,
) -> Result<(StatusCode, Json<RegisterVendorResponse>), ApiError> {
    let mut fields = RequiredFields::new();
    let full_name = fields.text("fullName", request.full_name);
    let email = fields.text("email", request.email);
    // Passwords are not trimmed
    let password = fields.value("password", request.password.filter(|p| !p.is_empty()));
    let phone_number = fields.text("phoneNumber", request.phone_number);
    let momo_number = fields.text("momoNumber", request.momo_number);
    fields.check()?;

    if !email.contains('@') {
        return Err(validation_error(
            "Invalid email address",
            field_error("email", "Must contain '@'"),
        ));
    }
    check_password_length("password", &password)?;
    validate_phone_number("phoneNumber", &phone_number)?;
    validate_phone_number("momoNumber", &momo_number)?;

    let password_hash = hash_password_blocking(password).await?;

    let repo = VendorRepository::new(&state.db);
    let vendor = bounded(
        state.store_timeout(),
        repo.create(NewVendor {
            full_name,
            email,
            password_hash,
            phone_number,
            momo_number,
        }),
    )
    .await?;

    tracing::info!(vendor_id = %vendor.id, "Vendor registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterVendorResponse {
            message: "Vendor registered successfully".to_string(),
            vendor: vendor.into(),
        }),
    ))
}

/// Exchange vendor credentials for an access token
#[utoipa::path(
    post,
    path = "/api/vendors/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Missing fields", body = ApiError),
        (status = 401, description = "Invalid credentials", body = ApiError)
    ),
    tag = "vendors"
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let mut fields = RequiredFields::new();
    let email = fields.text("email", request.email);
    let password = fields.value("password", request.password.filter(|p| !p.is_empty()));
    fields.check()?;

    let repo = VendorRepository::new(&state.db);
    let Some(vendor) = bounded(state.store_timeout(), repo.find_by_email(&email)).await? else {
        verify_absent_account_blocking(password).await?;
        return Err(invalid_credentials());
    };

    if !verify_password_blocking(password, vendor.password_hash).await? {
        tracing::info!(vendor_id = %vendor.id, "Vendor login rejected");
        return Err(invalid_credentials());
    }

    token_response(&state, &vendor.id.to_string(), Role::Vendor)
}

/// Calling vendor's ledger summary
#[utoipa::path(
    get,
    path = "/api/vendors/dashboard",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard figures", body = VendorDashboard),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 403, description = "Not a vendor token", body = ApiError),
        (status = 404, description = "Vendor no longer exists", body = ApiError)
    ),
    tag = "vendors"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    identity: VendorIdentity,
) -> Result<Json<VendorDashboard>, ApiError> {
    let repo = AnalyticsRepository::new(&state.db);
    let dashboard = bounded(
        state.store_timeout(),
        repo.vendor_dashboard(identity.vendor_id),
    )
    .await?;
    Ok(Json(dashboard))
}

/// Change the calling vendor's password
#[utoipa::path(
    put,
    path = "/api/vendors/password",
    security(("bearer_auth" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Missing fields or weak password", body = ApiError),
        (status = 401, description = "Current password incorrect", body = ApiError),
        (status = 403, description = "Not a vendor token", body = ApiError)
    ),
    tag = "vendors"
)]
pub async fn change_password(
    State(state): State<AppState>,
    identity: VendorIdentity,
    ApiJson(request): ApiJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut fields = RequiredFields::new();
    let current = fields.value(
        "currentPassword",
        request.current_password.filter(|p| !p.is_empty()),
    );
    let new_password = fields.value(
        "newPassword",
        request.new_password.filter(|p| !p.is_empty()),
    );
    fields.check()?;
    check_password_length("newPassword", &new_password)?;

    let repo = VendorRepository::new(&state.db);
    let vendor = bounded(state.store_timeout(), repo.find_by_id(identity.vendor_id))
        .await?
        .ok_or_else(invalid_credentials)?;

    if !verify_password_blocking(current, vendor.password_hash).await? {
        return Err(invalid_credentials());
    }

    let password_hash = hash_password_blocking(new_password).await?;
    bounded(
        state.store_timeout(),
        repo.update_password(identity.vendor_id, password_hash),
    )
    .await?;

    tracing::info!(vendor_id = %identity.vendor_id, "Vendor password changed");
    Ok(Json(MessageResponse::new("Password updated")))
}
