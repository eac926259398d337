//! # Withdrawal API Handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::types::{ApiJson, ApiQuery, RequiredFields, parse_id};
use crate::auth::{AuthError, Claims, Role, VendorIdentity};
use crate::db::bounded;
use crate::error::{ApiError, forbidden, validation_error};
use crate::models::vendor::Model as VendorModel;
use crate::models::withdrawal::Model as WithdrawalModel;
use crate::repositories::WithdrawalRepository;
use crate::server::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct WithdrawalRequest {
    /// Amount in minor currency units
    #[schema(example = 4000)]
    pub amount: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WithdrawalResponse {
    pub id: Uuid,
    pub vendor_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_name: Option<String>,
    pub amount: i64,
    #[schema(example = "Pending")]
    pub status: String,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<FixedOffset>,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub processed_at: Option<DateTime<FixedOffset>>,
}

impl From<WithdrawalModel> for WithdrawalResponse {
    fn from(withdrawal: WithdrawalModel) -> Self {
        Self {
            id: withdrawal.id,
            vendor_id: withdrawal.vendor_id,
            vendor_name: None,
            amount: withdrawal.amount,
            status: withdrawal.status,
            created_at: withdrawal.created_at,
            processed_at: withdrawal.processed_at,
        }
    }
}

impl From<(WithdrawalModel, Option<VendorModel>)> for WithdrawalResponse {
    fn from((withdrawal, vendor): (WithdrawalModel, Option<VendorModel>)) -> Self {
        Self {
            vendor_name: vendor.map(|v| v.full_name),
            ..withdrawal.into()
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Vendor whose history to list; vendors may only pass their own id
    #[serde(rename = "vendorId", alias = "vendor_id")]
    pub vendor_id: Option<Uuid>,
}

/// Request a payout against the available balance
#[utoipa::path(
    post,
    path = "/api/vendors/withdrawals",
    security(("bearer_auth" = [])),
    request_body = WithdrawalRequest,
    responses(
        (status = 201, description = "Withdrawal recorded as Pending", body = WithdrawalResponse),
        (status = 400, description = "Missing or non-positive amount", body = ApiError),
        (status = 403, description = "Not a vendor token", body = ApiError),
        (status = 409, description = "Insufficient balance or concurrent request", body = ApiError),
        (status = 503, description = "Store unavailable", body = ApiError)
    ),
    tag = "withdrawals"
)]
pub async fn request_withdrawal(
    State(state): State<AppState>,
    identity: VendorIdentity,
    ApiJson(request): ApiJson<WithdrawalRequest>,
) -> Result<(StatusCode, Json<WithdrawalResponse>), ApiError> {
    let mut fields = RequiredFields::new();
    let amount = fields.value("amount", request.amount);
    fields.check()?;

    if amount <= 0 {
        return Err(validation_error(
            "Withdrawal amount must be greater than zero",
            serde_json::json!({ "amount": amount }),
        ));
    }

    let repo = WithdrawalRepository::new(&state.db);
    let withdrawal = bounded(
        state.store_timeout(),
        repo.request(identity.vendor_id, amount),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(withdrawal.into())))
}

/// Withdrawal history of a vendor
#[utoipa::path(
    get,
    path = "/api/vendors/withdrawals/history",
    security(("bearer_auth" = [])),
    params(HistoryQuery),
    responses(
        (status = 200, description = "History, newest first", body = Vec<WithdrawalResponse>),
        (status = 400, description = "Admin request without vendorId", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 403, description = "Vendor asked for another vendor's history", body = ApiError)
    ),
    tag = "withdrawals"
)]
pub async fn withdrawal_history(
    State(state): State<AppState>,
    claims: Claims,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> Result<Json<Vec<WithdrawalResponse>>, ApiError> {
    let vendor_id = match claims.role {
        Role::Vendor => {
            let own: Uuid = claims
                .sub
                .parse()
                .map_err(|_| ApiError::from(AuthError::Invalid))?;
            match query.vendor_id {
                Some(requested) if requested != own => {
                    return Err(forbidden(Some("Vendors may only read their own history")));
                }
                _ => own,
            }
        }
        Role::Admin => {
            let mut fields = RequiredFields::new();
            let vendor_id = fields.value("vendorId", query.vendor_id);
            fields.check()?;
            vendor_id
        }
    };

    let repo = WithdrawalRepository::new(&state.db);
    let history = bounded(state.store_timeout(), repo.list_for_vendor(vendor_id)).await?;
    Ok(Json(history.into_iter().map(WithdrawalResponse::from).collect()))
}

/// All withdrawals with vendor names
#[utoipa::path(
    get,
    path = "/api/admin/withdrawals",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All withdrawals, newest first", body = Vec<WithdrawalResponse>),
        (status = 403, description = "Not an admin token", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn list_all_withdrawals(
    State(state): State<AppState>,
) -> Result<Json<Vec<WithdrawalResponse>>, ApiError> {
    let repo = WithdrawalRepository::new(&state.db);
    let withdrawals = bounded(state.store_timeout(), repo.list_all_with_vendor()).await?;
    Ok(Json(
        withdrawals
            .into_iter()
            .map(WithdrawalResponse::from)
            .collect(),
    ))
}

/// Approve a pending withdrawal
#[utoipa::path(
    put,
    path = "/api/admin/withdrawals/{id}/approve",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Withdrawal ID (UUID)")),
    responses(
        (status = 200, description = "Withdrawal approved", body = WithdrawalResponse),
        (status = 403, description = "Not an admin token", body = ApiError),
        (status = 404, description = "Withdrawal not found", body = ApiError),
        (status = 409, description = "Withdrawal is not pending", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn approve_withdrawal(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<WithdrawalResponse>, ApiError> {
    let withdrawal_id = parse_id(&raw_id, "id")?;
    let repo = WithdrawalRepository::new(&state.db);
    let withdrawal = bounded(state.store_timeout(), repo.approve(withdrawal_id)).await?;
    Ok(Json(withdrawal.into()))
}

/// Reject a pending withdrawal, returning the amount to the vendor's balance
#[utoipa::path(
    put,
    path = "/api/admin/withdrawals/{id}/reject",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Withdrawal ID (UUID)")),
    responses(
        (status = 200, description = "Withdrawal rejected", body = WithdrawalResponse),
        (status = 403, description = "Not an admin token", body = ApiError),
        (status = 404, description = "Withdrawal not found", body = ApiError),
        (status = 409, description = "Withdrawal is not pending", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn reject_withdrawal(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<WithdrawalResponse>, ApiError> {
    let withdrawal_id = parse_id(&raw_id, "id")?;
    let repo = WithdrawalRepository::new(&state.db);
    let withdrawal = bounded(state.store_timeout(), repo.reject(withdrawal_id)).await?;
    Ok(Json(withdrawal.into()))
}

/// Mark an approved withdrawal as paid out
#[utoipa::path(
    put,
    path = "/api/admin/withdrawals/{id}/complete",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Withdrawal ID (UUID)")),
    responses(
        (status = 200, description = "Withdrawal completed", body = WithdrawalResponse),
        (status = 403, description = "Not an admin token", body = ApiError),
        (status = 404, description = "Withdrawal not found", body = ApiError),
        (status = 409, description = "Withdrawal is not approved", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn complete_withdrawal(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<WithdrawalResponse>, ApiError> {
    let withdrawal_id = parse_id(&raw_id, "id")?;
    let repo = WithdrawalRepository::new(&state.db);
    let withdrawal = bounded(state.store_timeout(), repo.complete(withdrawal_id)).await?;
    Ok(Json(withdrawal.into()))
}
