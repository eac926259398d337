//! # Order API Handlers
//!
//! Customer and vendor order placement, public status tracking and admin
//! lifecycle management.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::types::{
    ApiJson, RequiredFields, parse_id, parse_id_or_not_found, validate_phone_number,
};
use crate::auth::VendorIdentity;
use crate::db::bounded;
use crate::error::{ApiError, not_found, validation_error};
use crate::models::OrderStatus;
use crate::models::order::Model as OrderModel;
use crate::models::vendor::Model as VendorModel;
use crate::repositories::{NewOrder, OrderRepository};
use crate::server::AppState;

/// Order placement payload. Any `status` sent by the caller is ignored.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    #[serde(alias = "phoneNumber")]
    #[schema(example = "+233241234567")]
    pub phone_number: Option<String>,
    #[schema(example = "MTN")]
    pub network: Option<String>,
    #[schema(example = "Weekly 5GB")]
    pub package: Option<String>,
    #[serde(alias = "bundleId")]
    pub bundle_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub vendor_id: Option<Uuid>,
    /// Attributed vendor's display name (admin listings only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_name: Option<String>,
    pub bundle_id: Option<Uuid>,
    pub phone_number: String,
    pub network: String,
    pub package: String,
    #[schema(example = "Pending")]
    pub status: String,
    pub amount: i64,
    pub profit: i64,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<FixedOffset>,
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTime<FixedOffset>,
}

impl From<OrderModel> for OrderResponse {
    fn from(order: OrderModel) -> Self {
        Self {
            id: order.id,
            vendor_id: order.vendor_id,
            vendor_name: None,
            bundle_id: order.bundle_id,
            phone_number: order.phone_number,
            network: order.network,
            package: order.package,
            status: order.status,
            amount: order.amount,
            profit: order.profit,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

impl From<(OrderModel, Option<VendorModel>)> for OrderResponse {
    fn from((order, vendor): (OrderModel, Option<VendorModel>)) -> Self {
        Self {
            vendor_name: vendor.map(|v| v.full_name),
            ..order.into()
        }
    }
}

/// Public tracking view: the status only
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderStatusResponse {
    #[schema(example = "Pending")]
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    #[schema(example = "Completed")]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignVendorRequest {
    #[serde(alias = "vendorId")]
    pub vendor_id: Option<Uuid>,
}

fn new_order(request: PlaceOrderRequest, vendor_id: Option<Uuid>) -> Result<NewOrder, ApiError> {
    let mut fields = RequiredFields::new();
    let phone_number = fields.text("phone_number", request.phone_number);
    let network = fields.text("network", request.network);
    let package = fields.text("package", request.package);
    fields.check()?;

    validate_phone_number("phone_number", &phone_number)?;

    Ok(NewOrder {
        phone_number,
        network,
        package,
        bundle_id: request.bundle_id,
        vendor_id,
    })
}

/// Place an anonymous customer order
#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order placed in Pending", body = OrderResponse),
        (status = 400, description = "Missing or invalid fields", body = ApiError),
        (status = 404, description = "Referenced bundle not found", body = ApiError)
    ),
    tag = "orders"
)]
pub async fn place_order(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order = new_order(request, None)?;
    let repo = OrderRepository::new(&state.db, state.config.vendor_commission_bps);
    let created = bounded(state.store_timeout(), repo.place(order)).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Track an order's status
#[utoipa::path(
    get,
    path = "/api/orders/status/{id}",
    params(("id" = String, Path, description = "Order ID (UUID)")),
    responses(
        (status = 200, description = "Current status", body = OrderStatusResponse),
        (status = 404, description = "Order not found", body = ApiError)
    ),
    tag = "orders"
)]
pub async fn track_status(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<OrderStatusResponse>, ApiError> {
    let order_id = parse_id_or_not_found(&raw_id, "Order not found")?;
    let repo = OrderRepository::new(&state.db, state.config.vendor_commission_bps);

    let order = bounded(state.store_timeout(), repo.find(order_id))
        .await?
        .ok_or_else(|| not_found("Order not found"))?;

    Ok(Json(OrderStatusResponse {
        status: order.status,
    }))
}

/// Orders attributed to the calling vendor
#[utoipa::path(
    get,
    path = "/api/vendors/orders",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Vendor's orders, newest first", body = Vec<OrderResponse>),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 403, description = "Not a vendor token", body = ApiError)
    ),
    tag = "orders"
)]
pub async fn list_vendor_orders(
    State(state): State<AppState>,
    identity: VendorIdentity,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let repo = OrderRepository::new(&state.db, state.config.vendor_commission_bps);
    let orders = bounded(
        state.store_timeout(),
        repo.list_for_vendor(identity.vendor_id),
    )
    .await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// Place an order attributed to the calling vendor
#[utoipa::path(
    post,
    path = "/api/vendors/orders",
    security(("bearer_auth" = [])),
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order placed in Pending", body = OrderResponse),
        (status = 400, description = "Missing or invalid fields", body = ApiError),
        (status = 403, description = "Not a vendor token", body = ApiError),
        (status = 404, description = "Referenced bundle not found", body = ApiError)
    ),
    tag = "orders"
)]
pub async fn place_vendor_order(
    State(state): State<AppState>,
    identity: VendorIdentity,
    ApiJson(request): ApiJson<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order = new_order(request, Some(identity.vendor_id))?;
    let repo = OrderRepository::new(&state.db, state.config.vendor_commission_bps);
    let created = bounded(state.store_timeout(), repo.place(order)).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// All orders with vendor names
#[utoipa::path(
    get,
    path = "/api/admin/orders",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All orders, newest first", body = Vec<OrderResponse>),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 403, description = "Not an admin token", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let repo = OrderRepository::new(&state.db, state.config.vendor_commission_bps);
    let orders = bounded(state.store_timeout(), repo.list_all_with_vendor()).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// Move an order forward in its lifecycle
#[utoipa::path(
    put,
    path = "/api/admin/orders/{id}",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Order ID (UUID)")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order updated", body = OrderResponse),
        (status = 400, description = "Missing or unknown status", body = ApiError),
        (status = 403, description = "Not an admin token", body = ApiError),
        (status = 404, description = "Order not found", body = ApiError),
        (status = 409, description = "Illegal transition", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn update_status(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    ApiJson(request): ApiJson<UpdateOrderStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_id(&raw_id, "id")?;

    let mut fields = RequiredFields::new();
    let raw_status = fields.text("status", request.status);
    fields.check()?;

    let next: OrderStatus = raw_status.parse().map_err(|_| {
        validation_error(
            "Unknown order status",
            serde_json::json!({
                "status": raw_status,
                "allowed": OrderStatus::ALL.iter().map(OrderStatus::as_str).collect::<Vec<_>>(),
            }),
        )
    })?;

    let repo = OrderRepository::new(&state.db, state.config.vendor_commission_bps);
    let order = bounded(state.store_timeout(), repo.update_status(order_id, next)).await?;
    Ok(Json(order.into()))
}

/// Attribute an unassigned order to a vendor
#[utoipa::path(
    put,
    path = "/api/admin/orders/{id}/vendor",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Order ID (UUID)")),
    request_body = AssignVendorRequest,
    responses(
        (status = 200, description = "Order attributed", body = OrderResponse),
        (status = 400, description = "Missing vendor_id", body = ApiError),
        (status = 403, description = "Not an admin token", body = ApiError),
        (status = 404, description = "Order or vendor not found", body = ApiError),
        (status = 409, description = "Order already attributed or failed", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn assign_vendor(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    ApiJson(request): ApiJson<AssignVendorRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_id(&raw_id, "id")?;

    let mut fields = RequiredFields::new();
    let vendor_id = fields.value("vendor_id", request.vendor_id);
    fields.check()?;

    let repo = OrderRepository::new(&state.db, state.config.vendor_commission_bps);
    let order = bounded(state.store_timeout(), repo.assign_vendor(order_id, vendor_id)).await?;
    Ok(Json(order.into()))
}
