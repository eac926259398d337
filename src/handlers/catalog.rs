//! # Catalog API Handlers
//!
//! Admin CRUD over networks and bundles, plus the public read-only listings
//! used by the customer order form.

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
use crate::db::bounded;
use crate::error::{ApiError, not_found};
use crate::models::bundle::Model as BundleModel;
use crate::models::network::Model as NetworkModel;
use crate::repositories::{BundleRepository, NetworkRepository, NewBundle};
use crate::server::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct NetworkResponse {
    pub id: Uuid,
    #[schema(example = "MTN")]
    pub name: String,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<FixedOffset>,
}

impl From<NetworkModel> for NetworkResponse {
    fn from(network: NetworkModel) -> Self {
        Self {
            id: network.id,
            name: network.name,
            created_at: network.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BundleResponse {
    pub id: Uuid,
    pub network_id: Uuid,
    #[schema(example = "Weekly 5GB")]
    pub name: String,
    #[schema(example = "5GB")]
    pub size: String,
    /// Price in minor currency units
    pub price: i64,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<FixedOffset>,
}

impl From<BundleModel> for BundleResponse {
    fn from(bundle: BundleModel) -> Self {
        Self {
            id: bundle.id,
            network_id: bundle.network_id,
            name: bundle.name,
            size: bundle.size,
            price: bundle.price,
            created_at: bundle.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NetworkRequest {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BundleRequest {
    #[serde(alias = "networkId")]
    pub network_id: Option<Uuid>,
    pub name: Option<String>,
    pub size: Option<String>,
    pub price: Option<i64>,
}

impl BundleRequest {
    fn into_new_bundle(self) -> Result<NewBundle, ApiError> {
        let mut fields = RequiredFields::new();
        let network_id = fields.value("network_id", self.network_id);
        let name = fields.text("name", self.name);
        let size = fields.text("size", self.size);
        let price = fields.value("price", self.price);
        fields.check()?;

        Ok(NewBundle {
            network_id,
            name,
            size,
            price,
        })
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BundleFilter {
    /// Only bundles of this network
    pub network_id: Option<Uuid>,
}

fn network_name(request: NetworkRequest) -> Result<String, ApiError> {
    let mut fields = RequiredFields::new();
    let name = fields.text("name", request.name);
    fields.check()?;
    Ok(name)
}

/// Networks available for ordering
#[utoipa::path(
    get,
    path = "/api/networks",
    responses((status = 200, description = "Networks by name", body = Vec<NetworkResponse>)),
    tag = "catalog"
)]
pub async fn public_networks(
    State(state): State<AppState>,
) -> Result<Json<Vec<NetworkResponse>>, ApiError> {
    list_networks(State(state)).await
}

/// Bundles available for ordering
#[utoipa::path(
    get,
    path = "/api/bundles",
    params(BundleFilter),
    responses((status = 200, description = "Bundles by name", body = Vec<BundleResponse>)),
    tag = "catalog"
)]
pub async fn public_bundles(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<BundleFilter>,
) -> Result<Json<Vec<BundleResponse>>, ApiError> {
    list_bundles(State(state), ApiQuery(filter)).await
}

/// List networks
#[utoipa::path(
    get,
    path = "/api/admin/networks",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Networks by name", body = Vec<NetworkResponse>),
        (status = 403, description = "Not an admin token", body = ApiError)
    ),
    tag = "catalog"
)]
pub async fn list_networks(
    State(state): State<AppState>,
) -> Result<Json<Vec<NetworkResponse>>, ApiError> {
    let repo = NetworkRepository::new(&state.db);
    let networks = bounded(state.store_timeout(), repo.list()).await?;
    Ok(Json(networks.into_iter().map(NetworkResponse::from).collect()))
}

/// Create a network
#[utoipa::path(
    post,
    path = "/api/admin/networks",
    security(("bearer_auth" = [])),
    request_body = NetworkRequest,
    responses(
        (status = 201, description = "Network created", body = NetworkResponse),
        (status = 400, description = "Missing name", body = ApiError),
        (status = 403, description = "Not an admin token", body = ApiError),
        (status = 409, description = "Name already used", body = ApiError)
    ),
    tag = "catalog"
)]
pub async fn create_network(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<NetworkRequest>,
) -> Result<(StatusCode, Json<NetworkResponse>), ApiError> {
    let name = network_name(request)?;
    let repo = NetworkRepository::new(&state.db);
    let network = bounded(state.store_timeout(), repo.create(&name)).await?;
    Ok((StatusCode::CREATED, Json(network.into())))
}

/// Fetch a network
#[utoipa::path(
    get,
    path = "/api/admin/networks/{id}",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Network ID (UUID)")),
    responses(
        (status = 200, description = "Network", body = NetworkResponse),
        (status = 404, description = "Network not found", body = ApiError)
    ),
    tag = "catalog"
)]
pub async fn get_network(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<NetworkResponse>, ApiError> {
    let network_id = parse_id(&raw_id, "id")?;
    let repo = NetworkRepository::new(&state.db);
    let network = bounded(state.store_timeout(), repo.find(network_id))
        .await?
        .ok_or_else(|| not_found("Network not found"))?;
    Ok(Json(network.into()))
}

/// Rename a network
#[utoipa::path(
    put,
    path = "/api/admin/networks/{id}",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Network ID (UUID)")),
    request_body = NetworkRequest,
    responses(
        (status = 200, description = "Network updated", body = NetworkResponse),
        (status = 400, description = "Missing name", body = ApiError),
        (status = 404, description = "Network not found", body = ApiError),
        (status = 409, description = "Name already used", body = ApiError)
    ),
    tag = "catalog"
)]
pub async fn update_network(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    ApiJson(request): ApiJson<NetworkRequest>,
) -> Result<Json<NetworkResponse>, ApiError> {
    let network_id = parse_id(&raw_id, "id")?;
    let name = network_name(request)?;
    let repo = NetworkRepository::new(&state.db);
    let network = bounded(state.store_timeout(), repo.update(network_id, &name)).await?;
    Ok(Json(network.into()))
}

/// Delete a network without bundles
#[utoipa::path(
    delete,
    path = "/api/admin/networks/{id}",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Network ID (UUID)")),
    responses(
        (status = 204, description = "Network deleted"),
        (status = 404, description = "Network not found", body = ApiError),
        (status = 409, description = "Network still has bundles", body = ApiError)
    ),
    tag = "catalog"
)]
pub async fn delete_network(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let network_id = parse_id(&raw_id, "id")?;
    let repo = NetworkRepository::new(&state.db);
    bounded(state.store_timeout(), repo.delete(network_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List bundles
#[utoipa::path(
    get,
    path = "/api/admin/bundles",
    security(("bearer_auth" = [])),
    params(BundleFilter),
    responses(
        (status = 200, description = "Bundles by name", body = Vec<BundleResponse>),
        (status = 403, description = "Not an admin token", body = ApiError)
    ),
    tag = "catalog"
)]
pub async fn list_bundles(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<BundleFilter>,
) -> Result<Json<Vec<BundleResponse>>, ApiError> {
    let repo = BundleRepository::new(&state.db);
    let bundles = bounded(state.store_timeout(), repo.list(filter.network_id)).await?;
    Ok(Json(bundles.into_iter().map(BundleResponse::from).collect()))
}

/// Create a bundle
#[utoipa::path(
    post,
    path = "/api/admin/bundles",
    security(("bearer_auth" = [])),
    request_body = BundleRequest,
    responses(
        (status = 201, description = "Bundle created", body = BundleResponse),
        (status = 400, description = "Missing fields or non-positive price", body = ApiError),
        (status = 404, description = "Network not found", body = ApiError)
    ),
    tag = "catalog"
)]
pub async fn create_bundle(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BundleRequest>,
) -> Result<(StatusCode, Json<BundleResponse>), ApiError> {
    let bundle = request.into_new_bundle()?;
    let repo = BundleRepository::new(&state.db);
    let created = bounded(state.store_timeout(), repo.create(bundle)).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Fetch a bundle
#[utoipa::path(
    get,
    path = "/api/admin/bundles/{id}",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Bundle ID (UUID)")),
    responses(
        (status = 200, description = "Bundle", body = BundleResponse),
        (status = 404, description = "Bundle not found", body = ApiError)
    ),
    tag = "catalog"
)]
pub async fn get_bundle(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<BundleResponse>, ApiError> {
    let bundle_id = parse_id(&raw_id, "id")?;
    let repo = BundleRepository::new(&state.db);
    let bundle = bounded(state.store_timeout(), repo.find(bundle_id))
        .await?
        .ok_or_else(|| not_found("Bundle not found"))?;
    Ok(Json(bundle.into()))
}

/// Replace a bundle's fields
#[utoipa::path(
    put,
    path = "/api/admin/bundles/{id}",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Bundle ID (UUID)")),
    request_body = BundleRequest,
    responses(
        (status = 200, description = "Bundle updated", body = BundleResponse),
        (status = 400, description = "Missing fields or non-positive price", body = ApiError),
        (status = 404, description = "Bundle or network not found", body = ApiError)
    ),
    tag = "catalog"
)]
pub async fn update_bundle(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    ApiJson(request): ApiJson<BundleRequest>,
) -> Result<Json<BundleResponse>, ApiError> {
    let bundle_id = parse_id(&raw_id, "id")?;
    let bundle = request.into_new_bundle()?;
    let repo = BundleRepository::new(&state.db);
    let updated = bounded(state.store_timeout(), repo.update(bundle_id, bundle)).await?;
    Ok(Json(updated.into()))
}

/// Delete a bundle no order references
#[utoipa::path(
    delete,
    path = "/api/admin/bundles/{id}",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Bundle ID (UUID)")),
    responses(
        (status = 204, description = "Bundle deleted"),
        (status = 404, description = "Bundle not found", body = ApiError),
        (status = 409, description = "Bundle referenced by orders", body = ApiError)
    ),
    tag = "catalog"
)]
pub async fn delete_bundle(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let bundle_id = parse_id(&raw_id, "id")?;
    let repo = BundleRepository::new(&state.db);
    bounded(state.store_timeout(), repo.delete(bundle_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
