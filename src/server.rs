//! # Server Configuration
//!
//! Router assembly, shared state and the OpenAPI document.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use sea_orm::DatabaseConnection;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{TokenService, auth_middleware, require_admin, require_vendor};
use crate::config::AppConfig;
use crate::handlers;
use crate::telemetry::{TRACE_ID_HEADER, trace_id_middleware};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    pub fn new(config: AppConfig, db: DatabaseConnection) -> Self {
        let tokens = Arc::new(TokenService::from_config(&config));
        Self {
            config: Arc::new(config),
            db,
            tokens,
        }
    }

    /// Bound for a single store call made by a handler.
    pub fn store_timeout(&self) -> Duration {
        self.config.statement_timeout()
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let public = Router::new()
        .route("/vendors/register", post(handlers::vendors::register))
        .route("/vendors/login", post(handlers::vendors::login))
        .route("/admin/login", post(handlers::admin::login))
        .route("/orders", post(handlers::orders::place_order))
        .route("/orders/status/{id}", get(handlers::orders::track_status))
        .route("/networks", get(handlers::catalog::public_networks))
        .route("/bundles", get(handlers::catalog::public_bundles));

    let vendor = Router::new()
        .route("/vendors/dashboard", get(handlers::vendors::dashboard))
        .route(
            "/vendors/orders",
            get(handlers::orders::list_vendor_orders).post(handlers::orders::place_vendor_order),
        )
        .route(
            "/vendors/withdrawals",
            post(handlers::withdrawals::request_withdrawal),
        )
        .route("/vendors/password", put(handlers::vendors::change_password))
        .route_layer(middleware::from_fn(require_vendor));

    let admin = Router::new()
        .route("/admin/orders", get(handlers::orders::list_all_orders))
        .route("/admin/orders/{id}", put(handlers::orders::update_status))
        .route("/admin/orders/{id}/vendor", put(handlers::orders::assign_vendor))
        .route(
            "/admin/withdrawals",
            get(handlers::withdrawals::list_all_withdrawals),
        )
        .route(
            "/admin/withdrawals/{id}/approve",
            put(handlers::withdrawals::approve_withdrawal),
        )
        .route(
            "/admin/withdrawals/{id}/reject",
            put(handlers::withdrawals::reject_withdrawal),
        )
        .route(
            "/admin/withdrawals/{id}/complete",
            put(handlers::withdrawals::complete_withdrawal),
        )
        .route(
            "/admin/networks",
            get(handlers::catalog::list_networks).post(handlers::catalog::create_network),
        )
        .route(
            "/admin/networks/{id}",
            get(handlers::catalog::get_network)
                .put(handlers::catalog::update_network)
                .delete(handlers::catalog::delete_network),
        )
        .route(
            "/admin/bundles",
            get(handlers::catalog::list_bundles).post(handlers::catalog::create_bundle),
        )
        .route(
            "/admin/bundles/{id}",
            get(handlers::catalog::get_bundle)
                .put(handlers::catalog::update_bundle)
                .delete(handlers::catalog::delete_bundle),
        )
        .route("/admin/analytics", get(handlers::admin::analytics))
        .route_layer(middleware::from_fn(require_admin));

    // Readable by vendors (own history) and admins (any vendor)
    let shared = Router::new().route(
        "/vendors/withdrawals/history",
        get(handlers::withdrawals::withdrawal_history),
    );

    let protected = vendor
        .merge(admin)
        .merge(shared)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .nest("/api", public.merge(protected))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id_middleware))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([TRACE_ID_HEADER.clone()])
        .allow_credentials(true);

    match HeaderValue::from_str(&config.cors_allowed_origin) {
        Ok(origin) => layer.allow_origin(origin),
        Err(err) => {
            tracing::warn!(error = %err, origin = %config.cors_allowed_origin, "Ignoring unusable CORS origin");
            layer
        }
    }
}

/// Starts the server with the given configuration
pub async fn run_server(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<()> {
    let addr = config.bind_addr()?;
    let profile = config.profile.clone();

    let app = create_app(AppState::new(config, db));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, %profile, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::vendors::register,
        crate::handlers::vendors::login,
        crate::handlers::vendors::dashboard,
        crate::handlers::vendors::change_password,
        crate::handlers::admin::login,
        crate::handlers::admin::analytics,
        crate::handlers::orders::place_order,
        crate::handlers::orders::track_status,
        crate::handlers::orders::list_vendor_orders,
        crate::handlers::orders::place_vendor_order,
        crate::handlers::orders::list_all_orders,
        crate::handlers::orders::update_status,
        crate::handlers::orders::assign_vendor,
        crate::handlers::withdrawals::request_withdrawal,
        crate::handlers::withdrawals::withdrawal_history,
        crate::handlers::withdrawals::list_all_withdrawals,
        crate::handlers::withdrawals::approve_withdrawal,
        crate::handlers::withdrawals::reject_withdrawal,
        crate::handlers::withdrawals::complete_withdrawal,
        crate::handlers::catalog::public_networks,
        crate::handlers::catalog::public_bundles,
        crate::handlers::catalog::list_networks,
        crate::handlers::catalog::create_network,
        crate::handlers::catalog::get_network,
        crate::handlers::catalog::update_network,
        crate::handlers::catalog::delete_network,
        crate::handlers::catalog::list_bundles,
        crate::handlers::catalog::create_bundle,
        crate::handlers::catalog::get_bundle,
        crate::handlers::catalog::update_bundle,
        crate::handlers::catalog::delete_bundle,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::models::OrderStatus,
            crate::models::WithdrawalStatus,
            crate::error::ApiError,
            crate::auth::Role,
            crate::repositories::AnalyticsSummary,
            crate::repositories::TopVendor,
            crate::repositories::VendorDashboard,
        )
    ),
    modifiers(&BearerAuth),
    info(
        title = "Data Bundle Reselling API",
        description = "Vendor accounts, bundle catalog, order and withdrawal ledgers",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
