//! Stockbook API Library
//!
//! Spreadsheet-driven inventory tracking: imports product sheets, computes
//! running inventory per day and serves the history over HTTP.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{Json, Response},
    routing::get,
    Router,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::{AuthConfig, AuthRouterExt, AuthService};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub auth: Arc<AuthService>,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let auth = Arc::new(AuthService::new(AuthConfig::from(&config), db.clone()));
        let services = handlers::AppServices::new(db.clone());
        Self {
            db,
            config,
            auth,
            services,
        }
    }
}

/// Greeting returned by `/`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RootMessage {
    pub message: String,
}

/// Liveness report returned by `/health`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthStatus {
    pub status: String,
    pub database: String,
    pub version: String,
}

/// Authenticated `/api/v1` routes
pub fn api_v1_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .nest("/products", handlers::products::products_routes())
        .nest("/uploads", handlers::uploads::uploads_routes(max_upload_bytes))
        .with_auth()
}

/// Builds the full application router with its request-scoped layers.
///
/// CORS and compression are left to the binary so tests see raw responses.
pub fn app_router(state: AppState) -> Router {
    let auth_service = state.auth.clone();
    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest(
            "/auth",
            handlers::auth::auth_routes().merge(handlers::auth::current_user_routes().with_auth()),
        )
        .nest("/api/v1", api_v1_routes(max_upload_bytes))
        .merge(openapi::swagger_ui())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        // Inject AuthService into request extensions for auth middleware
        .layer(axum::middleware::from_fn_with_state(
            auth_service,
            inject_auth_service,
        ))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}

async fn inject_auth_service(
    State(auth): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    request.extensions_mut().insert(auth);
    next.run(request).await
}

async fn root() -> Json<RootMessage> {
    Json(RootMessage {
        message: "Inventory Management API".to_string(),
    })
}

async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    let database = match db::check_connection(&state.db).await {
        Ok(()) => "healthy",
        Err(e) => {
            ::tracing::warn!(error = %e, "Health check could not reach the database");
            "unhealthy"
        }
    };

    Json(HealthStatus {
        status: if database == "healthy" { "healthy" } else { "unhealthy" }.to_string(),
        database: database.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
