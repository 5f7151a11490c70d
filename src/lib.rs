//! Roastery API Library
//!
//! Cart, checkout and order history for a coffee shop, served over axum
//! with sea-orm persistence.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod metrics;
pub mod middleware_helpers;
pub mod migrator;
pub mod services;
pub mod tracing;

use axum::{extract::State, response::Json, routing::get, Extension, Router};
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::{AuthRouterExt, AuthService};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<config::AppConfig>,
    pub services: handlers::AppServices,
    pub metrics: PrometheusHandle,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        metrics: PrometheusHandle,
    ) -> Self {
        let services = handlers::AppServices::new(db.clone(), &config);
        Self {
            db,
            config: Arc::new(config),
            services,
            metrics,
        }
    }
}

/// Success envelope shared by every endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ApiError>;

async fn api_status(State(state): State<AppState>) -> Json<ApiResponse<Value>> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "roastery-api",
        "environment": state.config.environment,
        "timestamp": Utc::now().to_rfc3339(),
    });

    Json(ApiResponse::success(status_data))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match db::check_connection(&state.db).await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": { "database": db_status },
        "timestamp": Utc::now().to_rfc3339(),
    });

    if db_status == "healthy" {
        Ok(Json(ApiResponse::success(health_data)))
    } else {
        Err(errors::ServiceError::InternalError(
            "database unreachable".to_string(),
        ))
    }
}

/// Authenticated API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/cart", handlers::carts::cart_routes())
        .nest("/transactions", handlers::checkout::checkout_routes())
        .nest("/orders", handlers::orders::order_routes())
        .with_auth()
}

/// Operator routes, admin role only
pub fn operator_routes() -> Router<AppState> {
    Router::new()
        .route("/metrics", get(crate::metrics::metrics_handler))
        .with_role("admin")
}

/// Assembles the full application: public status/health, authenticated API and
/// the request-id, tracing and timeout layers.
pub fn app_router(state: AppState, auth_service: Arc<AuthService>) -> Router {
    let request_timeout = state.config.request_timeout();

    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(api_routes())
        .merge(operator_routes())
        .layer(Extension(auth_service))
        .layer(axum::middleware::from_fn_with_state(
            request_timeout,
            middleware_helpers::request_timeout_middleware,
        ))
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}
