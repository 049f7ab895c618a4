//! Route definitions for the MarkChain API

mod auth;
mod user;

use axum::{
    extract::State,
    http::{HeaderValue, Method},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;
use crate::{db, middleware};

pub use auth::auth_routes;
pub use user::user_routes;

/// Build the full application router
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(auth_routes())
        .merge(user_routes())
        .layer(axum::middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            middleware::rate_limit,
        ))
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(axum::middleware::from_fn(middleware::request_tracing))
        .layer(cors)
        .with_state(state)
}

/// CORS policy from a comma-separated origin list; permissive when unset
pub fn cors_layer(allowed_origins: Option<&str>) -> CorsLayer {
    let Some(origins) = allowed_origins else {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    };

    let origins: Vec<HeaderValue> = origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers(Any)
}

async fn root() -> &'static str {
    "MarkChain API Server"
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
    version: &'static str,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match &state.db_pool {
        Some(pool) => match db::check_health(pool).await {
            Ok(()) => "connected",
            Err(e) => {
                tracing::error!(error = %e, "Database health check failed");
                "error"
            }
        },
        None => "in-memory",
    };

    let status = if database == "error" {
        "unhealthy"
    } else {
        "healthy"
    };

    Json(HealthResponse {
        status,
        database,
        version: env!("CARGO_PKG_VERSION"),
    })
}
