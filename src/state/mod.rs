//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::auth::AuthService;
use crate::middleware::RateLimiter;
use crate::services::UserService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub user_service: Arc<UserService>,
    pub rate_limiter: RateLimiter,
    /// Present when running on the postgres backend
    pub db_pool: Option<PgPool>,
}

impl AppState {
    pub fn new(
        auth_service: Arc<AuthService>,
        user_service: Arc<UserService>,
        rate_limiter: RateLimiter,
        db_pool: Option<PgPool>,
    ) -> Self {
        Self {
            auth_service,
            user_service,
            rate_limiter,
            db_pool,
        }
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}

impl FromRef<AppState> for Arc<UserService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.user_service.clone()
    }
}

impl FromRef<AppState> for RateLimiter {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.rate_limiter.clone()
    }
}
