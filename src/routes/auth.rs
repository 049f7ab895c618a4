//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::auth;
use crate::state::AppState;

/// Create authentication routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/challenge", post(auth::request_challenge))
        .route("/auth/verify", post(auth::verify_challenge))
        .route("/auth/me", get(auth::get_current_user))
}
