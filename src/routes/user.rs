//! User route definitions

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handlers::user;
use crate::state::AppState;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(user::list_users))
        .route(
            "/users/:wallet_address",
            get(user::get_user_profile).put(user::update_user_profile),
        )
        .route("/users/:wallet_address/role", put(user::update_user_role))
        .route(
            "/users/:wallet_address/deactivate",
            post(user::deactivate_user),
        )
}
