//! User profile and administration handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use validator::Validate;

use crate::error::ApiResult;
use crate::middleware::{AdminUser, AuthenticatedUser};
use crate::models::{
    IdentityResponse, ListUsersQuery, ProfileUpdate, UpdateProfileRequest, UpdateRoleRequest,
};
use crate::state::AppState;

/// GET /users - List active users, optionally by role (admin)
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<Json<Vec<IdentityResponse>>> {
    let users = state.user_service.list_users(query.role).await?;

    Ok(Json(users.into_iter().map(Into::into).collect()))
}

/// GET /users/:wallet_address - Profile of an active user
pub async fn get_user_profile(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(wallet_address): Path<String>,
) -> ApiResult<Json<IdentityResponse>> {
    let identity = state.user_service.get_profile(&wallet_address).await?;

    Ok(Json(identity.into()))
}

/// PUT /users/:wallet_address - Update name, student id or email
pub async fn update_user_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(wallet_address): Path<String>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<IdentityResponse>> {
    req.validate()?;

    let update = ProfileUpdate {
        name: req.name,
        student_id: req.student_id,
        email: req.email,
    };

    let identity = state
        .user_service
        .update_profile(&user.claims, &wallet_address, update)
        .await?;

    Ok(Json(identity.into()))
}

/// PUT /users/:wallet_address/role - Change a user's role (admin)
pub async fn update_user_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(wallet_address): Path<String>,
    Json(req): Json<UpdateRoleRequest>,
) -> ApiResult<Json<IdentityResponse>> {
    tracing::info!(admin = %admin.wallet_address, target = %wallet_address, role = %req.role, "Role change requested");

    let identity = state
        .user_service
        .set_role(&wallet_address, req.role)
        .await?;

    Ok(Json(identity.into()))
}

/// POST /users/:wallet_address/deactivate - Soft-delete a user (admin)
pub async fn deactivate_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(wallet_address): Path<String>,
) -> ApiResult<Json<IdentityResponse>> {
    let identity = state.user_service.deactivate(&wallet_address).await?;

    Ok(Json(identity.into()))
}
