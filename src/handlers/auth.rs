//! Authentication HTTP handlers
//!
//! Endpoints for wallet-based authentication.

use axum::{extract::State, Json};

use crate::error::ApiResult;
use crate::middleware::AuthenticatedUser;
use crate::models::{
    AuthTokenResponse, ChallengeRequest, ChallengeResponse, IdentityResponse, VerifyRequest,
};
use crate::state::AppState;

/// POST /auth/challenge - Request a nonce for wallet authentication
pub async fn request_challenge(
    State(state): State<AppState>,
    Json(req): Json<ChallengeRequest>,
) -> ApiResult<Json<ChallengeResponse>> {
    let challenge = state
        .auth_service
        .request_challenge(&req.wallet_address)
        .await?;

    Ok(Json(challenge))
}

/// POST /auth/verify - Verify the signed challenge and issue a session token
pub async fn verify_challenge(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> ApiResult<Json<AuthTokenResponse>> {
    let tokens = state
        .auth_service
        .verify_challenge(&req.wallet_address, &req.signature, &req.nonce)
        .await?;

    Ok(Json(tokens))
}

/// GET /auth/me - Current authenticated identity
pub async fn get_current_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<IdentityResponse>> {
    let identity = state.auth_service.current_identity(&user.claims).await?;

    Ok(Json(identity.into()))
}
