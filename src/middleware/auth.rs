//! Bearer-token extractors
//!
//! Handlers take [`AuthenticatedUser`] or [`AdminUser`] as arguments to gate
//! access on a valid session token.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use std::sync::Arc;

use crate::auth::{AuthService, Claims};
use crate::error::ApiError;
use crate::models::UserRole;

/// Caller identity: a valid session token backed by an active stored identity
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub wallet_address: String,
    pub did: String,
    pub role: UserRole,
    pub claims: Claims,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    ApiError::Unauthorized(
                        "Authorization header with Bearer token required".to_string(),
                    )
                })?;

        let auth_service = Arc::<AuthService>::from_ref(state);
        let (claims, identity) = auth_service.authorize(bearer.token()).await?;

        Ok(AuthenticatedUser {
            wallet_address: identity.wallet_address,
            did: identity.did,
            role: identity.role,
            claims,
        })
    }
}

/// An authenticated caller holding the ADMIN role
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        if user.role != UserRole::Admin {
            return Err(ApiError::Forbidden("Admin access required".to_string()));
        }

        Ok(AdminUser(user))
    }
}
