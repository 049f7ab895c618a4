//! Authentication and profile request/response types

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use super::{Identity, UserRole};

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Request for authentication challenge
#[derive(Debug, Deserialize)]
pub struct ChallengeRequest {
    pub wallet_address: String,
}

/// Response containing the authentication challenge
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChallengeResponse {
    pub nonce: String,
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

/// Request to verify a signed challenge
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub wallet_address: String,
    pub signature: String, // 0x-prefixed 65-byte hex
    pub nonce: String,
}

/// Auth token response
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthTokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: IdentitySummary,
}

/// Identity summary returned alongside a session token
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct IdentitySummary {
    pub wallet_address: String,
    pub did: String,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl From<&Identity> for IdentitySummary {
    fn from(identity: &Identity) -> Self {
        Self {
            wallet_address: identity.wallet_address.clone(),
            did: identity.did.clone(),
            role: identity.role,
            name: identity.name.clone(),
        }
    }
}

/// Identity profile (sanitized for API)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IdentityResponse {
    pub id: Uuid,
    pub wallet_address: String,
    pub did: String,
    pub role: UserRole,
    pub name: Option<String>,
    pub student_id: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Identity> for IdentityResponse {
    fn from(identity: Identity) -> Self {
        Self {
            id: identity.id,
            wallet_address: identity.wallet_address,
            did: identity.did,
            role: identity.role,
            name: identity.name,
            student_id: identity.student_id,
            email: identity.email,
            is_active: identity.is_active,
            last_login: identity.last_login,
            created_at: identity.created_at,
            updated_at: identity.updated_at,
        }
    }
}

/// Request to update one's own profile
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub student_id: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

/// Request to change a user's role
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: UserRole,
}

/// Query parameters for listing users
#[derive(Debug, Deserialize, Default)]
pub struct ListUsersQuery {
    pub role: Option<UserRole>,
}
