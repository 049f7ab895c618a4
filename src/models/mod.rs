//! Data models for MarkChain

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod auth;
pub use auth::*;

/// A wallet-controlled principal
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Identity {
    pub id: Uuid,
    /// Lower-cased `0x` address
    pub wallet_address: String,
    /// `did:ethr:<wallet_address>`, assigned once
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

impl Identity {
    /// Build a fresh identity for a first-seen wallet
    pub fn new(wallet_address: String, did: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            wallet_address,
            did,
            role: UserRole::default(),
            name: None,
            student_id: None,
            email: None,
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// User roles
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    #[default]
    Student,
    Teacher,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "STUDENT",
            UserRole::Teacher => "TEACHER",
            UserRole::Admin => "ADMIN",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Profile fields a user may change about themselves
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub student_id: Option<String>,
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_identity_defaults() {
        let now = Utc::now();
        let identity = Identity::new(
            "0x00000000000000000000000000000000000000aa".to_string(),
            "did:ethr:0x00000000000000000000000000000000000000aa".to_string(),
            now,
        );

        assert_eq!(identity.role, UserRole::Student);
        assert!(identity.is_active);
        assert!(identity.last_login.is_none());
        assert_eq!(identity.created_at, now);
    }

    #[test]
    fn test_role_serde_uppercase() {
        assert_eq!(serde_json::to_string(&UserRole::Teacher).unwrap(), "\"TEACHER\"");
        let role: UserRole = serde_json::from_str("\"ADMIN\"").unwrap();
        assert_eq!(role, UserRole::Admin);
        assert!(serde_json::from_str::<UserRole>("\"admin\"").is_err());
    }
}
