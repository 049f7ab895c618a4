//! Identity profile and administration

use std::sync::Arc;
use thiserror::Error;

use crate::auth::{normalize_address, Claims, CryptoError};
use crate::models::{Identity, ProfileUpdate, UserRole};
use crate::store::{IdentityStore, StoreError};

#[derive(Error, Debug)]
pub enum UserError {
    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("User with wallet address {0} not found")]
    NotFound(String),

    #[error("Not allowed to modify another user's profile")]
    Forbidden,

    #[error("Storage error: {0}")]
    Store(String),
}

impl From<StoreError> for UserError {
    fn from(e: StoreError) -> Self {
        UserError::Store(e.to_string())
    }
}

impl From<CryptoError> for UserError {
    fn from(e: CryptoError) -> Self {
        UserError::InvalidAddress(e.to_string())
    }
}

/// Reads and updates identity records on behalf of authenticated callers
#[derive(Clone)]
pub struct UserService {
    identities: Arc<dyn IdentityStore>,
}

impl UserService {
    pub fn new(identities: Arc<dyn IdentityStore>) -> Self {
        Self { identities }
    }

    /// Profile of an active identity
    pub async fn get_profile(&self, wallet_address: &str) -> Result<Identity, UserError> {
        let address = normalize_address(wallet_address)?;

        self.identities
            .find_by_address(&address)
            .await?
            .filter(|identity| identity.is_active)
            .ok_or(UserError::NotFound(address))
    }

    /// Update name, student id or email; callers may only edit themselves unless admin
    pub async fn update_profile(
        &self,
        caller: &Claims,
        wallet_address: &str,
        update: ProfileUpdate,
    ) -> Result<Identity, UserError> {
        let address = normalize_address(wallet_address)?;

        if caller.wallet != address && caller.role != UserRole::Admin {
            return Err(UserError::Forbidden);
        }

        self.identities
            .update_profile(&address, &update)
            .await?
            .ok_or(UserError::NotFound(address))
    }

    pub async fn list_users(&self, role: Option<UserRole>) -> Result<Vec<Identity>, UserError> {
        Ok(self.identities.list_active(role).await?)
    }

    /// Explicit role change; the only path by which a role moves
    pub async fn set_role(
        &self,
        wallet_address: &str,
        role: UserRole,
    ) -> Result<Identity, UserError> {
        let address = normalize_address(wallet_address)?;

        let identity = self
            .identities
            .set_role(&address, role)
            .await?
            .ok_or_else(|| UserError::NotFound(address.clone()))?;

        tracing::info!(wallet = %address, role = %role, "Role changed");
        Ok(identity)
    }

    pub async fn deactivate(&self, wallet_address: &str) -> Result<Identity, UserError> {
        let address = normalize_address(wallet_address)?;

        let identity = self
            .identities
            .deactivate(&address)
            .await?
            .ok_or_else(|| UserError::NotFound(address.clone()))?;

        tracing::info!(wallet = %address, "Identity deactivated");
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::derive_did;
    use crate::store::MemoryStore;
    use chrono::Utc;

    const STUDENT: &str = "0x1111111111111111111111111111111111111111";
    const OTHER: &str = "0x2222222222222222222222222222222222222222";

    fn claims(wallet: &str, role: UserRole) -> Claims {
        Claims {
            sub: derive_did(wallet),
            wallet: wallet.to_string(),
            did: derive_did(wallet),
            role,
            jti: "jti".to_string(),
            iat: 0,
            exp: i64::MAX,
        }
    }

    async fn seeded() -> UserService {
        let store = MemoryStore::new();
        for address in [STUDENT, OTHER] {
            store
                .upsert(&Identity::new(
                    address.to_string(),
                    derive_did(address),
                    Utc::now(),
                ))
                .await
                .unwrap();
        }
        UserService::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_get_profile_normalizes_address() {
        let users = seeded().await;
        let profile = users
            .get_profile("0x1111111111111111111111111111111111111111")
            .await
            .unwrap();
        assert_eq!(profile.wallet_address, STUDENT);

        assert!(matches!(
            users.get_profile("0x9999999999999999999999999999999999999999").await,
            Err(UserError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_own_profile_only() {
        let users = seeded().await;
        let update = ProfileUpdate {
            name: Some("Ada".to_string()),
            ..Default::default()
        };

        let updated = users
            .update_profile(&claims(STUDENT, UserRole::Student), STUDENT, update.clone())
            .await
            .unwrap();
        assert_eq!(updated.name.as_deref(), Some("Ada"));

        assert!(matches!(
            users
                .update_profile(&claims(STUDENT, UserRole::Student), OTHER, update.clone())
                .await,
            Err(UserError::Forbidden)
        ));

        assert!(users
            .update_profile(&claims(STUDENT, UserRole::Admin), OTHER, update)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_deactivated_profile_hidden() {
        let users = seeded().await;
        users.deactivate(OTHER).await.unwrap();

        assert!(matches!(
            users.get_profile(OTHER).await,
            Err(UserError::NotFound(_))
        ));
        assert_eq!(users.list_users(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_set_role() {
        let users = seeded().await;
        let identity = users.set_role(OTHER, UserRole::Teacher).await.unwrap();
        assert_eq!(identity.role, UserRole::Teacher);

        let teachers = users.list_users(Some(UserRole::Teacher)).await.unwrap();
        assert_eq!(teachers.len(), 1);
    }
}
