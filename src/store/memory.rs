//! In-process store

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, RwLock};

use super::{IdentityStore, IssuedNonce, NonceStore, StoreError};
use crate::models::{Identity, ProfileUpdate, UserRole};

/// Identities and nonces held in memory
#[derive(Clone, Default)]
pub struct MemoryStore {
    identities: Arc<RwLock<HashMap<String, Identity>>>,
    nonces: Arc<Mutex<HashMap<String, IssuedNonce>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored identities, active or not
    pub async fn identity_count(&self) -> usize {
        self.identities.read().await.len()
    }

    /// The pending nonce for `address`, if any
    pub async fn pending_nonce(&self, address: &str) -> Option<IssuedNonce> {
        self.nonces.lock().await.get(address).cloned()
    }
}

#[async_trait]
impl NonceStore for MemoryStore {
    async fn issue(&self, address: &str, ttl: Duration) -> Result<IssuedNonce, StoreError> {
        let now = Utc::now();
        let issued = IssuedNonce::generate(now, ttl);

        let mut nonces = self.nonces.lock().await;
        // abandoned challenges go when the next one is issued
        nonces.retain(|_, pending| pending.expires_at > now);
        nonces.insert(address.to_string(), issued.clone());

        Ok(issued)
    }

    async fn consume(&self, address: &str, nonce: &str) -> Result<bool, StoreError> {
        // check and clear under one lock acquisition
        let mut nonces = self.nonces.lock().await;

        let valid = match nonces.get(address) {
            Some(pending) => pending.nonce == nonce && pending.expires_at > Utc::now(),
            None => false,
        };

        if valid {
            nonces.remove(address);
        }

        Ok(valid)
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn find_by_address(&self, address: &str) -> Result<Option<Identity>, StoreError> {
        Ok(self.identities.read().await.get(address).cloned())
    }

    async fn upsert(&self, identity: &Identity) -> Result<Identity, StoreError> {
        let mut identities = self.identities.write().await;

        let stored = identities
            .entry(identity.wallet_address.clone())
            .and_modify(|existing| {
                existing.last_login = identity.last_login;
                existing.updated_at = identity.updated_at;
            })
            .or_insert_with(|| identity.clone());

        Ok(stored.clone())
    }

    async fn list_active(&self, role: Option<UserRole>) -> Result<Vec<Identity>, StoreError> {
        let identities = self.identities.read().await;

        let mut found: Vec<Identity> = identities
            .values()
            .filter(|i| i.is_active && role.map_or(true, |r| i.role == r))
            .cloned()
            .collect();
        found.sort_by_key(|i| i.created_at);

        Ok(found)
    }

    async fn update_profile(
        &self,
        address: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<Identity>, StoreError> {
        let mut identities = self.identities.write().await;

        let Some(identity) = identities.get_mut(address).filter(|i| i.is_active) else {
            return Ok(None);
        };

        if let Some(name) = &update.name {
            identity.name = Some(name.clone());
        }
        if let Some(student_id) = &update.student_id {
            identity.student_id = Some(student_id.clone());
        }
        if let Some(email) = &update.email {
            identity.email = Some(email.clone());
        }
        identity.updated_at = Utc::now();

        Ok(Some(identity.clone()))
    }

    async fn set_role(
        &self,
        address: &str,
        role: UserRole,
    ) -> Result<Option<Identity>, StoreError> {
        let mut identities = self.identities.write().await;

        Ok(identities.get_mut(address).map(|identity| {
            identity.role = role;
            identity.updated_at = Utc::now();
            identity.clone()
        }))
    }

    async fn deactivate(&self, address: &str) -> Result<Option<Identity>, StoreError> {
        let mut identities = self.identities.write().await;

        Ok(identities.get_mut(address).map(|identity| {
            identity.is_active = false;
            identity.updated_at = Utc::now();
            identity.clone()
        }))
    }
}
