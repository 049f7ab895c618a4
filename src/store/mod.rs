//! Persistence interfaces for identities and pending challenges
//!
//! Two backends implement both traits: [`PgStore`] for deployments and
//! [`MemoryStore`] for tests and database-less local runs.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use thiserror::Error;

use crate::models::{Identity, ProfileUpdate, UserRole};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Nonce length in bytes
pub const NONCE_LENGTH: usize = 32;

/// Storage errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// A nonce recorded against an address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedNonce {
    pub nonce: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl IssuedNonce {
    /// Generate a fresh nonce valid for `ttl` from `now`
    pub fn generate(now: DateTime<Utc>, ttl: Duration) -> Self {
        let mut bytes = [0u8; NONCE_LENGTH];
        rand::rngs::OsRng.fill_bytes(&mut bytes);

        Self {
            nonce: hex::encode(bytes),
            issued_at: now,
            expires_at: now + ttl,
        }
    }
}

/// Single live challenge nonce per wallet address
#[async_trait]
pub trait NonceStore: Send + Sync {
    /// Record a fresh nonce for `address`, replacing any pending one
    async fn issue(&self, address: &str, ttl: Duration) -> Result<IssuedNonce, StoreError>;

    /// Atomically clear the pending nonce if it equals `nonce` and has not expired
    ///
    /// Returns `false` without touching the stored value on mismatch, absence or
    /// expiry.
    async fn consume(&self, address: &str, nonce: &str) -> Result<bool, StoreError>;
}

/// Identity records keyed by lower-cased wallet address
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_address(&self, address: &str) -> Result<Option<Identity>, StoreError>;

    /// Insert `identity` if its address is unseen; otherwise refresh only
    /// `last_login` and `updated_at` on the stored record. Returns the stored record.
    async fn upsert(&self, identity: &Identity) -> Result<Identity, StoreError>;

    /// Active identities, optionally restricted to one role
    async fn list_active(&self, role: Option<UserRole>) -> Result<Vec<Identity>, StoreError>;

    /// Apply profile changes to an active identity
    async fn update_profile(
        &self,
        address: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<Identity>, StoreError>;

    async fn set_role(&self, address: &str, role: UserRole)
        -> Result<Option<Identity>, StoreError>;

    /// Clear the active flag; records are never removed
    async fn deactivate(&self, address: &str) -> Result<Option<Identity>, StoreError>;
}
