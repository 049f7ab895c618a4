//! PostgreSQL-backed store

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::PgPool;

use super::{IdentityStore, IssuedNonce, NonceStore, StoreError};
use crate::models::{Identity, ProfileUpdate, UserRole};

const IDENTITY_COLUMNS: &str = "id, wallet_address, did, role, name, student_id, email, \
                                is_active, last_login, created_at, updated_at";

/// Identities and nonces persisted in Postgres
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl NonceStore for PgStore {
    async fn issue(&self, address: &str, ttl: Duration) -> Result<IssuedNonce, StoreError> {
        let issued = IssuedNonce::generate(Utc::now(), ttl);

        // abandoned challenges go when the next one is issued
        sqlx::query("DELETE FROM auth_nonces WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO auth_nonces (wallet_address, nonce, issued_at, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (wallet_address)
            DO UPDATE SET nonce = EXCLUDED.nonce,
                          issued_at = EXCLUDED.issued_at,
                          expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(address)
        .bind(&issued.nonce)
        .bind(issued.issued_at)
        .bind(issued.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(issued)
    }

    async fn consume(&self, address: &str, nonce: &str) -> Result<bool, StoreError> {
        // A single conditional delete: two racing verifications cannot both win
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM auth_nonces
            WHERE wallet_address = $1 AND nonce = $2 AND expires_at > NOW()
            "#,
        )
        .bind(address)
        .bind(nonce)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected == 1)
    }
}

#[async_trait]
impl IdentityStore for PgStore {
    async fn find_by_address(&self, address: &str) -> Result<Option<Identity>, StoreError> {
        let identity = sqlx::query_as::<_, Identity>(&format!(
            "SELECT {} FROM identities WHERE wallet_address = $1",
            IDENTITY_COLUMNS
        ))
        .bind(address)
        .fetch_optional(&self.pool)
        .await?;

        Ok(identity)
    }

    async fn upsert(&self, identity: &Identity) -> Result<Identity, StoreError> {
        let stored = sqlx::query_as::<_, Identity>(&format!(
            r#"
            INSERT INTO identities ({cols})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (wallet_address)
            DO UPDATE SET last_login = EXCLUDED.last_login,
                          updated_at = EXCLUDED.updated_at
            RETURNING {cols}
            "#,
            cols = IDENTITY_COLUMNS
        ))
        .bind(identity.id)
        .bind(&identity.wallet_address)
        .bind(&identity.did)
        .bind(identity.role)
        .bind(&identity.name)
        .bind(&identity.student_id)
        .bind(&identity.email)
        .bind(identity.is_active)
        .bind(identity.last_login)
        .bind(identity.created_at)
        .bind(identity.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(stored)
    }

    async fn list_active(&self, role: Option<UserRole>) -> Result<Vec<Identity>, StoreError> {
        let identities = sqlx::query_as::<_, Identity>(&format!(
            r#"
            SELECT {} FROM identities
            WHERE is_active = TRUE AND ($1::user_role IS NULL OR role = $1)
            ORDER BY created_at ASC
            "#,
            IDENTITY_COLUMNS
        ))
        .bind(role)
        .fetch_all(&self.pool)
        .await?;

        Ok(identities)
    }

    async fn update_profile(
        &self,
        address: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<Identity>, StoreError> {
        let identity = sqlx::query_as::<_, Identity>(&format!(
            r#"
            UPDATE identities
            SET name = COALESCE($2, name),
                student_id = COALESCE($3, student_id),
                email = COALESCE($4, email),
                updated_at = NOW()
            WHERE wallet_address = $1 AND is_active = TRUE
            RETURNING {}
            "#,
            IDENTITY_COLUMNS
        ))
        .bind(address)
        .bind(&update.name)
        .bind(&update.student_id)
        .bind(&update.email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(identity)
    }

    async fn set_role(
        &self,
        address: &str,
        role: UserRole,
    ) -> Result<Option<Identity>, StoreError> {
        let identity = sqlx::query_as::<_, Identity>(&format!(
            r#"
            UPDATE identities SET role = $2, updated_at = NOW()
            WHERE wallet_address = $1
            RETURNING {}
            "#,
            IDENTITY_COLUMNS
        ))
        .bind(address)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?;

        Ok(identity)
    }

    async fn deactivate(&self, address: &str) -> Result<Option<Identity>, StoreError> {
        let identity = sqlx::query_as::<_, Identity>(&format!(
            r#"
            UPDATE identities SET is_active = FALSE, updated_at = NOW()
            WHERE wallet_address = $1
            RETURNING {}
            "#,
            IDENTITY_COLUMNS
        ))
        .bind(address)
        .fetch_optional(&self.pool)
        .await?;

        Ok(identity)
    }
}
