//! Authentication service
//!
//! Core business logic for the wallet challenge-response handshake.

use chrono::{Duration, Utc};
use std::sync::Arc;
use thiserror::Error;

use crate::models::{AuthTokenResponse, ChallengeResponse, Identity, IdentitySummary};
use crate::store::{IdentityStore, NonceStore, StoreError};

use super::challenge::{challenge_message, derive_did};
use super::crypto::{addresses_match, normalize_address, recover_address, CryptoError};
use super::jwt::{Claims, JwtError, SessionIssuer};

/// Auth service errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("Invalid signature format: {0}")]
    InvalidSignatureFormat(String),

    #[error("Recovered signer does not match the claimed address")]
    SignatureMismatch,

    #[error("Nonce not found, mismatched or expired")]
    InvalidOrExpiredNonce,

    #[error("Identity is deactivated")]
    IdentityInactive,

    #[error("Identity not found")]
    IdentityNotFound,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    TokenInvalid(String),

    #[error("Token issuance failed: {0}")]
    TokenIssue(String),

    #[error("Storage error: {0}")]
    Store(String),
}

impl AuthError {
    /// Stable name of the error kind, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::InvalidAddress(_) => "invalid_address",
            AuthError::InvalidSignatureFormat(_) => "invalid_signature_format",
            AuthError::SignatureMismatch => "signature_mismatch",
            AuthError::InvalidOrExpiredNonce => "invalid_or_expired_nonce",
            AuthError::IdentityInactive => "identity_inactive",
            AuthError::IdentityNotFound => "identity_not_found",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenInvalid(_) => "token_invalid",
            AuthError::TokenIssue(_) => "token_issue",
            AuthError::Store(_) => "store",
        }
    }

    /// Outcome failures that must not be distinguished to the caller
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            AuthError::SignatureMismatch
                | AuthError::InvalidOrExpiredNonce
                | AuthError::IdentityInactive
        )
    }
}

impl From<CryptoError> for AuthError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::InvalidAddress(msg) => AuthError::InvalidAddress(msg),
            CryptoError::InvalidSignatureFormat(msg) => AuthError::InvalidSignatureFormat(msg),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::TokenExpired => AuthError::TokenExpired,
            JwtError::TokenInvalid(msg) => AuthError::TokenInvalid(msg),
            JwtError::EncodingFailed(msg) => AuthError::TokenIssue(msg),
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        AuthError::Store(e.to_string())
    }
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    identities: Arc<dyn IdentityStore>,
    nonces: Arc<dyn NonceStore>,
    sessions: SessionIssuer,
    nonce_ttl: Duration,
}

impl AuthService {
    /// Create a new AuthService
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        nonces: Arc<dyn NonceStore>,
        sessions: SessionIssuer,
        nonce_ttl_seconds: i64,
    ) -> Self {
        Self {
            identities,
            nonces,
            sessions,
            nonce_ttl: Duration::seconds(nonce_ttl_seconds),
        }
    }

    /// Issue a challenge for `wallet_address` to sign
    ///
    /// Replaces any challenge already pending for the address. Never creates an
    /// identity.
    pub async fn request_challenge(
        &self,
        wallet_address: &str,
    ) -> Result<ChallengeResponse, AuthError> {
        let address = normalize_address(wallet_address)?;

        let issued = self.nonces.issue(&address, self.nonce_ttl).await?;
        let message = challenge_message(&issued.nonce, &address);

        tracing::debug!(wallet = %address, expires_at = %issued.expires_at, "Challenge issued");

        Ok(ChallengeResponse {
            nonce: issued.nonce,
            message,
            expires_at: issued.expires_at,
        })
    }

    /// Verify a signed challenge and mint a session token
    pub async fn verify_challenge(
        &self,
        wallet_address: &str,
        signature: &str,
        nonce: &str,
    ) -> Result<AuthTokenResponse, AuthError> {
        let address = normalize_address(wallet_address)?;

        let message = challenge_message(nonce, &address);
        let recovered = recover_address(&message, signature)?;

        if !addresses_match(&recovered, &address) {
            return Err(AuthError::SignatureMismatch);
        }

        if !self.nonces.consume(&address, nonce).await? {
            return Err(AuthError::InvalidOrExpiredNonce);
        }

        let existing = self.identities.find_by_address(&address).await?;
        if existing.as_ref().is_some_and(|identity| !identity.is_active) {
            return Err(AuthError::IdentityInactive);
        }

        let now = Utc::now();
        let mut candidate = Identity::new(address.clone(), derive_did(&address), now);
        candidate.last_login = Some(now);
        let identity = self.identities.upsert(&candidate).await?;

        let issued = self.sessions.issue(&identity)?;

        tracing::info!(
            wallet = %identity.wallet_address,
            did = %identity.did,
            role = %identity.role,
            first_login = existing.is_none(),
            "Wallet authenticated"
        );

        Ok(AuthTokenResponse {
            access_token: issued.token,
            token_type: "Bearer".to_string(),
            expires_in: self.sessions.ttl_seconds(),
            user: IdentitySummary::from(&identity),
        })
    }

    /// Validate a presented bearer token
    pub fn authenticate(&self, token: &str) -> Result<Claims, AuthError> {
        Ok(self.sessions.verify(token)?)
    }

    /// Validate a bearer token against the stored identity behind it
    ///
    /// An identity that is gone or deactivated fails like any other
    /// authentication outcome. The returned claims carry the stored role, so a
    /// role change applies to sessions already open.
    pub async fn authorize(&self, token: &str) -> Result<(Claims, Identity), AuthError> {
        let mut claims = self.authenticate(token)?;

        let identity = self.current_identity(&claims).await.map_err(|e| match e {
            AuthError::IdentityNotFound => AuthError::IdentityInactive,
            other => other,
        })?;

        if claims.role != identity.role {
            tracing::debug!(
                wallet = %identity.wallet_address,
                token_role = %claims.role,
                role = %identity.role,
                "Session role superseded by stored role"
            );
            claims.role = identity.role;
        }

        Ok((claims, identity))
    }

    /// Load the active identity behind a set of claims
    pub async fn current_identity(&self, claims: &Claims) -> Result<Identity, AuthError> {
        self.identities
            .find_by_address(&claims.wallet)
            .await?
            .filter(|identity| identity.is_active)
            .ok_or(AuthError::IdentityNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::crypto::{address_from_key, sign_personal_message};
    use crate::models::UserRole;
    use crate::store::MemoryStore;
    use k256::ecdsa::SigningKey;
    use rand::rngs::OsRng;

    fn service(store: &MemoryStore, nonce_ttl_seconds: i64) -> AuthService {
        AuthService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            SessionIssuer::new("test-secret-key", 900),
            nonce_ttl_seconds,
        )
    }

    #[tokio::test]
    async fn test_challenge_rejects_malformed_address_without_mutation() {
        let store = MemoryStore::new();
        let auth = service(&store, 300);

        let result = auth.request_challenge("not-an-address").await;
        assert!(matches!(result, Err(AuthError::InvalidAddress(_))));
        assert!(store.pending_nonce("not-an-address").await.is_none());
    }

    #[tokio::test]
    async fn test_challenge_does_not_create_identity() {
        let store = MemoryStore::new();
        let auth = service(&store, 300);
        let key = SigningKey::random(&mut OsRng);
        let address = address_from_key(key.verifying_key());

        auth.request_challenge(&address).await.unwrap();
        assert_eq!(store.identity_count().await, 0);
    }

    #[tokio::test]
    async fn test_expired_nonce_rejected() {
        let store = MemoryStore::new();
        let auth = service(&store, 0);
        let key = SigningKey::random(&mut OsRng);
        let address = address_from_key(key.verifying_key());

        let challenge = auth.request_challenge(&address).await.unwrap();
        let signature = sign_personal_message(&key, &challenge.message).unwrap();

        let result = auth
            .verify_challenge(&address, &signature, &challenge.nonce)
            .await;
        assert!(matches!(result, Err(AuthError::InvalidOrExpiredNonce)));
    }

    #[tokio::test]
    async fn test_mismatched_signer_keeps_nonce() {
        let store = MemoryStore::new();
        let auth = service(&store, 300);
        let key = SigningKey::random(&mut OsRng);
        let address = address_from_key(key.verifying_key());
        let intruder = SigningKey::random(&mut OsRng);

        let challenge = auth.request_challenge(&address).await.unwrap();
        let forged = sign_personal_message(&intruder, &challenge.message).unwrap();

        let result = auth.verify_challenge(&address, &forged, &challenge.nonce).await;
        assert!(matches!(result, Err(AuthError::SignatureMismatch)));

        // the legitimate holder can still complete the handshake
        let signature = sign_personal_message(&key, &challenge.message).unwrap();
        assert!(auth
            .verify_challenge(&address, &signature, &challenge.nonce)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_deactivated_identity_cannot_authenticate() {
        let store = MemoryStore::new();
        let auth = service(&store, 300);
        let key = SigningKey::random(&mut OsRng);
        let address = address_from_key(key.verifying_key());

        let challenge = auth.request_challenge(&address).await.unwrap();
        let signature = sign_personal_message(&key, &challenge.message).unwrap();
        auth.verify_challenge(&address, &signature, &challenge.nonce)
            .await
            .unwrap();

        store.deactivate(&address).await.unwrap();

        let challenge = auth.request_challenge(&address).await.unwrap();
        let signature = sign_personal_message(&key, &challenge.message).unwrap();
        let result = auth
            .verify_challenge(&address, &signature, &challenge.nonce)
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, AuthError::IdentityInactive));
        assert!(err.is_authentication_failure());
    }

    #[tokio::test]
    async fn test_authenticate_and_load_identity() {
        let store = MemoryStore::new();
        let auth = service(&store, 300);
        let key = SigningKey::random(&mut OsRng);
        let address = address_from_key(key.verifying_key());

        let challenge = auth.request_challenge(&address).await.unwrap();
        let signature = sign_personal_message(&key, &challenge.message).unwrap();
        let tokens = auth
            .verify_challenge(&address, &signature, &challenge.nonce)
            .await
            .unwrap();

        let claims = auth.authenticate(&tokens.access_token).unwrap();
        assert_eq!(claims.role, UserRole::Student);

        let identity = auth.current_identity(&claims).await.unwrap();
        assert_eq!(identity.did, claims.did);
        assert!(identity.last_login.is_some());
    }

    #[test]
    fn test_error_classification() {
        assert!(AuthError::SignatureMismatch.is_authentication_failure());
        assert!(AuthError::InvalidOrExpiredNonce.is_authentication_failure());
        assert!(!AuthError::InvalidAddress("x".into()).is_authentication_failure());
        assert!(!AuthError::InvalidSignatureFormat("x".into()).is_authentication_failure());
        assert_eq!(AuthError::TokenExpired.kind(), "token_expired");
    }

    #[tokio::test]
    async fn test_authorize_follows_stored_identity() {
        let store = MemoryStore::new();
        let auth = service(&store, 300);
        let key = SigningKey::random(&mut OsRng);
        let address = address_from_key(key.verifying_key());

        let challenge = auth.request_challenge(&address).await.unwrap();
        let signature = sign_personal_message(&key, &challenge.message).unwrap();
        let tokens = auth
            .verify_challenge(&address, &signature, &challenge.nonce)
            .await
            .unwrap();

        let (claims, identity) = auth.authorize(&tokens.access_token).await.unwrap();
        assert_eq!(claims.role, UserRole::Student);
        assert_eq!(identity.wallet_address, address);

        store.set_role(&address, UserRole::Admin).await.unwrap();
        let (claims, _) = auth.authorize(&tokens.access_token).await.unwrap();
        assert_eq!(claims.role, UserRole::Admin);

        store.deactivate(&address).await.unwrap();
        let err = auth.authorize(&tokens.access_token).await.unwrap_err();
        assert!(matches!(err, AuthError::IdentityInactive));
        assert!(err.is_authentication_failure());
    }
}
