//! Session token issuance and validation
//!
//! Sessions are HS256 JWTs carrying a closed set of identity claims.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Identity, UserRole};

/// JWT-related errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum JwtError {
    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    TokenInvalid(String),
}

/// JWT claims for session tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (the identity's DID)
    pub sub: String,
    /// Wallet address, lower-cased
    pub wallet: String,
    /// Decentralized identifier
    pub did: String,
    pub role: UserRole,
    /// JWT ID
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// A freshly minted session token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
    pub expires_at: DateTime<Utc>,
}

/// Mints and validates session tokens
#[derive(Clone)]
pub struct SessionIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_seconds: i64,
}

impl SessionIssuer {
    /// Create an issuer signing with `secret`
    pub fn new(secret: &str, ttl_seconds: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_seconds,
        }
    }

    /// Token lifetime in seconds
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Mint a token for `identity`, valid from now
    pub fn issue(&self, identity: &Identity) -> Result<IssuedToken, JwtError> {
        self.issue_at(identity, Utc::now())
    }

    /// Mint a token for `identity` as if issued at `now`
    pub fn issue_at(&self, identity: &Identity, now: DateTime<Utc>) -> Result<IssuedToken, JwtError> {
        let expires_at = now + Duration::seconds(self.ttl_seconds);

        let claims = Claims {
            sub: identity.did.clone(),
            wallet: identity.wallet_address.clone(),
            did: identity.did.clone(),
            role: identity.role,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))?;

        Ok(IssuedToken {
            token,
            claims,
            expires_at,
        })
    }

    /// Verify a presented token against the current time
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verify a presented token as of Unix time `now`
    ///
    /// The token is rejected with [`JwtError::TokenExpired`] once `now >= exp`.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // expiry is checked below against the caller's clock, without leeway
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::TokenExpired,
                _ => JwtError::TokenInvalid(e.to_string()),
            })?
            .claims;

        if now >= claims.exp {
            return Err(JwtError::TokenExpired);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_identity() -> Identity {
        Identity::new(
            "0xabc0000000000000000000000000000000000123".to_string(),
            "did:ethr:0xabc0000000000000000000000000000000000123".to_string(),
            Utc::now(),
        )
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = SessionIssuer::new("test-secret-key", 900);
        let identity = create_test_identity();

        let issued = issuer.issue(&identity).unwrap();
        assert!(!issued.token.is_empty());

        let claims = issuer.verify(&issued.token).unwrap();
        assert_eq!(claims.sub, identity.did);
        assert_eq!(claims.wallet, identity.wallet_address);
        assert_eq!(claims.role, UserRole::Student);
        assert_eq!(claims.exp - claims.iat, 900);
        assert_eq!(claims, issued.claims);
    }

    #[test]
    fn test_expiry_boundary() {
        let issuer = SessionIssuer::new("test-secret-key", 60);
        let identity = create_test_identity();
        let now = Utc::now();

        let issued = issuer.issue_at(&identity, now).unwrap();
        let exp = issued.claims.exp;

        assert!(issuer.verify_at(&issued.token, exp - 1).is_ok());
        assert_eq!(
            issuer.verify_at(&issued.token, exp),
            Err(JwtError::TokenExpired)
        );
        assert_eq!(
            issuer.verify_at(&issued.token, exp + 3600),
            Err(JwtError::TokenExpired)
        );
    }

    #[test]
    fn test_token_issued_in_past_is_expired() {
        let issuer = SessionIssuer::new("test-secret-key", 60);
        let identity = create_test_identity();

        let issued = issuer
            .issue_at(&identity, Utc::now() - Duration::hours(2))
            .unwrap();
        assert_eq!(issuer.verify(&issued.token), Err(JwtError::TokenExpired));
    }

    #[test]
    fn test_invalid_token() {
        let issuer = SessionIssuer::new("test-secret-key", 900);
        assert!(matches!(
            issuer.verify("invalid.token.here"),
            Err(JwtError::TokenInvalid(_))
        ));
    }

    #[test]
    fn test_wrong_secret() {
        let identity = create_test_identity();
        let issued = SessionIssuer::new("secret1", 900).issue(&identity).unwrap();

        let result = SessionIssuer::new("secret2", 900).verify(&issued.token);
        assert!(matches!(result, Err(JwtError::TokenInvalid(_))));
    }
}
