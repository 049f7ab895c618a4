//! Authentication module for MarkChain
//!
//! Provides wallet-based authentication using Ethereum addresses.
//! - Challenge-response authentication with single-use nonces
//! - EIP-191 signature recovery
//! - JWT session issuance and validation

mod challenge;
mod crypto;
mod jwt;
mod service;

pub use challenge::{challenge_message, derive_did, CHALLENGE_PREFIX};
pub use crypto::{
    address_from_key, addresses_match, normalize_address, recover_address,
    sign_personal_message, CryptoError,
};
pub use jwt::{Claims, IssuedToken, JwtError, SessionIssuer};
pub use service::{AuthError, AuthService};
