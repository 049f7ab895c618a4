//! Canonical challenge text and DID derivation
//!
//! Both sides of the handshake must render byte-identical text, so every
//! caller goes through [`challenge_message`].

/// Application prefix bound into every challenge
pub const CHALLENGE_PREFIX: &str = "Sign this message to authenticate with MarkChain.";

/// DID method used for wallet identities
pub const DID_METHOD_PREFIX: &str = "did:ethr:";

/// Render the text a wallet holder signs for `nonce`
///
/// `address` must already be normalized (lower-cased).
pub fn challenge_message(nonce: &str, address: &str) -> String {
    format!(
        "{}\n\nNonce: {}\nWallet: {}",
        CHALLENGE_PREFIX, nonce, address
    )
}

/// Derive the decentralized identifier for a normalized address
pub fn derive_did(address: &str) -> String {
    format!("{}{}", DID_METHOD_PREFIX, address)
}
