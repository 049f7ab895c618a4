//! Ethereum wallet signature recovery
//!
//! Recovers the signer of an EIP-191 `personal_sign` message.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};
use thiserror::Error;

/// Errors that can occur while handling addresses and signatures
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("Invalid signature format: {0}")]
    InvalidSignatureFormat(String),
}

/// Validate an Ethereum address and return it lower-cased
///
/// Accepts `0x` followed by exactly 40 hex digits in any case.
pub fn normalize_address(address: &str) -> Result<String, CryptoError> {
    let trimmed = address.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| CryptoError::InvalidAddress("address must start with 0x".to_string()))?;

    if hex_part.len() != 40 {
        return Err(CryptoError::InvalidAddress(format!(
            "expected 40 hex digits, got {}",
            hex_part.len()
        )));
    }

    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CryptoError::InvalidAddress(
            "address contains non-hex characters".to_string(),
        ));
    }

    Ok(format!("0x{}", hex_part.to_ascii_lowercase()))
}

/// Recover the address that signed `message` under EIP-191
///
/// # Arguments
/// * `message` - The exact text that was signed
/// * `signature` - Hex `r || s || v` (65 bytes), `0x` prefix optional
///
/// # Returns
/// The lower-cased `0x` address of the signer
pub fn recover_address(message: &str, signature: &str) -> Result<String, CryptoError> {
    let sig_hex = signature.trim();
    let sig_hex = sig_hex.strip_prefix("0x").unwrap_or(sig_hex);
    let sig_bytes = hex::decode(sig_hex)
        .map_err(|e| CryptoError::InvalidSignatureFormat(format!("invalid hex: {}", e)))?;

    if sig_bytes.len() != 65 {
        return Err(CryptoError::InvalidSignatureFormat(format!(
            "expected 65 bytes, got {}",
            sig_bytes.len()
        )));
    }

    let (rs, v) = sig_bytes.split_at(64);
    let recovery_id = match v[0] {
        0 | 27 => RecoveryId::new(false, false),
        1 | 28 => RecoveryId::new(true, false),
        other => {
            return Err(CryptoError::InvalidSignatureFormat(format!(
                "invalid recovery id: {}",
                other
            )))
        }
    };

    let signature = Signature::from_slice(rs)
        .map_err(|e| CryptoError::InvalidSignatureFormat(e.to_string()))?;

    let digest = keccak256(eip191_message(message).as_bytes());

    let verifying_key = VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id)
        .map_err(|e| CryptoError::InvalidSignatureFormat(format!("recovery failed: {}", e)))?;

    Ok(address_from_key(&verifying_key))
}

/// Derive the lower-cased Ethereum address of a public key
pub fn address_from_key(key: &VerifyingKey) -> String {
    // last 20 bytes of keccak256 over the uncompressed point without its 0x04 tag
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

/// Case-insensitive address comparison
pub fn addresses_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

fn eip191_message(message: &str) -> String {
    format!("\x19Ethereum Signed Message:\n{}{}", message.len(), message)
}

fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Sign `message` the way a wallet's `personal_sign` does
///
/// Used by tests and local tooling to produce signatures for a known key.
pub fn sign_personal_message(
    key: &k256::ecdsa::SigningKey,
    message: &str,
) -> Result<String, CryptoError> {
    let digest = keccak256(eip191_message(message).as_bytes());
    let (signature, recovery_id) = key
        .sign_prehash_recoverable(&digest)
        .map_err(|e| CryptoError::InvalidSignatureFormat(e.to_string()))?;

    let mut bytes = Vec::with_capacity(65);
    bytes.extend_from_slice(&signature.to_bytes());
    bytes.push(recovery_id.to_byte() + 27);

    Ok(format!("0x{}", hex::encode(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;
    use rand::rngs::OsRng;

    #[test]
    fn test_keccak256_known_vector() {
        let hash = keccak256(b"hello world");
        assert_eq!(
            hex::encode(hash),
            "47173285a8d7341e5e972fc677286384f802f8ef42a5ec5f03bbfa254cb01fad"
        );
    }

    #[test]
    fn test_eip191_prefix() {
        assert_eq!(
            eip191_message("Hello, Ethereum!"),
            "\x19Ethereum Signed Message:\n16Hello, Ethereum!"
        );
    }

    #[test]
    fn test_normalize_address() {
        let address = "0xAbCdEf0123456789aBcDeF0123456789AbCdEf01";
        assert_eq!(
            normalize_address(address).unwrap(),
            "0xabcdef0123456789abcdef0123456789abcdef01"
        );
        assert_eq!(
            normalize_address("  0X00000000000000000000000000000000000000FF ").unwrap(),
            "0x00000000000000000000000000000000000000ff"
        );
    }

    #[test]
    fn test_normalize_rejects_malformed() {
        for bad in [
            "",
            "abcdef0123456789abcdef0123456789abcdef01",
            "0x1234",
            "0xZZcdef0123456789abcdef0123456789abcdef01",
            "0xabcdef0123456789abcdef0123456789abcdef0123",
        ] {
            assert!(
                matches!(normalize_address(bad), Err(CryptoError::InvalidAddress(_))),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_sign_and_recover() {
        let key = SigningKey::random(&mut OsRng);
        let expected = address_from_key(key.verifying_key());

        let signature = sign_personal_message(&key, "test message for signing").unwrap();
        let recovered = recover_address("test message for signing", &signature).unwrap();

        assert_eq!(recovered, expected);
    }

    #[test]
    fn test_recover_accepts_unprefixed_and_raw_v() {
        let key = SigningKey::random(&mut OsRng);
        let expected = address_from_key(key.verifying_key());

        let signature = sign_personal_message(&key, "hello").unwrap();
        let mut bytes = hex::decode(&signature[2..]).unwrap();
        bytes[64] -= 27;

        let recovered = recover_address("hello", &hex::encode(bytes)).unwrap();
        assert_eq!(recovered, expected);
    }

    #[test]
    fn test_recover_different_message_gives_different_address() {
        let key = SigningKey::random(&mut OsRng);
        let expected = address_from_key(key.verifying_key());

        let signature = sign_personal_message(&key, "message one").unwrap();
        // Recovery still yields *some* key, just not the signer's
        if let Ok(recovered) = recover_address("message two", &signature) {
            assert_ne!(recovered, expected);
        }
    }

    #[test]
    fn test_recover_rejects_malformed_signature() {
        assert!(matches!(
            recover_address("hi", "0xnothex"),
            Err(CryptoError::InvalidSignatureFormat(_))
        ));
        assert!(matches!(
            recover_address("hi", "0x1234"),
            Err(CryptoError::InvalidSignatureFormat(_))
        ));

        let mut bad_v = vec![1u8; 65];
        bad_v[64] = 5;
        assert!(matches!(
            recover_address("hi", &hex::encode(bad_v)),
            Err(CryptoError::InvalidSignatureFormat(_))
        ));

        // r = s = 0 is not a valid signature scalar
        assert!(matches!(
            recover_address("hi", &hex::encode([0u8; 65])),
            Err(CryptoError::InvalidSignatureFormat(_))
        ));
    }

    #[test]
    fn test_addresses_match_ignores_case() {
        assert!(addresses_match(
            "0xABCDEF0123456789abcdef0123456789abcdef01",
            "0xabcdef0123456789ABCDEF0123456789ABCDEF01"
        ));
        assert!(!addresses_match(
            "0xabcdef0123456789abcdef0123456789abcdef01",
            "0xabcdef0123456789abcdef0123456789abcdef02"
        ));
    }
}
