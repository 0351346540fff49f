// password.rs — Adaptive password / API-key hashing.
//
// The original service used bcrypt (passlib). No bcrypt or argon2 crate
// appears anywhere in this workspace's dependency graph, so we build the
// same "adaptive work-factor hash with embedded salt" property on top of
// `ring::pbkdf2`, which the workspace already depends on for Ed25519
// signing. Iteration count and salt travel with the hash so the work
// factor can be raised later without invalidating stored hashes.

use std::num::NonZeroU32;

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use ring::rand::{SecureRandom, SystemRandom};
use ring::pbkdf2;

use crate::error::CryptoError;

const CREDENTIAL_LEN: usize = 32;
const SALT_LEN: usize = 16;
const DEFAULT_ITERATIONS: u32 = 210_000;
const ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

/// Hash a plaintext password or API key.
///
/// Returns a self-describing string of the form
/// `pbkdf2$<iterations>$<salt-b64>$<hash-b64>`, analogous to the
/// `$2b$<cost>$<salt><hash>` shape bcrypt produces.
pub fn hash_password(plaintext: &str) -> Result<String, CryptoError> {
    hash_password_with_iterations(plaintext, DEFAULT_ITERATIONS)
}

fn hash_password_with_iterations(plaintext: &str, iterations: u32) -> Result<String, CryptoError> {
    let rng = SystemRandom::new();
    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt)
        .map_err(|_| CryptoError::RandomUnavailable)?;

    let mut out = [0u8; CREDENTIAL_LEN];
    let iterations_nz = NonZeroU32::new(iterations).expect("iterations must be nonzero");
    pbkdf2::derive(ALGORITHM, iterations_nz, &salt, plaintext.as_bytes(), &mut out);

    Ok(format!(
        "pbkdf2${}${}${}",
        iterations,
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(out)
    ))
}

/// Verify a plaintext candidate against a stored hash produced by
/// [`hash_password`]. Constant-time; never reveals *which* part of the
/// comparison failed.
pub fn verify_password(plaintext: &str, stored: &str) -> Result<(), CryptoError> {
    let mut parts = stored.split('$');
    let scheme = parts.next().ok_or(CryptoError::MalformedHash)?;
    if scheme != "pbkdf2" {
        return Err(CryptoError::MalformedHash);
    }
    let iterations: u32 = parts
        .next()
        .ok_or(CryptoError::MalformedHash)?
        .parse()
        .map_err(|_| CryptoError::MalformedHash)?;
    let salt = STANDARD_NO_PAD
        .decode(parts.next().ok_or(CryptoError::MalformedHash)?)
        .map_err(|_| CryptoError::MalformedHash)?;
    let expected = STANDARD_NO_PAD
        .decode(parts.next().ok_or(CryptoError::MalformedHash)?)
        .map_err(|_| CryptoError::MalformedHash)?;
    if parts.next().is_some() {
        return Err(CryptoError::MalformedHash);
    }

    let iterations_nz = NonZeroU32::new(iterations).ok_or(CryptoError::MalformedHash)?;
    pbkdf2::verify(ALGORITHM, iterations_nz, &salt, plaintext.as_bytes(), &expected)
        .map_err(|_| CryptoError::VerificationFailed)
}

/// Generate a random API key in the `uapk_<32 hex chars>` shape and return
/// both the full plaintext key and its lookup prefix (first 12 characters,
/// used to narrow a key_hash scan without ever storing the plaintext).
pub fn generate_api_key() -> Result<(String, String), CryptoError> {
    let rng = SystemRandom::new();
    let mut raw = [0u8; 16];
    rng.fill(&mut raw)
        .map_err(|_| CryptoError::RandomUnavailable)?;
    let hex: String = raw.iter().map(|b| format!("{:02x}", b)).collect();
    let key = format!("uapk_{}", hex);
    let prefix = key.chars().take(12).collect();
    Ok((key, prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_verify_succeeds() {
        let hash = hash_password_with_iterations("correct horse battery staple", 1_000).unwrap();
        verify_password("correct horse battery staple", &hash).unwrap();
    }

    #[test]
    fn wrong_password_fails() {
        let hash = hash_password_with_iterations("correct horse battery staple", 1_000).unwrap();
        let result = verify_password("incorrect", &hash);
        assert!(matches!(result, Err(CryptoError::VerificationFailed)));
    }

    #[test]
    fn same_plaintext_hashes_differently_each_time() {
        let a = hash_password_with_iterations("same-password", 1_000).unwrap();
        let b = hash_password_with_iterations("same-password", 1_000).unwrap();
        assert_ne!(a, b, "salts must differ between calls");
    }

    #[test]
    fn malformed_hash_is_rejected() {
        let result = verify_password("x", "not-a-valid-hash");
        assert!(matches!(result, Err(CryptoError::MalformedHash)));
    }

    #[test]
    fn api_key_has_expected_shape() {
        let (key, prefix) = generate_api_key().unwrap();
        assert!(key.starts_with("uapk_"));
        assert_eq!(key.len(), "uapk_".len() + 32);
        assert_eq!(prefix, key[..12]);
    }

    #[test]
    fn api_keys_are_unique() {
        let (a, _) = generate_api_key().unwrap();
        let (b, _) = generate_api_key().unwrap();
        assert_ne!(a, b);
    }
}
