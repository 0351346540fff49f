// secret.rs — Authenticated encryption for `Secret.encrypted_value`.
//
// The original service used Fernet (AES-128-CBC + HMAC, versioned token
// format) from `cryptography.fernet`. No Fernet-equivalent crate exists
// anywhere in this workspace's dependency graph, so we substitute
// AES-256-GCM via `ring::aead`, which the workspace already depends on
// `ring` for (Ed25519 signing). The externally-visible property — "fails
// closed if the key is missing, otherwise encrypt/decrypt round-trips
// exactly" — is preserved; the wire format is our own, not Fernet's.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::CryptoError;

/// A loaded secret-encryption key. Immutable after construction — the
/// gateway loads this once from config at process start.
pub struct SecretCipher {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl SecretCipher {
    /// Load a cipher from a raw 32-byte key.
    pub fn from_raw_key(key_bytes: &[u8]) -> Result<Self, CryptoError> {
        if key_bytes.len() != 32 {
            return Err(CryptoError::InvalidKeyLength(key_bytes.len()));
        }
        let unbound = UnboundKey::new(&AES_256_GCM, key_bytes).map_err(|_| CryptoError::AeadFailed)?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// Load a cipher from a base64-encoded 32-byte key, the shape
    /// `gateway_fernet_key` is configured in.
    pub fn from_base64_key(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = STANDARD.decode(encoded)?;
        Self::from_raw_key(&bytes)
    }

    /// Generate a fresh random 32-byte key, base64-encoded — used to seed
    /// `gateway_fernet_key` for a new deployment.
    pub fn generate_key() -> Result<String, CryptoError> {
        let rng = SystemRandom::new();
        let mut key = [0u8; 32];
        rng.fill(&mut key)
            .map_err(|_| CryptoError::RandomUnavailable)?;
        Ok(STANDARD.encode(key))
    }

    /// Encrypt `plaintext`, returning a base64 blob of `nonce || ciphertext || tag`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| CryptoError::RandomUnavailable)?;
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let mut in_out = plaintext.to_vec();
        self.key
            .seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| CryptoError::AeadFailed)?;

        let mut blob = Vec::with_capacity(NONCE_LEN + in_out.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&in_out);
        Ok(STANDARD.encode(blob))
    }

    /// Decrypt a blob produced by [`SecretCipher::encrypt`].
    pub fn decrypt(&self, blob_b64: &str) -> Result<Vec<u8>, CryptoError> {
        let blob = STANDARD.decode(blob_b64)?;
        if blob.len() < NONCE_LEN {
            return Err(CryptoError::AeadFailed);
        }
        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes).map_err(|_| CryptoError::AeadFailed)?;

        let mut in_out = ciphertext.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| CryptoError::AeadFailed)?;
        Ok(plaintext.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> SecretCipher {
        let key = SecretCipher::generate_key().unwrap();
        SecretCipher::from_base64_key(&key).unwrap()
    }

    #[test]
    fn round_trip() {
        let cipher = test_cipher();
        let blob = cipher.encrypt(b"top secret api key").unwrap();
        let plain = cipher.decrypt(&blob).unwrap();
        assert_eq!(plain, b"top secret api key");
    }

    #[test]
    fn ciphertext_differs_per_call() {
        let cipher = test_cipher();
        let a = cipher.encrypt(b"same plaintext").unwrap();
        let b = cipher.encrypt(b"same plaintext").unwrap();
        assert_ne!(a, b, "nonces must differ between calls");
    }

    #[test]
    fn tampered_ciphertext_fails_to_decrypt() {
        let cipher = test_cipher();
        let blob = cipher.encrypt(b"value").unwrap();
        let mut raw = STANDARD.decode(&blob).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;
        let tampered = STANDARD.encode(raw);
        assert!(cipher.decrypt(&tampered).is_err());
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let cipher_a = test_cipher();
        let cipher_b = test_cipher();
        let blob = cipher_a.encrypt(b"value").unwrap();
        assert!(cipher_b.decrypt(&blob).is_err());
    }

    #[test]
    fn rejects_key_of_wrong_length() {
        let result = SecretCipher::from_raw_key(&[0u8; 16]);
        assert!(matches!(result, Err(CryptoError::InvalidKeyLength(16))));
    }
}
