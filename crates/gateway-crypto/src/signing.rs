// signing.rs — The gateway's Ed25519 keypair: signs interaction records and
// capability tokens, and backs the public verification endpoint.
//
// `ring::signature::Ed25519KeyPair` is the only asymmetric-signature type
// this workspace depends on (declared in `ta-audit`'s Cargo.toml for audit
// log attestation); we use it here for the same purpose, generalized to
// also sign capability/override/session tokens.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ring::rand::SystemRandom;
use ring::signature::{Ed25519KeyPair, KeyPair, UnparsedPublicKey, ED25519};

use crate::error::CryptoError;

/// The gateway's signing identity — a process-wide singleton constructed
/// once at startup, loaded from persisted PKCS#8 bytes or generated fresh
/// on first boot.
pub struct GatewayKeypair {
    inner: Ed25519KeyPair,
}

impl GatewayKeypair {
    /// Generate a brand-new keypair. Returns the keypair plus its PKCS#8
    /// document, base64-encoded, for the caller to persist out-of-band
    /// (config file, secret store) so the identity survives a restart.
    pub fn generate() -> Result<(Self, String), CryptoError> {
        let rng = SystemRandom::new();
        let pkcs8 =
            Ed25519KeyPair::generate_pkcs8(&rng).map_err(|_| CryptoError::RandomUnavailable)?;
        let keypair =
            Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).map_err(|_| CryptoError::InvalidKeypair)?;
        Ok((Self { inner: keypair }, STANDARD.encode(pkcs8.as_ref())))
    }

    /// Reconstruct a keypair from a base64-encoded PKCS#8 document.
    pub fn from_pkcs8_base64(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = STANDARD.decode(encoded)?;
        let inner =
            Ed25519KeyPair::from_pkcs8(&bytes).map_err(|_| CryptoError::InvalidKeypair)?;
        Ok(Self { inner })
    }

    /// Load the keypair from persisted PKCS#8 bytes, or generate and
    /// return a fresh one if none was persisted yet. The second element of
    /// the tuple is `Some(pkcs8_base64)` exactly when a new keypair was
    /// generated and the caller must persist it.
    pub fn load_or_generate(
        persisted_pkcs8_base64: Option<&str>,
    ) -> Result<(Self, Option<String>), CryptoError> {
        match persisted_pkcs8_base64 {
            Some(encoded) => Ok((Self::from_pkcs8_base64(encoded)?, None)),
            None => {
                let (keypair, pkcs8) = Self::generate()?;
                Ok((keypair, Some(pkcs8)))
            }
        }
    }

    /// Sign `message`, returning the raw signature bytes.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.inner.sign(message).as_ref().to_vec()
    }

    /// The raw public key bytes.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.inner.public_key().as_ref().to_vec()
    }

    /// The public key, base64-encoded — what `GET /capabilities/gateway-key`
    /// hands to offline verifiers.
    pub fn public_key_base64(&self) -> String {
        STANDARD.encode(self.public_key_bytes())
    }
}

/// Verify a signature against an arbitrary (possibly historical, if the
/// gateway key has been rotated) Ed25519 public key.
pub fn verify_signature(
    public_key_bytes: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<(), CryptoError> {
    UnparsedPublicKey::new(&ED25519, public_key_bytes)
        .verify(message, signature)
        .map_err(|_| CryptoError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let (keypair, _) = GatewayKeypair::generate().unwrap();
        let sig = keypair.sign(b"hello gateway");
        verify_signature(&keypair.public_key_bytes(), b"hello gateway", &sig).unwrap();
    }

    #[test]
    fn tampered_message_fails_verification() {
        let (keypair, _) = GatewayKeypair::generate().unwrap();
        let sig = keypair.sign(b"hello gateway");
        let result = verify_signature(&keypair.public_key_bytes(), b"goodbye gateway", &sig);
        assert!(result.is_err());
    }

    #[test]
    fn wrong_public_key_fails_verification() {
        let (keypair_a, _) = GatewayKeypair::generate().unwrap();
        let (keypair_b, _) = GatewayKeypair::generate().unwrap();
        let sig = keypair_a.sign(b"hello gateway");
        let result = verify_signature(&keypair_b.public_key_bytes(), b"hello gateway", &sig);
        assert!(result.is_err());
    }

    #[test]
    fn generate_then_persist_then_reload_is_stable() {
        let (keypair, pkcs8) = GatewayKeypair::generate().unwrap();
        let reloaded = GatewayKeypair::from_pkcs8_base64(&pkcs8).unwrap();
        assert_eq!(keypair.public_key_bytes(), reloaded.public_key_bytes());
    }

    #[test]
    fn load_or_generate_generates_when_absent() {
        let (_, persisted) = GatewayKeypair::load_or_generate(None).unwrap();
        assert!(persisted.is_some());
    }

    #[test]
    fn load_or_generate_loads_when_present() {
        let (_, pkcs8) = GatewayKeypair::generate().unwrap();
        let (_, persisted) = GatewayKeypair::load_or_generate(Some(&pkcs8)).unwrap();
        assert!(persisted.is_none());
    }
}
