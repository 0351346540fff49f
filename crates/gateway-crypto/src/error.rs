// error.rs — Error types for the crypto subsystem.
//
// Every failure here is deliberately opaque about *why* (no "wrong salt
// length" vs "wrong iteration count" detail) so callers can't use error
// messages as a side channel during verification.

use thiserror::Error;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// A password/API-key hash failed to verify against its claimed value.
    #[error("hash verification failed")]
    VerificationFailed,

    /// A stored hash string was not in the expected `pbkdf2$...` format.
    #[error("malformed password hash")]
    MalformedHash,

    /// Secret encryption/decryption was attempted without a configured key.
    #[error("no secret-encryption key configured")]
    MissingEncryptionKey,

    /// Authenticated encryption or decryption failed (tampered ciphertext,
    /// wrong key, or malformed blob).
    #[error("authenticated encryption operation failed")]
    AeadFailed,

    /// The configured encryption key was not 32 raw bytes.
    #[error("secret-encryption key must decode to 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    /// Base64 decoding failed.
    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Ed25519 keypair construction failed (malformed PKCS#8 document).
    #[error("invalid Ed25519 keypair material")]
    InvalidKeypair,

    /// Signature verification failed.
    #[error("signature verification failed")]
    InvalidSignature,

    /// Random number generation failed (should not happen in practice).
    #[error("secure random generation failed")]
    RandomUnavailable,
}
