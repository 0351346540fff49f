// error.rs — Error types for token building and verification.

use thiserror::Error;

/// Errors that can occur while building or verifying a gateway token.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token string did not split into exactly three `.`-separated segments.
    #[error("malformed token: expected 3 segments, found {0}")]
    InvalidFormat(usize),

    /// A segment failed base64url decoding.
    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The header or payload failed to deserialize as JSON.
    #[error("malformed claims: {0}")]
    MalformedClaims(#[from] serde_json::Error),

    /// The header declared an algorithm other than EdDSA.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The payload's `type` claim did not match the kind being verified.
    #[error("wrong token type: expected {expected}, found {found}")]
    WrongType { expected: String, found: String },

    /// The token's `exp` claim is not strictly in the future.
    #[error("token expired")]
    Expired,

    /// Signature verification failed.
    #[error("invalid signature")]
    InvalidSignature,

    /// Underlying crypto failure.
    #[error("crypto error: {0}")]
    Crypto(#[from] gateway_crypto::CryptoError),
}
