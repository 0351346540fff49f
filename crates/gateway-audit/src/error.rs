// error.rs — Error types for the audit subsystem.

use thiserror::Error;

/// Errors that can occur while sealing or reading interaction records.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("failed to open audit store at {path}: {source}")]
    OpenFailed {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("canonicalization error: {0}")]
    Canon(#[from] gateway_canon::CanonError),

    #[error("crypto error: {0}")]
    Crypto(#[from] gateway_crypto::CryptoError),

    #[error("no such interaction record: {0}")]
    NotFound(String),
}
