// error.rs — Error types for stores and the action gateway pipeline.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0} already exists")]
    Conflict(String),

    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("{0}")]
    Validation(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] gateway_crypto::CryptoError),

    #[error("token error: {0}")]
    Token(#[from] gateway_capability::TokenError),

    #[error("audit error: {0}")]
    Audit(#[from] gateway_audit::AuditError),

    #[error("canonicalization error: {0}")]
    Canon(#[from] gateway_canon::CanonError),

    #[error("connector error: {0}")]
    Connector(#[from] gateway_connectors::ConnectorError),

    /// The bearer credential presented to the pipeline is unusable —
    /// malformed, unsigned by a trusted key, expired, revoked, or over its
    /// action limit. Always maps to `401` at the HTTP boundary; no
    /// interaction record is attributable (no confirmed `org_id`).
    #[error("authentication failed: {0}")]
    Authentication(String),
}
