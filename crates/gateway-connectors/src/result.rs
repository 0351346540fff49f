// result.rs — The uniform shape every connector hands back to the pipeline.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Machine-readable error detail attached to a failed connector invocation.
///
/// `code` is one of the connector error taxonomy values:
/// `DOMAIN_NOT_ALLOWED`, `TIMEOUT`, `REQUEST_ERROR`, `HTTP_<status>`,
/// `UNKNOWN_ERROR`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectorErrorDetail {
    pub code: String,
    pub message: String,
}

/// The result of one connector invocation.
///
/// A connector never propagates a Rust `Err` out of `execute` — failure is
/// data, not control flow, so the pipeline can seal a record for the attempt
/// either way (spec: a connector failure still yields `decision=approved`,
/// the failure lives in `result`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ConnectorErrorDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_hash: Option<String>,
}

impl ConnectorResult {
    pub fn success(data: Value, status_code: Option<u16>, duration_ms: u64) -> Self {
        let result_hash = gateway_canon::canonical_hash(&data).ok();
        Self {
            success: true,
            data: Some(data),
            error: None,
            status_code,
            duration_ms,
            result_hash,
        }
    }

    pub fn failure(code: impl Into<String>, message: impl Into<String>, status_code: Option<u16>, duration_ms: u64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ConnectorErrorDetail {
                code: code.into(),
                message: message.into(),
            }),
            status_code,
            duration_ms,
            result_hash: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_result_carries_a_hash() {
        let result = ConnectorResult::success(json!({"ok": true}), Some(200), 12);
        assert!(result.success);
        assert!(result.result_hash.is_some());
        assert!(result.error.is_none());
    }

    #[test]
    fn failure_result_has_no_hash() {
        let result = ConnectorResult::failure("TIMEOUT", "deadline exceeded", None, 30_000);
        assert!(!result.success);
        assert!(result.result_hash.is_none());
        assert_eq!(result.error.unwrap().code, "TIMEOUT");
    }
}
