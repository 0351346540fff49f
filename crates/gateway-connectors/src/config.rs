// config.rs — Per-invocation connector configuration.
//
// One `ConnectorConfig` is attached to each tool definition in a manifest.
// It carries both the fields every connector type understands (url, method,
// headers, timeout) and the mock-only knobs used for tests/demos.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_timeout_seconds() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    pub connector_type: String,
    pub url: Option<String>,
    pub method: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// param/header name → `secret:<name>` reference, resolved against the
    /// invocation's decrypted secrets map just before dispatch.
    #[serde(default)]
    pub secret_refs: HashMap<String, String>,
    /// Connector-local domain allow-list; falls back to the registry's
    /// global default when absent. `Some(vec![])` still denies everything.
    pub allowed_domains: Option<Vec<String>>,

    // mock-only knobs
    pub delay_ms: Option<u64>,
    pub should_fail: Option<bool>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub status_code: Option<u16>,
    pub response_data: Option<Value>,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            connector_type: "mock".to_string(),
            url: None,
            method: None,
            headers: HashMap::new(),
            timeout_seconds: default_timeout_seconds(),
            secret_refs: HashMap::new(),
            allowed_domains: None,
            delay_ms: None,
            should_fail: None,
            error_code: None,
            error_message: None,
            status_code: None,
            response_data: None,
        }
    }
}

/// Resolve a single JSON value against the invocation's decrypted secrets.
///
/// A string of the form `secret:<name>` is replaced with the plaintext
/// value for `<name>`; anything else passes through unchanged. Unresolved
/// references (unknown secret name) pass through as the literal string —
/// connectors never silently send a `secret:` placeholder as if it resolved,
/// but the caller is trusted to have validated referenced secrets exist.
pub fn resolve_param(value: &Value, secrets: &HashMap<String, String>) -> Value {
    match value.as_str() {
        Some(s) => match s.strip_prefix("secret:") {
            Some(name) => secrets
                .get(name)
                .cloned()
                .map(Value::String)
                .unwrap_or_else(|| value.clone()),
            None => value.clone(),
        },
        None => value.clone(),
    }
}

/// Resolve every top-level value of a JSON object against `secrets`;
/// non-object values pass through untouched.
pub fn resolve_all_params(params: &Value, secrets: &HashMap<String, String>) -> Value {
    match params {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_param(v, secrets)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Resolve `config.headers` against `secrets`, applying the same
/// `secret:<name>` convention as params.
pub fn resolve_headers(config: &ConnectorConfig, secrets: &HashMap<String, String>) -> HashMap<String, String> {
    config
        .headers
        .iter()
        .map(|(k, v)| {
            let resolved = match v.strip_prefix("secret:") {
                Some(name) => secrets.get(name).cloned().unwrap_or_else(|| v.clone()),
                None => v.clone(),
            };
            (k.clone(), resolved)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_secret_reference() {
        let mut secrets = HashMap::new();
        secrets.insert("api_key".to_string(), "s3cr3t".to_string());
        let resolved = resolve_param(&json!("secret:api_key"), &secrets);
        assert_eq!(resolved, json!("s3cr3t"));
    }

    #[test]
    fn leaves_non_secret_values_untouched() {
        let secrets = HashMap::new();
        let resolved = resolve_param(&json!(42), &secrets);
        assert_eq!(resolved, json!(42));
    }

    #[test]
    fn resolve_all_params_only_touches_objects() {
        let secrets = HashMap::new();
        let resolved = resolve_all_params(&json!([1, 2, 3]), &secrets);
        assert_eq!(resolved, json!([1, 2, 3]));
    }
}
