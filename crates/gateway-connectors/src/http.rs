// http.rs — Arbitrary-method HTTP connector with URL templating and a
// fail-closed domain allow-list.
//
// `_validate_url`-equivalent: the host is parsed out of the URL, the port is
// stripped, and it is matched case-insensitively against the allow-list
// either exactly or as a subdomain (`api.example.com` matches
// `example.com`). An empty allow-list denies every URL — there is no way to
// reach "allow everything" by omission.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde_json::{Map, Value};

use crate::config::{resolve_headers, resolve_param, ConnectorConfig};
use crate::error::ConnectorError;
use crate::result::ConnectorResult;

#[derive(Debug, Clone)]
pub struct GenericHttpConnector {
    config: ConnectorConfig,
    allowed_domains: Vec<String>,
    client: Client,
}

impl GenericHttpConnector {
    pub fn new(config: ConnectorConfig, default_allowed_domains: &[String]) -> Result<Self, ConnectorError> {
        if config.url.is_none() {
            return Err(ConnectorError::MissingUrl {
                connector_type: "generic-http".to_string(),
            });
        }
        let allowed_domains = config
            .allowed_domains
            .clone()
            .unwrap_or_else(|| default_allowed_domains.to_vec());
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            config,
            allowed_domains,
            client,
        })
    }

    pub async fn execute(&self, params: &Value, secrets: &HashMap<String, String>) -> ConnectorResult {
        let start = Instant::now();
        let template = self.config.url.as_deref().expect("validated at construction");
        let (url, consumed) = build_url(template, params);

        if !domain_allowed(&url, &self.allowed_domains) {
            return ConnectorResult::failure(
                "DOMAIN_NOT_ALLOWED",
                format!("url does not match any allowed domain: {url}"),
                None,
                start.elapsed().as_millis() as u64,
            );
        }

        let method = self
            .config
            .method
            .as_deref()
            .unwrap_or("GET")
            .to_ascii_uppercase();
        let headers = resolve_headers(&self.config, secrets);

        let remaining: Map<String, Value> = match params {
            Value::Object(map) => map
                .iter()
                .filter(|(k, _)| !consumed.contains(k.as_str()))
                .map(|(k, v)| (k.clone(), resolve_param(v, secrets)))
                .collect(),
            _ => Map::new(),
        };

        let mut request = match method.as_str() {
            "GET" | "DELETE" => {
                let query: Vec<(String, String)> = remaining
                    .iter()
                    .map(|(k, v)| (k.clone(), value_to_query_string(v)))
                    .collect();
                self.client
                    .request(parse_method(&method), &url)
                    .query(&query)
            }
            _ => self
                .client
                .request(parse_method(&method), &url)
                .json(&Value::Object(remaining)),
        };
        for (name, value) in &headers {
            request = request.header(name, value);
        }

        match request.send().await {
            Ok(response) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                let status = response.status();
                if status.is_success() {
                    let data = response.json::<Value>().await.unwrap_or(Value::Null);
                    ConnectorResult::success(data, Some(status.as_u16()), duration_ms)
                } else {
                    ConnectorResult::failure(
                        format!("HTTP_{}", status.as_u16()),
                        format!("request responded with status {status}"),
                        Some(status.as_u16()),
                        duration_ms,
                    )
                }
            }
            Err(err) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                if err.is_timeout() {
                    ConnectorResult::failure("TIMEOUT", "request timed out", None, duration_ms)
                } else {
                    ConnectorResult::failure("REQUEST_ERROR", err.to_string(), None, duration_ms)
                }
            }
        }
    }
}

fn parse_method(method: &str) -> reqwest::Method {
    method.parse().unwrap_or(reqwest::Method::GET)
}

fn value_to_query_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Substitute `{param}` placeholders in `template` from `params`, returning
/// the built URL and the set of param names consumed by the template (these
/// are excluded from the query/body so they aren't sent twice).
fn build_url(template: &str, params: &Value) -> (String, std::collections::HashSet<String>) {
    let mut consumed = std::collections::HashSet::new();
    let mut url = template.to_string();
    if let Value::Object(map) = params {
        for (key, value) in map {
            let placeholder = format!("{{{key}}}");
            if url.contains(&placeholder) {
                url = url.replace(&placeholder, &value_to_query_string(value));
                consumed.insert(key.clone());
            }
        }
    }
    (url, consumed)
}

fn domain_allowed(url: &str, allowed_domains: &[String]) -> bool {
    if allowed_domains.is_empty() {
        return false;
    }
    let host = match extract_host(url) {
        Some(h) => h.to_ascii_lowercase(),
        None => return false,
    };
    allowed_domains.iter().any(|allowed| {
        let allowed = allowed.to_ascii_lowercase();
        host == allowed || host.ends_with(&format!(".{allowed}"))
    })
}

fn extract_host(url: &str) -> Option<&str> {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let authority = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or(without_scheme);
    let host_port = authority.rsplit_once('@').map(|(_, h)| h).unwrap_or(authority);
    let host = host_port.split(':').next().unwrap_or(host_port);
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_allow_list_denies_everything() {
        assert!(!domain_allowed("https://example.com/x", &[]));
    }

    #[test]
    fn exact_domain_matches() {
        let allowed = vec!["example.com".to_string()];
        assert!(domain_allowed("https://example.com/x", &allowed));
    }

    #[test]
    fn subdomain_matches() {
        let allowed = vec!["example.com".to_string()];
        assert!(domain_allowed("https://api.example.com/x", &allowed));
    }

    #[test]
    fn unrelated_domain_is_denied() {
        let allowed = vec!["example.com".to_string()];
        assert!(!domain_allowed("https://evil.net/x", &allowed));
    }

    #[test]
    fn port_is_stripped_before_comparison() {
        let allowed = vec!["example.com".to_string()];
        assert!(domain_allowed("https://example.com:8443/x", &allowed));
    }

    #[test]
    fn url_template_substitutes_and_consumes_params() {
        let (url, consumed) = build_url("https://api.example.com/users/{user_id}", &json!({"user_id": "42", "note": "hi"}));
        assert_eq!(url, "https://api.example.com/users/42");
        assert!(consumed.contains("user_id"));
        assert!(!consumed.contains("note"));
    }
}
