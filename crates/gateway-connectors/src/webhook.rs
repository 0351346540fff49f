// webhook.rs — Fixed-URL JSON POST connector. No retries; timeout and
// network failures are reported as distinct error codes so the policy trace
// and the operator both know which.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde_json::Value;

use crate::config::{resolve_all_params, resolve_headers, ConnectorConfig};
use crate::error::ConnectorError;
use crate::result::ConnectorResult;

#[derive(Debug, Clone)]
pub struct WebhookConnector {
    config: ConnectorConfig,
    client: Client,
}

impl WebhookConnector {
    pub fn new(config: ConnectorConfig) -> Result<Self, ConnectorError> {
        if config.url.is_none() {
            return Err(ConnectorError::MissingUrl {
                connector_type: "webhook".to_string(),
            });
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { config, client })
    }

    pub async fn execute(&self, params: &Value, secrets: &HashMap<String, String>) -> ConnectorResult {
        let start = Instant::now();
        let url = self.config.url.as_deref().expect("validated at construction");
        let body = resolve_all_params(params, secrets);
        let headers = resolve_headers(&self.config, secrets);

        let mut request = self.client.post(url).json(&body);
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
                        format!("webhook responded with status {status}"),
                        Some(status.as_u16()),
                        duration_ms,
                    )
                }
            }
            Err(err) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                if err.is_timeout() {
                    ConnectorResult::failure("TIMEOUT", "webhook request timed out", None, duration_ms)
                } else {
                    ConnectorResult::failure("REQUEST_ERROR", err.to_string(), None, duration_ms)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_config_without_url() {
        let config = ConnectorConfig {
            connector_type: "webhook".to_string(),
            ..ConnectorConfig::default()
        };
        let result = WebhookConnector::new(config);
        assert!(matches!(result, Err(ConnectorError::MissingUrl { .. })));
    }

    #[test]
    fn accepts_config_with_url() {
        let config = ConnectorConfig {
            connector_type: "webhook".to_string(),
            url: Some("https://example.com/hook".to_string()),
            ..ConnectorConfig::default()
        };
        assert!(WebhookConnector::new(config).is_ok());
    }
}
