// mock.rs — Echo/fixture connector for tests and demos.

use std::time::{Duration, Instant};

use serde_json::{json, Value};

use crate::config::ConnectorConfig;
use crate::result::ConnectorResult;

#[derive(Debug, Clone)]
pub struct MockConnector {
    config: ConnectorConfig,
}

impl MockConnector {
    pub fn new(config: ConnectorConfig) -> Self {
        Self { config }
    }

    pub async fn execute(&self, params: &Value) -> ConnectorResult {
        let start = Instant::now();
        if let Some(delay) = self.config.delay_ms {
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }
        let duration_ms = start.elapsed().as_millis() as u64;

        if self.config.should_fail.unwrap_or(false) {
            return ConnectorResult::failure(
                self.config
                    .error_code
                    .clone()
                    .unwrap_or_else(|| "UNKNOWN_ERROR".to_string()),
                self.config
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "mock connector configured to fail".to_string()),
                self.config.status_code,
                duration_ms,
            );
        }

        let data = self
            .config
            .response_data
            .clone()
            .unwrap_or_else(|| json!({"echo": params}));
        ConnectorResult::success(data, self.config.status_code.or(Some(200)), duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn echoes_params_by_default() {
        let connector = MockConnector::new(ConnectorConfig::default());
        let result = connector.execute(&json!({"to": "x@y.z"})).await;
        assert!(result.success);
        assert_eq!(result.data.unwrap()["echo"]["to"], "x@y.z");
    }

    #[tokio::test]
    async fn returns_configured_response() {
        let mut config = ConnectorConfig::default();
        config.response_data = Some(json!({"status": "sent"}));
        let connector = MockConnector::new(config);
        let result = connector.execute(&json!({})).await;
        assert_eq!(result.data.unwrap(), json!({"status": "sent"}));
    }

    #[tokio::test]
    async fn honors_forced_failure() {
        let mut config = ConnectorConfig::default();
        config.should_fail = Some(true);
        config.error_code = Some("REQUEST_ERROR".to_string());
        let connector = MockConnector::new(config);
        let result = connector.execute(&json!({})).await;
        assert!(!result.success);
        assert_eq!(result.error.unwrap().code, "REQUEST_ERROR");
    }
}
