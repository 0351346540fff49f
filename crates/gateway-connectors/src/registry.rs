// registry.rs — Builds the right connector from a tool's config and
// dispatches to it. Polymorphism is a tagged enum, not a trait object
// (three known implementations, no plugin loading) per the gateway's
// "tagged variant or small interface" design note.

use std::collections::HashMap;

use serde_json::Value;

use crate::config::ConnectorConfig;
use crate::error::ConnectorError;
use crate::http::GenericHttpConnector;
use crate::mock::MockConnector;
use crate::result::ConnectorResult;
use crate::webhook::WebhookConnector;

#[derive(Debug, Clone)]
pub enum Connector {
    Mock(MockConnector),
    Webhook(WebhookConnector),
    GenericHttp(GenericHttpConnector),
}

impl Connector {
    /// Build a connector for `config`, validating it eagerly so that a
    /// malformed tool definition fails at admission time rather than mid-call.
    /// `default_allowed_domains` backs `generic-http` when the config carries
    /// no connector-local override.
    pub fn from_config(config: ConnectorConfig, default_allowed_domains: &[String]) -> Result<Self, ConnectorError> {
        match config.connector_type.as_str() {
            "mock" => Ok(Connector::Mock(MockConnector::new(config))),
            "webhook" => Ok(Connector::Webhook(WebhookConnector::new(config)?)),
            "generic-http" => Ok(Connector::GenericHttp(GenericHttpConnector::new(
                config,
                default_allowed_domains,
            )?)),
            other => Err(ConnectorError::UnknownConnectorType(other.to_string())),
        }
    }

    pub async fn execute(&self, params: &Value, secrets: &HashMap<String, String>) -> ConnectorResult {
        match self {
            Connector::Mock(c) => c.execute(params).await,
            Connector::Webhook(c) => c.execute(params, secrets).await,
            Connector::GenericHttp(c) => c.execute(params, secrets).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn builds_and_runs_mock_connector() {
        let config = ConnectorConfig {
            connector_type: "mock".to_string(),
            ..ConnectorConfig::default()
        };
        let connector = Connector::from_config(config, &[]).unwrap();
        let result = connector.execute(&json!({"x": 1}), &HashMap::new()).await;
        assert!(result.success);
    }

    #[test]
    fn unknown_connector_type_is_rejected() {
        let config = ConnectorConfig {
            connector_type: "ftp".to_string(),
            ..ConnectorConfig::default()
        };
        let result = Connector::from_config(config, &[]);
        assert!(matches!(result, Err(ConnectorError::UnknownConnectorType(_))));
    }
}
