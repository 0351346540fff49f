//! # gateway-connectors
//!
//! Tool connector registry for the agent interaction gateway. A connector
//! turns an admitted action into an outbound call: a webhook POST, an
//! arbitrary HTTP request, or — for tests and demos — a mock echo.
//!
//! Connectors never fail loudly: `execute` always returns a
//! [`ConnectorResult`], success or failure, so the pipeline can seal an
//! audit record for the attempt regardless of outcome.

mod config;
mod error;
mod http;
mod mock;
mod registry;
mod result;
mod webhook;

pub use config::{resolve_all_params, resolve_headers, resolve_param, ConnectorConfig};
pub use error::ConnectorError;
pub use http::GenericHttpConnector;
pub use mock::MockConnector;
pub use registry::Connector;
pub use result::{ConnectorErrorDetail, ConnectorResult};
pub use webhook::WebhookConnector;
