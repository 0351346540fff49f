// error.rs — Errors raised while constructing a connector from its config.
//
// These are configuration-time failures only. Once a connector is built,
// `execute()` never fails — any runtime problem (timeout, bad domain,
// non-2xx response) is reported inside `ConnectorResult` so the pipeline can
// still seal a record for the attempt, per the gateway's "every action gets
// a record" rule.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("unknown connector type: {0}")]
    UnknownConnectorType(String),

    #[error("connector {connector_type} requires a url in its config")]
    MissingUrl { connector_type: String },

    #[error("failed to build http client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}
