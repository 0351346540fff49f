// config.rs — Environment-driven configuration (spec.md §6's
// "Environment / config" list), loaded with `std::env` + sane defaults per
// the teacher's convention of no config crate beyond TOML for its own
// daemon/shell configs.

use std::env;
use std::path::PathBuf;

use gateway_http::{AuthConfig, CorsConfig};

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_list(name: &str, default: &[&str]) -> Vec<String> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw.split(',').map(|s| s.trim().to_string()).collect(),
        _ => default.iter().map(|s| s.to_string()).collect(),
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_i64(name: &str, default: i64) -> i64 {
    env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f64(name: &str, default: f64) -> f64 {
    env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Everything read from the environment at startup. Field names track
/// spec.md §6's config table rather than Rust naming conventions so the
/// env-var mapping stays obvious.
pub struct Config {
    pub data_dir: PathBuf,
    pub bind_addr: String,
    pub log_level: String,
    pub log_format: String,
    pub secret_key: Option<String>,
    pub jwt_algorithm: String,
    pub jwt_expiration_minutes: i64,
    pub gateway_fernet_key: Option<String>,
    pub gateway_default_daily_budget: u64,
    pub gateway_budget_threshold_fraction: f64,
    pub gateway_approval_expiry_hours: i64,
    pub gateway_connector_timeout_seconds: u64,
    pub gateway_allowed_webhook_domains: Vec<String>,
    pub cors_origins: Vec<String>,
    pub cors_methods: Vec<String>,
    pub cors_headers: Vec<String>,
    pub override_token_expiry_seconds: i64,
    pub session_token_expiry_minutes: i64,
}

impl Config {
    /// `database_url` is recognized (spec.md §6) but unused: every store in
    /// this workspace is the file-backed `JsonStore`, not a SQL database;
    /// `data_dir` is the gateway's equivalent knob.
    pub fn from_env() -> Self {
        let _database_url = env::var("database_url").ok();
        Self {
            data_dir: PathBuf::from(env_or("GATEWAY_DATA_DIR", "./gateway-data")),
            bind_addr: env_or("GATEWAY_BIND_ADDR", "0.0.0.0:8080"),
            log_level: env_or("log_level", "INFO"),
            log_format: env_or("log_format", "console"),
            secret_key: env::var("secret_key").ok(),
            jwt_algorithm: env_or("jwt_algorithm", "EdDSA"),
            jwt_expiration_minutes: env_i64("jwt_expiration_minutes", 60),
            gateway_fernet_key: env::var("gateway_fernet_key").ok(),
            gateway_default_daily_budget: env_u64("gateway_default_daily_budget", 1000),
            gateway_budget_threshold_fraction: env_f64("gateway_budget_threshold_fraction", 0.9),
            gateway_approval_expiry_hours: env_i64("gateway_approval_expiry_hours", 24),
            gateway_connector_timeout_seconds: env_u64("gateway_connector_timeout_seconds", 30),
            gateway_allowed_webhook_domains: env_list("gateway_allowed_webhook_domains", &[]),
            cors_origins: env_list("cors_origins", &[]),
            cors_methods: env_list("cors_methods", &["GET", "POST", "PATCH", "DELETE"]),
            cors_headers: env_list("cors_headers", &["authorization", "content-type"]),
            override_token_expiry_seconds: env_i64("GATEWAY_OVERRIDE_TOKEN_EXPIRY_SECONDS", 300),
            session_token_expiry_minutes: env_i64("GATEWAY_SESSION_TOKEN_EXPIRY_MINUTES", 60),
        }
    }

    pub fn pipeline_config(&self) -> gateway_core::PipelineConfig {
        gateway_core::PipelineConfig {
            default_daily_budget: self.gateway_default_daily_budget,
            budget_threshold_fraction: Some(self.gateway_budget_threshold_fraction),
            default_allowed_domains: self.gateway_allowed_webhook_domains.clone(),
            approval_expiry_hours: self.gateway_approval_expiry_hours,
        }
    }

    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            session_token_expiry_minutes: self.session_token_expiry_minutes,
            override_token_expiry_seconds: self.override_token_expiry_seconds,
        }
    }

    pub fn cors_config(&self) -> CorsConfig {
        CorsConfig {
            allowed_origins: self.cors_origins.clone(),
            allowed_methods: self.cors_methods.clone(),
            allowed_headers: self.cors_headers.clone(),
        }
    }
}
