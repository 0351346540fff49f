//! # gateway-daemon
//!
//! HTTP server binary for the agent interaction gateway. Loads config from
//! the environment, opens every file-backed store under one data directory,
//! loads (or mints and persists) the gateway's signing keypair, and serves
//! the `gateway-http` router over TCP.

mod config;

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use gateway_audit::AuditStore;
use gateway_core::{
    ApiKeyStore, ApprovalStore, BudgetStore, CapabilityIssuerStore, CapabilityTokenStore,
    ManifestStore, MembershipStore, OrgStore, PolicyStore, SecretStore, UsedOverrideTokenStore,
    UserStore,
};
use gateway_crypto::{GatewayKeypair, SecretCipher};
use gateway_http::{AppState, build_router};

use crate::config::Config;

/// Agent interaction gateway HTTP server.
#[derive(Parser)]
#[command(name = "gateway-daemon", about = "Agent interaction gateway server")]
struct Cli {
    /// Directory holding the gateway's on-disk state (overrides GATEWAY_DATA_DIR).
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Address to bind the HTTP server to (overrides GATEWAY_BIND_ADDR).
    #[arg(long)]
    bind: Option<String>,
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level_directive(&config.log_level)));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_ansi(false);

    if config.log_format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn log_level_directive(log_level: &str) -> &'static str {
    match log_level.to_ascii_uppercase().as_str() {
        "DEBUG" => "debug",
        "WARNING" | "WARN" => "warn",
        "ERROR" => "error",
        "CRITICAL" => "error",
        _ => "info",
    }
}

/// Load the persisted gateway keypair from `<data_dir>/gateway.key`, or mint
/// and persist a new one on first boot.
fn load_or_generate_keypair(data_dir: &Path) -> Result<GatewayKeypair> {
    let key_path = data_dir.join("gateway.key");
    let persisted = fs::read_to_string(&key_path).ok();

    let (keypair, newly_generated) = GatewayKeypair::load_or_generate(persisted.as_deref())
        .context("loading gateway signing keypair")?;

    if let Some(encoded) = newly_generated {
        fs::write(&key_path, &encoded).with_context(|| {
            format!("persisting newly generated gateway keypair to {}", key_path.display())
        })?;
        tracing::info!(path = %key_path.display(), "generated new gateway signing keypair");
    }

    Ok(keypair)
}

/// Load the secret-encryption cipher from `gateway_fernet_key`, or mint and
/// persist a new one at `<data_dir>/secret.key` on first boot.
fn load_or_generate_cipher(data_dir: &Path, config: &Config) -> Result<SecretCipher> {
    if let Some(key) = &config.gateway_fernet_key {
        return SecretCipher::from_base64_key(key).context("parsing gateway_fernet_key");
    }

    let key_path = data_dir.join("secret.key");
    let encoded = match fs::read_to_string(&key_path) {
        Ok(existing) => existing,
        Err(_) => {
            let generated = SecretCipher::generate_key().context("generating secret cipher key")?;
            fs::write(&key_path, &generated).with_context(|| {
                format!("persisting newly generated secret key to {}", key_path.display())
            })?;
            tracing::info!(path = %key_path.display(), "generated new secret encryption key");
            generated
        }
    };

    SecretCipher::from_base64_key(&encoded).context("parsing persisted secret key")
}

fn build_state(config: &Config) -> Result<AppState> {
    fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating data directory {}", config.data_dir.display()))?;

    let keypair = load_or_generate_keypair(&config.data_dir)?;
    let cipher = load_or_generate_cipher(&config.data_dir, config)?;

    let dir = &config.data_dir;
    Ok(AppState {
        orgs: OrgStore::new(dir.join("orgs"))?,
        users: UserStore::new(dir.join("users"))?,
        memberships: MembershipStore::new(dir.join("memberships"))?,
        api_keys: ApiKeyStore::new(dir.join("api_keys"))?,
        manifests: ManifestStore::new(dir.join("manifests"))?,
        tokens: CapabilityTokenStore::new(dir.join("tokens"))?,
        issuers: CapabilityIssuerStore::new(dir.join("issuers"))?,
        policies: PolicyStore::new(dir.join("policies"))?,
        budgets: BudgetStore::new(dir.join("budgets"))?,
        approvals: ApprovalStore::new(dir.join("approvals"))?,
        used_override_tokens: UsedOverrideTokenStore::new(dir.join("used_override_tokens"))?,
        secrets: SecretStore::new(dir.join("secrets"), cipher)?,
        audit: AuditStore::open(dir.join("audit"))?,
        keypair,
        pipeline_config: config.pipeline_config(),
        auth_config: config.auth_config(),
        cors: config.cors_config(),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }

    init_tracing(&config);

    tracing::info!(data_dir = %config.data_dir.display(), bind = %config.bind_addr, "starting agent interaction gateway");

    let state = Arc::new(build_state(&config)?);
    let router = build_router(state);

    let addr: SocketAddr = config.bind_addr.parse().context("parsing GATEWAY_BIND_ADDR")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;

    tracing::info!(%addr, "gateway listening");

    axum::serve(listener, router)
        .await
        .context("serving gateway HTTP API")?;

    Ok(())
}
