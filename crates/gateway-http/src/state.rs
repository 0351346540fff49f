// state.rs — AppState: every store and collaborator a handler might need,
// opened once at startup and shared behind `Arc` the way `abp-daemon::AppState`
// shares its runtime. None of the stores are `Clone` (each wraps its own
// file-backed mutex) so the state holds them directly and is itself handed
// out as `Arc<AppState>`.

use gateway_audit::AuditStore;
use gateway_core::{
    ApiKeyStore, ApprovalStore, BudgetStore, CapabilityIssuerStore, CapabilityTokenStore,
    ManifestStore, MembershipStore, OrgStore, PipelineConfig, PolicyStore, SecretStore,
    UsedOverrideTokenStore, UserStore,
};
use gateway_crypto::GatewayKeypair;

use crate::middleware::CorsConfig;

/// Tunables with no home in the data model — session token lifetime and the
/// override-token lifetime minted by `POST /approvals/{id}/approve`.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub session_token_expiry_minutes: i64,
    pub override_token_expiry_seconds: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_token_expiry_minutes: 60,
            override_token_expiry_seconds: 300,
        }
    }
}

pub struct AppState {
    pub orgs: OrgStore,
    pub users: UserStore,
    pub memberships: MembershipStore,
    pub api_keys: ApiKeyStore,
    pub manifests: ManifestStore,
    pub tokens: CapabilityTokenStore,
    pub issuers: CapabilityIssuerStore,
    pub policies: PolicyStore,
    pub budgets: BudgetStore,
    pub approvals: ApprovalStore,
    pub used_override_tokens: UsedOverrideTokenStore,
    pub secrets: SecretStore,
    pub audit: AuditStore,
    pub keypair: GatewayKeypair,
    pub pipeline_config: PipelineConfig,
    pub auth_config: AuthConfig,
    pub cors: CorsConfig,
}

impl AppState {
    /// Borrow every collaborator `ActionGateway::admit` needs for one request.
    pub fn gateway(&self) -> gateway_core::ActionGateway<'_> {
        gateway_core::ActionGateway {
            tokens: &self.tokens,
            manifests: &self.manifests,
            issuers: &self.issuers,
            policies: &self.policies,
            budgets: &self.budgets,
            approvals: &self.approvals,
            used_override_tokens: &self.used_override_tokens,
            secrets: &self.secrets,
            audit: &self.audit,
            keypair: &self.keypair,
            config: &self.pipeline_config,
        }
    }
}
