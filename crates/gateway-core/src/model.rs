// model.rs — Data model entities (spec §3): Organization, User, Membership,
// ApiKey, Manifest, CapabilityIssuer, CapabilityToken, ActionCounter,
// Secret, Approval, UsedOverrideToken. `Policy` is reused directly from
// `gateway_policy` rather than duplicated here.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::store::Entity;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Viewer,
    Operator,
    Admin,
    Owner,
}

impl Role {
    /// Does this role meet or exceed `required`? Ordering is
    /// `Owner > Admin > Operator > Viewer`, matching §6's role table.
    pub fn at_least(&self, required: Role) -> bool {
        *self >= required
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for Organization {
    fn entity_id(&self) -> String {
        self.id.to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl Entity for User {
    fn entity_id(&self) -> String {
        self.id.to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub id: Uuid,
    pub org_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl Entity for Membership {
    fn entity_id(&self) -> String {
        self.id.to_string()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApiKeyStatus {
    Active,
    Revoked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    /// First 12 characters of the plaintext key, for lookup narrowing
    /// without storing the key itself.
    pub key_prefix: String,
    pub key_hash: String,
    pub status: ApiKeyStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl Entity for ApiKey {
    fn entity_id(&self) -> String {
        self.id.to_string()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ManifestStatus {
    Pending,
    Active,
    Suspended,
    Revoked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub id: Uuid,
    pub org_id: Uuid,
    pub uapk_id: String,
    pub version: String,
    pub manifest_json: Value,
    pub manifest_hash: String,
    pub status: ManifestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Manifest {
    fn entity_id(&self) -> String {
        self.id.to_string()
    }
}

impl Manifest {
    /// `manifest_json.capabilities.requested`, or empty (fail-closed) if
    /// absent or malformed.
    pub fn requested_capabilities(&self) -> Vec<String> {
        self.manifest_json
            .get("capabilities")
            .and_then(|c| c.get("requested"))
            .and_then(|r| r.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }

    pub fn max_actions_per_day(&self) -> Option<u64> {
        self.manifest_json
            .get("constraints")
            .and_then(|c| c.get("max_actions_per_day"))
            .and_then(|v| v.as_u64())
    }

    pub fn require_human_approval(&self) -> bool {
        self.manifest_json
            .get("constraints")
            .and_then(|c| c.get("require_human_approval"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// `manifest_json.tools.<tool>`, the connector config for one declared
    /// tool, or `None` if the manifest doesn't declare it.
    pub fn tool_config(&self, tool: &str) -> Option<gateway_connectors::ConnectorConfig> {
        self.manifest_json
            .get("tools")
            .and_then(|t| t.get(tool))
            .and_then(|c| serde_json::from_value(c.clone()).ok())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssuerStatus {
    Active,
    Revoked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityIssuer {
    pub id: Uuid,
    pub org_id: Uuid,
    pub issuer_id: String,
    pub name: String,
    pub public_key: String,
    pub status: IssuerStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl Entity for CapabilityIssuer {
    fn entity_id(&self) -> String {
        self.id.to_string()
    }
}

/// `CapabilityToken.constraints` — amount/jurisdiction/counterparty/rate
/// limits embedded in the token itself, independent of any `Policy`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TokenConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jurisdictions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty_allowlist: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty_denylist: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_actions: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_actions_per_hour: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityToken {
    pub id: Uuid,
    pub token_id: String,
    pub org_id: Uuid,
    pub agent_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uapk_id: Option<String>,
    pub capabilities: Vec<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub issued_by: String,
    #[serde(default)]
    pub constraints: TokenConstraints,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_actions: Option<u64>,
    #[serde(default)]
    pub actions_used: u64,
    #[serde(default)]
    pub revoked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_reason: Option<String>,
}

impl Entity for CapabilityToken {
    fn entity_id(&self) -> String {
        self.token_id.clone()
    }
}

impl CapabilityToken {
    /// `!revoked ∧ expires_at > now ∧ (max_actions is null ∨ actions_used < max_actions)`.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.revoked
            && self.expires_at > now
            && self.max_actions.map_or(true, |max| self.actions_used < max)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionCounter {
    pub id: Uuid,
    pub org_id: String,
    pub uapk_id: String,
    pub counter_date: NaiveDate,
    pub count: u64,
    pub updated_at: DateTime<Utc>,
}

impl Entity for ActionCounter {
    /// Keyed by `(org_id, uapk_id, counter_date)` rather than `id` — the
    /// unique key the data model actually requires; the file name doubles
    /// as the row lock the daily budget serializes on.
    fn entity_id(&self) -> String {
        budget_key(&self.org_id, &self.uapk_id, self.counter_date)
    }
}

pub fn budget_key(org_id: &str, uapk_id: &str, counter_date: NaiveDate) -> String {
    format!("{org_id}_{uapk_id}_{counter_date}")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Secret {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub encrypted_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Secret {
    fn entity_id(&self) -> String {
        format!("{}_{}", self.org_id, self.name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Denied,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
    pub id: Uuid,
    pub approval_id: String,
    pub org_id: Uuid,
    pub interaction_id: String,
    pub uapk_id: String,
    pub agent_id: String,
    pub action: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    pub reason_codes: Vec<String>,
    pub status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_token_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_token_expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_token_used_at: Option<DateTime<Utc>>,
}

impl Entity for Approval {
    fn entity_id(&self) -> String {
        self.approval_id.clone()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsedOverrideToken {
    pub token_hash: String,
    pub org_id: Uuid,
    pub approval_id: String,
    pub action_hash: String,
    pub used_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Entity for UsedOverrideToken {
    fn entity_id(&self) -> String {
        self.token_hash.clone()
    }
}

pub fn generate_token_id() -> String {
    format!("cap-{}", Uuid::new_v4().simple())
}

pub fn generate_approval_id() -> String {
    format!("appr-{}", Uuid::new_v4().simple())
}
