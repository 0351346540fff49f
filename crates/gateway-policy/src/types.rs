// types.rs — Policy entity and the shape of an inbound evaluation request.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PolicyType {
    Allow,
    Deny,
    RequireApproval,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PolicyScope {
    Global,
    Action,
    Agent,
}

/// A single `rules.parameters.<name>` constraint.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ParameterConstraint {
    pub required: Option<bool>,
    pub max_length: Option<usize>,
    pub allowed_values: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmountCapRule {
    pub max_amount: f64,
    /// Amounts above this (but within `max_amount`) escalate instead of
    /// passing silently, when the owning policy is `require_approval`.
    pub require_approval_above: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JurisdictionRule {
    pub allowed: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CounterpartyRule {
    pub allowlist: Option<Vec<String>>,
    pub denylist: Option<Vec<String>>,
}

/// The `rules` JSON blob on a [`Policy`]. Not every scope uses every field —
/// spec leaves `amount_caps`/`jurisdictions`/`counterparty` unrestricted to a
/// particular scope, so any policy may carry them.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PolicyRules {
    pub action_pattern: Option<String>,
    pub agent_ids: Option<Vec<String>>,
    #[serde(default)]
    pub parameters: Option<HashMap<String, ParameterConstraint>>,
    pub amount_caps: Option<AmountCapRule>,
    pub jurisdictions: Option<JurisdictionRule>,
    pub counterparty: Option<CounterpartyRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub policy_type: PolicyType,
    pub scope: PolicyScope,
    /// -1000..1000; higher evaluates first.
    pub priority: i32,
    pub rules: PolicyRules,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One action request as seen by the policy engine — already stripped of
/// token/manifest plumbing, just the facts a policy can match against.
#[derive(Debug, Clone)]
pub struct PolicyRequest {
    pub action_type: String,
    pub tool: String,
    pub agent_id: String,
    pub parameters: Value,
    pub amount: Option<f64>,
    pub jurisdiction: Option<String>,
    pub counterparty: Option<String>,
}
