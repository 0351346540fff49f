// record.rs — InteractionRecord: the append-only audit entity.
//
// Fields split into a hashable subset (canonicalized into `record_hash`,
// see `hashing.rs`) and a non-hashable subset kept for forensics only —
// additive changes to `request`/`result`/`risk_snapshot_json` can never
// retroactively break a previously-signed record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of the action-admission pipeline for one request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Denied,
    Pending,
    /// Reachable in principle (a pending approval expiring), but no
    /// pipeline step in this implementation constructs it — see
    /// the design notes on `Decision::Timeout`.
    Timeout,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Decision::Approved => "approved",
            Decision::Denied => "denied",
            Decision::Pending => "pending",
            Decision::Timeout => "timeout",
        };
        write!(f, "{}", s)
    }
}

/// A single machine-readable reason attached to a decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reason {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Reason {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }
}

/// Outcome of one check within a [`PolicyTrace`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    Pass,
    Fail,
    Skip,
    Escalate,
}

/// One check the pipeline performed, in evaluation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyCheckStep {
    pub check: String,
    pub result: CheckOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl PolicyCheckStep {
    pub fn new(check: impl Into<String>, result: CheckOutcome) -> Self {
        Self {
            check: check.into(),
            result,
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// The full decision trail for one action, recorded check by check
/// (`manifest_check`, `capability_gate`, `budget_check`, `amount_cap`,
/// `jurisdiction`, `counterparty`, and one per matched policy name).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyTrace {
    pub checks: Vec<PolicyCheckStep>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_ms: i64,
}

impl PolicyTrace {
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        let duration_ms = (end_time - start_time).num_milliseconds();
        Self {
            checks: Vec::new(),
            start_time,
            end_time,
            duration_ms,
        }
    }
}

/// The append-only, hash-chained, signed audit entity for exactly one
/// decided action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecord {
    // ---- hashable subset ----
    pub record_id: String,
    pub org_id: String,
    pub uapk_id: String,
    pub agent_id: String,
    pub action_type: String,
    pub tool: String,
    pub request_hash: String,
    pub decision: Decision,
    pub reasons_json: Vec<Reason>,
    pub policy_trace_json: PolicyTrace,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_record_hash: Option<String>,
    pub created_at: DateTime<Utc>,

    // ---- non-hashable subset ----
    pub record_hash: String,
    pub request: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_snapshot_json: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_reason: Option<String>,
    pub duration_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capability_token_id: Option<String>,
    pub gateway_signature: String,
}

/// Generate a record id in the `ir-<hex>` shape the data model mandates.
pub fn generate_record_id() -> String {
    format!("ir-{}", uuid::Uuid::new_v4().simple())
}
