// hashing.rs — Computes `record_hash` over exactly the hashable subset of
// an InteractionRecord. Kept separate from `record.rs` so the set of
// fields that feed the hash is visible at a glance and can't silently
// drift when a non-hashable field is added to the struct.

use serde_json::json;

use crate::error::AuditError;
use crate::record::InteractionRecord;

/// Recompute `record_hash` for `record` from its hashable subset —
/// `record_id, org_id, uapk_id, agent_id, action_type, tool, request_hash,
/// decision, reasons_json, policy_trace_json, result_hash,
/// previous_record_hash, created_at`. Deliberately excludes `request`,
/// `result`, `risk_snapshot_json`, `decision_reason`, `duration_ms`,
/// `capability_token_id`, and `gateway_signature` — see the data model's
/// "non-hashable" grouping.
pub fn compute_record_hash(record: &InteractionRecord) -> Result<String, AuditError> {
    let hashable = json!({
        "record_id": record.record_id,
        "org_id": record.org_id,
        "uapk_id": record.uapk_id,
        "agent_id": record.agent_id,
        "action_type": record.action_type,
        "tool": record.tool,
        "request_hash": record.request_hash,
        "decision": record.decision,
        "reasons_json": record.reasons_json,
        "policy_trace_json": record.policy_trace_json,
        "result_hash": record.result_hash,
        "previous_record_hash": record.previous_record_hash,
        "created_at": record.created_at.to_rfc3339(),
    });
    Ok(gateway_canon::canonical_hash(&hashable)?)
}

/// Hash an arbitrary request or result payload: `SHA256(canonical_json(value))`.
pub fn hash_payload(value: &serde_json::Value) -> Result<String, AuditError> {
    Ok(gateway_canon::canonical_hash(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{CheckOutcome, Decision, PolicyCheckStep, PolicyTrace, Reason};
    use chrono::Utc;

    fn sample_record() -> InteractionRecord {
        let now = Utc::now();
        let mut trace = PolicyTrace::new(now, now);
        trace.checks.push(PolicyCheckStep::new("manifest_check", CheckOutcome::Pass));
        InteractionRecord {
            record_id: "ir-abc".to_string(),
            org_id: "org-1".to_string(),
            uapk_id: "billing-bot".to_string(),
            agent_id: "billing-bot".to_string(),
            action_type: "email:send".to_string(),
            tool: "email".to_string(),
            request_hash: "req-hash".to_string(),
            decision: Decision::Approved,
            reasons_json: vec![Reason::new("ALL_CHECKS_PASSED", "ok")],
            policy_trace_json: trace,
            result_hash: None,
            previous_record_hash: None,
            created_at: now,
            record_hash: String::new(),
            request: serde_json::json!({"to": "x@y.z"}),
            result: None,
            risk_snapshot_json: None,
            decision_reason: None,
            duration_ms: 5,
            capability_token_id: Some("cap-1".to_string()),
            gateway_signature: String::new(),
        }
    }

    #[test]
    fn hash_is_deterministic() {
        let record = sample_record();
        let a = compute_record_hash(&record).unwrap();
        let b = compute_record_hash(&record).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn changing_request_does_not_change_hash() {
        let mut a = sample_record();
        let mut b = sample_record();
        b.request = serde_json::json!({"totally": "different"});
        a.record_hash = compute_record_hash(&a).unwrap();
        b.record_hash = compute_record_hash(&b).unwrap();
        assert_eq!(a.record_hash, b.record_hash);
    }

    #[test]
    fn changing_decision_changes_hash() {
        let mut a = sample_record();
        let mut b = sample_record();
        b.decision = Decision::Denied;
        let hash_a = compute_record_hash(&a).unwrap();
        let hash_b = compute_record_hash(&b).unwrap();
        assert_ne!(hash_a, hash_b);
        a.record_hash = hash_a;
    }
}
