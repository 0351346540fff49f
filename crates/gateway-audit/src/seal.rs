// seal.rs — RecordSealer: turns a decided action into a signed,
// hash-chained InteractionRecord and persists it.
//
// Sealing order mirrors the data model's "record_hash" note exactly:
//   1. compute request_hash / result_hash
//   2. read the current last record hash for (org_id, uapk_id) under a lock
//   3. assemble the hashable subset; compute record_hash
//   4. compute gateway_signature = sign(record_hash bytes)
//   5. insert the record, then advance the chain pointer — all while
//      still holding the lock from step 2
use chrono::{DateTime, Utc};
use gateway_crypto::GatewayKeypair;
use serde_json::Value;

use crate::error::AuditError;
use crate::hashing::{compute_record_hash, hash_payload};
use crate::record::{Decision, InteractionRecord, PolicyTrace, Reason};
use crate::store::AuditStore;

pub struct RecordSealer<'a> {
    store: &'a AuditStore,
    keypair: &'a GatewayKeypair,
}

/// Everything the pipeline knows about one decided action, before it has
/// been hashed, chained, or signed.
pub struct PendingRecord {
    /// Chosen by the caller (`generate_record_id()`) rather than here, so an
    /// approval created for a `pending` decision can reference the interaction
    /// record's id before the record itself has been sealed.
    pub record_id: String,
    pub org_id: String,
    pub uapk_id: String,
    pub agent_id: String,
    pub action_type: String,
    pub tool: String,
    pub request: Value,
    pub result: Option<Value>,
    pub decision: Decision,
    pub reasons: Vec<Reason>,
    pub policy_trace: PolicyTrace,
    pub risk_snapshot: Option<Value>,
    pub decision_reason: Option<String>,
    pub duration_ms: i64,
    pub capability_token_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl<'a> RecordSealer<'a> {
    pub fn new(store: &'a AuditStore, keypair: &'a GatewayKeypair) -> Self {
        Self { store, keypair }
    }

    /// Seal one pending record and persist it, returning the finished
    /// [`InteractionRecord`].
    pub fn seal(&self, pending: PendingRecord) -> Result<InteractionRecord, AuditError> {
        let request_hash = hash_payload(&pending.request)?;
        let result_hash = match &pending.result {
            Some(result) => Some(hash_payload(result)?),
            None => None,
        };

        let mut chains = self.store.lock_chains();
        let key = (pending.org_id.clone(), pending.uapk_id.clone());
        let previous_record_hash = chains.get(&key).cloned();

        let mut record = InteractionRecord {
            record_id: pending.record_id,
            org_id: pending.org_id,
            uapk_id: pending.uapk_id,
            agent_id: pending.agent_id,
            action_type: pending.action_type,
            tool: pending.tool,
            request_hash,
            decision: pending.decision,
            reasons_json: pending.reasons,
            policy_trace_json: pending.policy_trace,
            result_hash,
            previous_record_hash,
            created_at: pending.created_at,
            record_hash: String::new(),
            request: pending.request,
            result: pending.result,
            risk_snapshot_json: pending.risk_snapshot,
            decision_reason: pending.decision_reason,
            duration_ms: pending.duration_ms,
            capability_token_id: pending.capability_token_id,
            gateway_signature: String::new(),
        };

        record.record_hash = compute_record_hash(&record)?;
        let signature = self.keypair.sign(record.record_hash.as_bytes());
        record.gateway_signature = base64_encode(&signature);

        self.store.persist(&record)?;
        chains.insert(key, record.record_hash.clone());
        drop(chains);

        Ok(record)
    }
}

fn base64_encode(bytes: &[u8]) -> String {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::generate_record_id;
    use crate::record::CheckOutcome::Pass;
    use crate::record::PolicyCheckStep;
    use gateway_crypto::verify_signature;
    use tempfile::tempdir;

    fn pending(org: &str, uapk: &str) -> PendingRecord {
        let now = Utc::now();
        let mut trace = PolicyTrace::new(now, now);
        trace.checks.push(PolicyCheckStep::new("manifest_check", Pass));
        PendingRecord {
            record_id: generate_record_id(),
            org_id: org.to_string(),
            uapk_id: uapk.to_string(),
            agent_id: uapk.to_string(),
            action_type: "email:send".to_string(),
            tool: "email".to_string(),
            request: serde_json::json!({"to": "a@b.c"}),
            result: Some(serde_json::json!({"sent": true})),
            decision: Decision::Approved,
            reasons: vec![Reason::new("ALL_CHECKS_PASSED", "ok")],
            policy_trace: trace,
            risk_snapshot: None,
            decision_reason: None,
            duration_ms: 12,
            capability_token_id: Some("cap-1".to_string()),
            created_at: now,
        }
    }

    #[test]
    fn first_record_in_a_chain_has_no_previous_hash() {
        let dir = tempdir().unwrap();
        let store = AuditStore::open(dir.path()).unwrap();
        let (keypair, _) = GatewayKeypair::generate().unwrap();
        let sealer = RecordSealer::new(&store, &keypair);

        let record = sealer.seal(pending("org-1", "bot-1")).unwrap();
        assert!(record.previous_record_hash.is_none());
    }

    #[test]
    fn second_record_links_to_first() {
        let dir = tempdir().unwrap();
        let store = AuditStore::open(dir.path()).unwrap();
        let (keypair, _) = GatewayKeypair::generate().unwrap();
        let sealer = RecordSealer::new(&store, &keypair);

        let first = sealer.seal(pending("org-1", "bot-1")).unwrap();
        let second = sealer.seal(pending("org-1", "bot-1")).unwrap();
        assert_eq!(second.previous_record_hash, Some(first.record_hash));
    }

    #[test]
    fn separate_chains_do_not_interfere() {
        let dir = tempdir().unwrap();
        let store = AuditStore::open(dir.path()).unwrap();
        let (keypair, _) = GatewayKeypair::generate().unwrap();
        let sealer = RecordSealer::new(&store, &keypair);

        sealer.seal(pending("org-1", "bot-1")).unwrap();
        let other = sealer.seal(pending("org-1", "bot-2")).unwrap();
        assert!(other.previous_record_hash.is_none());
    }

    #[test]
    fn gateway_signature_verifies_against_record_hash() {
        let dir = tempdir().unwrap();
        let store = AuditStore::open(dir.path()).unwrap();
        let (keypair, _) = GatewayKeypair::generate().unwrap();
        let sealer = RecordSealer::new(&store, &keypair);

        let record = sealer.seal(pending("org-1", "bot-1")).unwrap();
        let signature = base64::Engine::decode(
            &base64::engine::general_purpose::STANDARD,
            &record.gateway_signature,
        )
        .unwrap();
        verify_signature(
            &keypair.public_key_bytes(),
            record.record_hash.as_bytes(),
            &signature,
        )
        .unwrap();
    }
}
