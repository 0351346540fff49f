// verify.rs — Chain verification: recompute every record_hash, confirm
// the previous_record_hash linkage, and check every gateway_signature.

use base64::Engine as _;
use gateway_crypto::verify_signature;
use serde::Serialize;

use crate::error::AuditError;
use crate::hashing::compute_record_hash;
use crate::store::AuditStore;

#[derive(Debug, Clone, Serialize)]
pub struct VerificationError {
    pub record_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub is_valid: bool,
    pub errors: Vec<VerificationError>,
    pub record_count: usize,
    pub first_record_id: Option<String>,
    pub last_record_id: Option<String>,
}

/// Verify one chain — all [`InteractionRecord`]s for `(org_id, uapk_id)`,
/// in `created_at` order.
///
/// [`InteractionRecord`]: crate::record::InteractionRecord
pub fn verify_chain(
    store: &AuditStore,
    public_key: &[u8],
    org_id: &str,
    uapk_id: &str,
) -> Result<VerificationReport, AuditError> {
    let records = store.list_chain(org_id, uapk_id)?;
    let mut errors = Vec::new();
    let mut expected_previous: Option<String> = None;

    for record in &records {
        if record.previous_record_hash != expected_previous {
            errors.push(VerificationError {
                record_id: record.record_id.clone(),
                reason: "previous_record_hash does not match the preceding record".to_string(),
            });
        }

        match compute_record_hash(record) {
            Ok(recomputed) if recomputed == record.record_hash => {}
            Ok(_) => errors.push(VerificationError {
                record_id: record.record_id.clone(),
                reason: "record_hash does not match its hashable fields".to_string(),
            }),
            Err(e) => errors.push(VerificationError {
                record_id: record.record_id.clone(),
                reason: format!("failed to recompute record_hash: {e}"),
            }),
        }

        match base64::engine::general_purpose::STANDARD.decode(&record.gateway_signature) {
            Ok(signature) => {
                if verify_signature(public_key, record.record_hash.as_bytes(), &signature).is_err()
                {
                    errors.push(VerificationError {
                        record_id: record.record_id.clone(),
                        reason: "gateway_signature does not verify against record_hash".to_string(),
                    });
                }
            }
            Err(_) => errors.push(VerificationError {
                record_id: record.record_id.clone(),
                reason: "gateway_signature is not valid base64".to_string(),
            }),
        }

        expected_previous = Some(record.record_hash.clone());
    }

    Ok(VerificationReport {
        is_valid: errors.is_empty(),
        errors,
        record_count: records.len(),
        first_record_id: records.first().map(|r| r.record_id.clone()),
        last_record_id: records.last().map(|r| r.record_id.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{CheckOutcome, Decision, PolicyCheckStep, PolicyTrace, Reason};
    use crate::seal::{PendingRecord, RecordSealer};
    use chrono::Utc;
    use gateway_crypto::GatewayKeypair;
    use tempfile::tempdir;

    fn pending(org: &str, uapk: &str) -> PendingRecord {
        let now = Utc::now();
        let mut trace = PolicyTrace::new(now, now);
        trace.checks.push(PolicyCheckStep::new("manifest_check", CheckOutcome::Pass));
        PendingRecord {
            org_id: org.to_string(),
            uapk_id: uapk.to_string(),
            agent_id: uapk.to_string(),
            action_type: "email:send".to_string(),
            tool: "email".to_string(),
            request: serde_json::json!({"to": "a@b.c"}),
            result: None,
            decision: Decision::Approved,
            reasons: vec![Reason::new("ALL_CHECKS_PASSED", "ok")],
            policy_trace: trace,
            risk_snapshot: None,
            decision_reason: None,
            duration_ms: 3,
            capability_token_id: None,
            created_at: now,
        }
    }

    #[test]
    fn a_freshly_sealed_chain_verifies_clean() {
        let dir = tempdir().unwrap();
        let store = AuditStore::open(dir.path()).unwrap();
        let (keypair, _) = GatewayKeypair::generate().unwrap();
        let sealer = RecordSealer::new(&store, &keypair);
        sealer.seal(pending("org-1", "bot-1")).unwrap();
        sealer.seal(pending("org-1", "bot-1")).unwrap();
        sealer.seal(pending("org-1", "bot-1")).unwrap();

        let report = verify_chain(&store, &keypair.public_key_bytes(), "org-1", "bot-1").unwrap();
        assert!(report.is_valid);
        assert_eq!(report.record_count, 3);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn tampering_with_a_record_is_detected() {
        let dir = tempdir().unwrap();
        let store = AuditStore::open(dir.path()).unwrap();
        let (keypair, _) = GatewayKeypair::generate().unwrap();
        let sealer = RecordSealer::new(&store, &keypair);
        let record = sealer.seal(pending("org-1", "bot-1")).unwrap();

        let mut tampered = record.clone();
        tampered.decision = Decision::Denied;
        store.persist(&tampered).unwrap();

        let report = verify_chain(&store, &keypair.public_key_bytes(), "org-1", "bot-1").unwrap();
        assert!(!report.is_valid);
        assert!(!report.errors.is_empty());
    }

    #[test]
    fn wrong_public_key_fails_every_signature_check() {
        let dir = tempdir().unwrap();
        let store = AuditStore::open(dir.path()).unwrap();
        let (keypair, _) = GatewayKeypair::generate().unwrap();
        let (other_keypair, _) = GatewayKeypair::generate().unwrap();
        let sealer = RecordSealer::new(&store, &keypair);
        sealer.seal(pending("org-1", "bot-1")).unwrap();

        let report =
            verify_chain(&store, &other_keypair.public_key_bytes(), "org-1", "bot-1").unwrap();
        assert!(!report.is_valid);
    }

    #[test]
    fn empty_chain_verifies_as_valid_with_zero_records() {
        let dir = tempdir().unwrap();
        let store = AuditStore::open(dir.path()).unwrap();
        let (keypair, _) = GatewayKeypair::generate().unwrap();

        let report = verify_chain(&store, &keypair.public_key_bytes(), "org-1", "bot-1").unwrap();
        assert!(report.is_valid);
        assert_eq!(report.record_count, 0);
        assert!(report.first_record_id.is_none());
    }
}
