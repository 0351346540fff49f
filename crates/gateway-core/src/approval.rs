// approval.rs — Approval lifecycle and override-token issuance (§4.J).
//
// Creating an approval corresponds to a `pending` decision out of the
// pipeline. `approve` mints a single-use override token bound to the
// approval's `action_hash` and persists only its SHA-256 — the raw token
// is returned to the caller exactly once. `deny` is terminal. Expiry is
// swept opportunistically on read, matching the data model's "or
// opportunistically on read" clause.

use chrono::{DateTime, Utc};
use gateway_capability::OverrideClaims;
use gateway_crypto::GatewayKeypair;
use serde_json::Value;
use uuid::Uuid;

use crate::error::GatewayError;
use crate::model::{generate_approval_id, Approval, ApprovalStatus, UsedOverrideToken};
use crate::store::JsonStore;

pub struct ApprovalStore {
    inner: JsonStore<Approval>,
}

pub struct CreateApprovalRequest {
    pub org_id: Uuid,
    pub interaction_id: String,
    pub uapk_id: String,
    pub agent_id: String,
    pub action: Value,
    pub counterparty: Option<String>,
    pub context: Option<Value>,
    pub reason_codes: Vec<String>,
    pub expiry_hours: i64,
}

impl ApprovalStore {
    pub fn new(dir: impl AsRef<std::path::Path>) -> Result<Self, GatewayError> {
        Ok(Self { inner: JsonStore::new(dir)? })
    }

    pub fn create(&self, request: CreateApprovalRequest) -> Result<Approval, GatewayError> {
        let action_hash = gateway_canon::canonical_hash(&request.action)?;
        let now = Utc::now();
        let approval = Approval {
            id: Uuid::new_v4(),
            approval_id: generate_approval_id(),
            org_id: request.org_id,
            interaction_id: request.interaction_id,
            uapk_id: request.uapk_id,
            agent_id: request.agent_id,
            action: request.action,
            counterparty: request.counterparty,
            context: request.context,
            reason_codes: request.reason_codes,
            status: ApprovalStatus::Pending,
            created_at: now,
            expires_at: Some(now + chrono::Duration::hours(request.expiry_hours)),
            decided_at: None,
            decided_by: None,
            decision_notes: None,
            override_token_hash: None,
            action_hash: Some(action_hash),
            override_token_expires_at: None,
            override_token_used_at: None,
        };
        self.inner.save(&approval)?;
        Ok(approval)
    }

    /// Fetch one approval, sweeping it to `expired` first if it's overdue.
    pub fn get(&self, approval_id: &str) -> Result<Option<Approval>, GatewayError> {
        self.sweep_if_due(approval_id)?;
        self.inner.get(approval_id)
    }

    pub fn list_for_org(&self, org_id: Uuid) -> Result<Vec<Approval>, GatewayError> {
        Ok(self.inner.list()?.into_iter().filter(|a| a.org_id == org_id).collect())
    }

    pub fn list_pending_for_org(&self, org_id: Uuid) -> Result<Vec<Approval>, GatewayError> {
        for approval in self.list_for_org(org_id)? {
            self.sweep_if_due(&approval.approval_id)?;
        }
        Ok(self
            .list_for_org(org_id)?
            .into_iter()
            .filter(|a| a.status == ApprovalStatus::Pending)
            .collect())
    }

    fn sweep_if_due(&self, approval_id: &str) -> Result<(), GatewayError> {
        let Some(approval) = self.inner.get(approval_id)? else {
            return Ok(());
        };
        let due = approval.status == ApprovalStatus::Pending
            && approval.expires_at.is_some_and(|exp| Utc::now() > exp);
        if due {
            self.inner.update(approval_id, |a| {
                a.status = ApprovalStatus::Expired;
                Ok(())
            })?;
        }
        Ok(())
    }

    /// Approve a pending approval, minting a short-lived single-use
    /// override token. Returns the updated row and the raw token string.
    pub fn approve(
        &self,
        approval_id: &str,
        decided_by: &str,
        notes: Option<String>,
        override_expiry_seconds: i64,
        keypair: &GatewayKeypair,
    ) -> Result<(Approval, String), GatewayError> {
        let approval = self
            .get(approval_id)?
            .ok_or_else(|| GatewayError::NotFound(approval_id.to_string()))?;
        if approval.status != ApprovalStatus::Pending {
            return Err(GatewayError::InvalidTransition {
                from: format!("{:?}", approval.status),
                to: "approved".to_string(),
            });
        }
        let action_hash = approval
            .action_hash
            .clone()
            .ok_or_else(|| GatewayError::Validation("approval has no action_hash".to_string()))?;

        let now = Utc::now();
        let jti = format!("override-{}", Uuid::new_v4().simple());
        let claims = OverrideClaims {
            iss: "gateway".to_string(),
            sub: approval.approval_id.clone(),
            org_id: approval.org_id.to_string(),
            uapk_id: approval.uapk_id.clone(),
            agent_id: approval.agent_id.clone(),
            action_hash: action_hash.clone(),
            approval_id: approval.approval_id.clone(),
            iat: now.timestamp(),
            exp: (now + chrono::Duration::seconds(override_expiry_seconds)).timestamp(),
            jti,
        };
        let token = gateway_capability::issue_override_token(&claims, keypair)?;
        let token_hash = gateway_crypto::sha256_hex(token.as_bytes());
        let override_expires_at = now + chrono::Duration::seconds(override_expiry_seconds);

        let updated = self.inner.update(approval_id, |a| {
            a.status = ApprovalStatus::Approved;
            a.decided_at = Some(now);
            a.decided_by = Some(decided_by.to_string());
            a.decision_notes = notes.clone();
            a.override_token_hash = Some(token_hash.clone());
            a.override_token_expires_at = Some(override_expires_at);
            Ok(())
        })?;
        Ok((updated, token))
    }

    pub fn deny(&self, approval_id: &str, decided_by: &str, notes: Option<String>) -> Result<Approval, GatewayError> {
        let approval = self
            .get(approval_id)?
            .ok_or_else(|| GatewayError::NotFound(approval_id.to_string()))?;
        if approval.status != ApprovalStatus::Pending {
            return Err(GatewayError::InvalidTransition {
                from: format!("{:?}", approval.status),
                to: "denied".to_string(),
            });
        }
        self.inner.update(approval_id, |a| {
            a.status = ApprovalStatus::Denied;
            a.decided_at = Some(Utc::now());
            a.decided_by = Some(decided_by.to_string());
            a.decision_notes = notes.clone();
            Ok(())
        })
    }

    pub fn mark_override_used(&self, approval_id: &str) -> Result<Approval, GatewayError> {
        self.inner.update(approval_id, |a| {
            a.override_token_used_at = Some(Utc::now());
            Ok(())
        })
    }
}

pub struct UsedOverrideTokenStore {
    inner: JsonStore<UsedOverrideToken>,
}

impl UsedOverrideTokenStore {
    pub fn new(dir: impl AsRef<std::path::Path>) -> Result<Self, GatewayError> {
        Ok(Self { inner: JsonStore::new(dir)? })
    }

    /// Mark a token consumed. Fails with `GatewayError::Conflict` on a
    /// second use for the same `token_hash` — the primary-key uniqueness
    /// `§5`/invariant 7 rely on.
    pub fn redeem(&self, token_hash: &str, org_id: Uuid, approval_id: &str, action_hash: &str, expires_at: DateTime<Utc>) -> Result<(), GatewayError> {
        self.inner.insert_new(&UsedOverrideToken {
            token_hash: token_hash.to_string(),
            org_id,
            approval_id: approval_id.to_string(),
            action_hash: action_hash.to_string(),
            used_at: Utc::now(),
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn approval_request(org_id: Uuid) -> CreateApprovalRequest {
        CreateApprovalRequest {
            org_id,
            interaction_id: "ir-1".to_string(),
            uapk_id: "billing-bot".to_string(),
            agent_id: "billing-bot".to_string(),
            action: json!({"action": "payment:transfer", "parameters": {"amount": 500}}),
            counterparty: None,
            context: None,
            reason_codes: vec!["REQUIRES_HUMAN_APPROVAL".to_string()],
            expiry_hours: 24,
        }
    }

    #[test]
    fn approve_mints_override_token_and_stores_only_its_hash() {
        let store = ApprovalStore::new(tempdir().unwrap().into_path()).unwrap();
        let org_id = Uuid::new_v4();
        let approval = store.create(approval_request(org_id)).unwrap();
        let (keypair, _) = GatewayKeypair::generate().unwrap();

        let (updated, token) = store.approve(&approval.approval_id, "admin@acme.test", None, 300, &keypair).unwrap();
        assert_eq!(updated.status, ApprovalStatus::Approved);
        assert!(updated.override_token_hash.is_some());
        assert_ne!(updated.override_token_hash.unwrap(), token);
    }

    #[test]
    fn deny_is_terminal() {
        let store = ApprovalStore::new(tempdir().unwrap().into_path()).unwrap();
        let org_id = Uuid::new_v4();
        let approval = store.create(approval_request(org_id)).unwrap();
        store.deny(&approval.approval_id, "admin@acme.test", None).unwrap();
        let result = store.deny(&approval.approval_id, "admin@acme.test", None);
        assert!(result.is_err());
    }

    #[test]
    fn used_override_token_cannot_be_redeemed_twice() {
        let store = UsedOverrideTokenStore::new(tempdir().unwrap().into_path()).unwrap();
        let org_id = Uuid::new_v4();
        store.redeem("hash-1", org_id, "appr-1", "action-hash", Utc::now()).unwrap();
        let result = store.redeem("hash-1", org_id, "appr-1", "action-hash", Utc::now());
        assert!(matches!(result, Err(GatewayError::Conflict(_))));
    }

    #[test]
    fn pending_approval_past_expiry_sweeps_to_expired_on_read() {
        let store = ApprovalStore::new(tempdir().unwrap().into_path()).unwrap();
        let org_id = Uuid::new_v4();
        let mut request = approval_request(org_id);
        request.expiry_hours = 0;
        let approval = store.create(request).unwrap();
        // Force expiry into the past so the opportunistic sweep fires.
        store.inner.update(&approval.approval_id, |a| {
            a.expires_at = Some(Utc::now() - chrono::Duration::seconds(1));
            Ok(())
        }).unwrap();
        let fetched = store.get(&approval.approval_id).unwrap().unwrap();
        assert_eq!(fetched.status, ApprovalStatus::Expired);
    }
}
