// token_store.rs — CapabilityToken persistence and lifecycle (§4.I).
//
// Issuance requires the referenced manifest (if any) to exist and be
// `active`, and the requested capabilities to be a subset of the
// manifest's declared `capabilities.requested` (glob-expanded) — invariant
// 5 of §8. Revocation is a field flip; bulk-revoke by agent scans and
// updates every matching token with no audit entry (open question,
// resolved: current behavior inserts no record).

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::GatewayError;
use crate::manifest::ManifestStore;
use crate::model::{generate_token_id, CapabilityToken, ManifestStatus, TokenConstraints};
use crate::store::JsonStore;

pub struct CapabilityTokenStore {
    inner: JsonStore<CapabilityToken>,
}

pub struct IssueTokenRequest {
    pub org_id: Uuid,
    pub agent_id: String,
    pub manifest_id: Option<Uuid>,
    pub uapk_id: Option<String>,
    pub capabilities: Vec<String>,
    pub expires_in_seconds: i64,
    pub issued_by: String,
    pub constraints: TokenConstraints,
    pub max_actions: Option<u64>,
}

impl CapabilityTokenStore {
    pub fn new(dir: impl AsRef<std::path::Path>) -> Result<Self, GatewayError> {
        Ok(Self { inner: JsonStore::new(dir)? })
    }

    pub fn issue(&self, manifests: &ManifestStore, request: IssueTokenRequest) -> Result<CapabilityToken, GatewayError> {
        if let Some(manifest_id) = request.manifest_id {
            let manifest = manifests
                .get(manifest_id)?
                .ok_or_else(|| GatewayError::NotFound(format!("manifest {manifest_id}")))?;
            if manifest.status != ManifestStatus::Active {
                return Err(GatewayError::Validation(format!(
                    "manifest {manifest_id} is {:?}, not active",
                    manifest.status
                )));
            }
            let allowed = manifest.requested_capabilities();
            if !gateway_capability::is_subset_of(&request.capabilities, &allowed) {
                return Err(GatewayError::Validation(
                    "requested capabilities are not a subset of the manifest's declared capabilities".to_string(),
                ));
            }
        }

        let now = Utc::now();
        let token = CapabilityToken {
            id: Uuid::new_v4(),
            token_id: generate_token_id(),
            org_id: request.org_id,
            agent_id: request.agent_id,
            manifest_id: request.manifest_id,
            uapk_id: request.uapk_id,
            capabilities: request.capabilities,
            issued_at: now,
            expires_at: now + chrono::Duration::seconds(request.expires_in_seconds),
            issued_by: request.issued_by,
            constraints: request.constraints,
            max_actions: request.max_actions,
            actions_used: 0,
            revoked: false,
            revoked_at: None,
            revoked_reason: None,
        };
        self.inner.save(&token)?;
        Ok(token)
    }

    pub fn get(&self, token_id: &str) -> Result<Option<CapabilityToken>, GatewayError> {
        self.inner.get(token_id)
    }

    pub fn list_for_org(&self, org_id: Uuid) -> Result<Vec<CapabilityToken>, GatewayError> {
        Ok(self.inner.list()?.into_iter().filter(|t| t.org_id == org_id).collect())
    }

    pub fn revoke(&self, token_id: &str, reason: Option<String>) -> Result<CapabilityToken, GatewayError> {
        self.inner.update(token_id, |t| {
            t.revoked = true;
            t.revoked_at = Some(Utc::now());
            t.revoked_reason = reason;
            Ok(())
        })
    }

    /// Revoke every non-revoked token for `agent_id` within `org_id`.
    /// Returns the count revoked. Writes no audit entry.
    pub fn revoke_all_for_agent(&self, org_id: Uuid, agent_id: &str) -> Result<u64, GatewayError> {
        let mut count = 0;
        for token in self.list_for_org(org_id)? {
            if token.agent_id == agent_id && !token.revoked {
                self.revoke(&token.token_id, Some("bulk revoke".to_string()))?;
                count += 1;
            }
        }
        Ok(count)
    }

    /// Increment `actions_used` for a token that just admitted an action.
    pub fn increment_actions_used(&self, token_id: &str) -> Result<CapabilityToken, GatewayError> {
        self.inner.update(token_id, |t| {
            t.actions_used += 1;
            Ok(())
        })
    }

    /// `!revoked ∧ expires_at > now ∧ actions_used < max_actions` (invariant 6 & §4.K step 2).
    pub fn validate(&self, token_id: &str, now: DateTime<Utc>) -> Result<CapabilityToken, GatewayError> {
        let token = self
            .inner
            .get(token_id)?
            .ok_or_else(|| GatewayError::Authentication("unknown capability token".to_string()))?;
        if !token.is_valid(now) {
            return Err(GatewayError::Authentication("capability token is revoked, expired, or over its action limit".to_string()));
        }
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn stores() -> (CapabilityTokenStore, ManifestStore) {
        let dir = tempdir().unwrap().into_path();
        (
            CapabilityTokenStore::new(dir.join("tokens")).unwrap(),
            ManifestStore::new(dir.join("manifests")).unwrap(),
        )
    }

    #[test]
    fn issue_without_manifest_skips_subset_check() {
        let (tokens, manifests) = stores();
        let token = tokens
            .issue(
                &manifests,
                IssueTokenRequest {
                    org_id: Uuid::new_v4(),
                    agent_id: "billing-bot".to_string(),
                    manifest_id: None,
                    uapk_id: Some("billing-bot".to_string()),
                    capabilities: vec!["email:send".to_string()],
                    expires_in_seconds: 3600,
                    issued_by: "gateway".to_string(),
                    constraints: TokenConstraints::default(),
                    max_actions: None,
                },
            )
            .unwrap();
        assert!(token.token_id.starts_with("cap-"));
    }

    #[test]
    fn issue_rejects_capabilities_outside_manifest() {
        let (tokens, manifests) = stores();
        let org_id = Uuid::new_v4();
        let manifest = manifests
            .create(org_id, "billing-bot", "1.0.0", json!({"capabilities": {"requested": ["email:send"]}}), None)
            .unwrap();
        manifests.activate(manifest.id).unwrap();

        let result = tokens.issue(
            &manifests,
            IssueTokenRequest {
                org_id,
                agent_id: "billing-bot".to_string(),
                manifest_id: Some(manifest.id),
                uapk_id: Some("billing-bot".to_string()),
                capabilities: vec!["payment:transfer".to_string()],
                expires_in_seconds: 3600,
                issued_by: "gateway".to_string(),
                constraints: TokenConstraints::default(),
                max_actions: None,
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn issue_rejects_inactive_manifest() {
        let (tokens, manifests) = stores();
        let org_id = Uuid::new_v4();
        let manifest = manifests
            .create(org_id, "billing-bot", "1.0.0", json!({"capabilities": {"requested": ["email:send"]}}), None)
            .unwrap();

        let result = tokens.issue(
            &manifests,
            IssueTokenRequest {
                org_id,
                agent_id: "billing-bot".to_string(),
                manifest_id: Some(manifest.id),
                uapk_id: Some("billing-bot".to_string()),
                capabilities: vec!["email:send".to_string()],
                expires_in_seconds: 3600,
                issued_by: "gateway".to_string(),
                constraints: TokenConstraints::default(),
                max_actions: None,
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn revoke_all_for_agent_counts_and_skips_already_revoked() {
        let (tokens, manifests) = stores();
        let org_id = Uuid::new_v4();
        let req = |agent: &str| IssueTokenRequest {
            org_id,
            agent_id: agent.to_string(),
            manifest_id: None,
            uapk_id: Some(agent.to_string()),
            capabilities: vec!["email:send".to_string()],
            expires_in_seconds: 3600,
            issued_by: "gateway".to_string(),
            constraints: TokenConstraints::default(),
            max_actions: None,
        };
        tokens.issue(&manifests, req("billing-bot")).unwrap();
        tokens.issue(&manifests, req("billing-bot")).unwrap();
        tokens.issue(&manifests, req("other-bot")).unwrap();

        let count = tokens.revoke_all_for_agent(org_id, "billing-bot").unwrap();
        assert_eq!(count, 2);
        assert_eq!(tokens.revoke_all_for_agent(org_id, "billing-bot").unwrap(), 0);
    }

    #[test]
    fn actions_used_equal_to_max_denies_next_admission() {
        let (tokens, manifests) = stores();
        let token = tokens
            .issue(
                &manifests,
                IssueTokenRequest {
                    org_id: Uuid::new_v4(),
                    agent_id: "bot".to_string(),
                    manifest_id: None,
                    uapk_id: None,
                    capabilities: vec!["email:send".to_string()],
                    expires_in_seconds: 3600,
                    issued_by: "gateway".to_string(),
                    constraints: TokenConstraints::default(),
                    max_actions: Some(1),
                },
            )
            .unwrap();
        tokens.increment_actions_used(&token.token_id).unwrap();
        let result = tokens.validate(&token.token_id, Utc::now());
        assert!(result.is_err());
    }
}
