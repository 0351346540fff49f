// policy_store.rs — Persistence for gateway_policy::Policy. The engine
// itself (gateway-policy) is persistence-agnostic; this is the only place
// that knows policies live in a JsonStore.

use chrono::Utc;
use gateway_policy::{Policy, PolicyRules, PolicyScope, PolicyType};
use uuid::Uuid;

use crate::error::GatewayError;
use crate::store::{Entity, JsonStore};

impl Entity for Policy {
    fn entity_id(&self) -> String {
        self.id.to_string()
    }
}

pub struct PolicyStore {
    inner: JsonStore<Policy>,
}

pub struct CreatePolicyRequest {
    pub org_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub policy_type: PolicyType,
    pub scope: PolicyScope,
    pub priority: i32,
    pub rules: PolicyRules,
}

impl PolicyStore {
    pub fn new(dir: impl AsRef<std::path::Path>) -> Result<Self, GatewayError> {
        Ok(Self { inner: JsonStore::new(dir)? })
    }

    pub fn create(&self, request: CreatePolicyRequest) -> Result<Policy, GatewayError> {
        if !(-1000..=1000).contains(&request.priority) {
            return Err(GatewayError::Validation("priority must be within -1000..1000".to_string()));
        }
        let now = Utc::now();
        let policy = Policy {
            id: Uuid::new_v4(),
            org_id: request.org_id,
            name: request.name,
            description: request.description,
            policy_type: request.policy_type,
            scope: request.scope,
            priority: request.priority,
            rules: request.rules,
            enabled: true,
            created_at: now,
            updated_at: now,
        };
        self.inner.save(&policy)?;
        Ok(policy)
    }

    pub fn get(&self, id: Uuid) -> Result<Option<Policy>, GatewayError> {
        self.inner.get(&id.to_string())
    }

    pub fn list_for_org(&self, org_id: Uuid) -> Result<Vec<Policy>, GatewayError> {
        Ok(self.inner.list()?.into_iter().filter(|p| p.org_id == org_id).collect())
    }

    /// Enabled policies for an org, the set the pipeline evaluates against.
    pub fn list_enabled_for_org(&self, org_id: Uuid) -> Result<Vec<Policy>, GatewayError> {
        Ok(self.list_for_org(org_id)?.into_iter().filter(|p| p.enabled).collect())
    }

    pub fn set_enabled(&self, id: Uuid, enabled: bool) -> Result<Policy, GatewayError> {
        self.inner.update(&id.to_string(), |p| {
            p.enabled = enabled;
            p.updated_at = Utc::now();
            Ok(())
        })
    }

    pub fn delete(&self, id: Uuid) -> Result<bool, GatewayError> {
        self.inner.delete(&id.to_string())
    }
}
