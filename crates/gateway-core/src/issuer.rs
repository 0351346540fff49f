// issuer.rs — CapabilityIssuer registration. The gateway itself is an
// implicit issuer ("gateway") backed by its own keypair, never stored here.

use chrono::Utc;
use uuid::Uuid;

use crate::error::GatewayError;
use crate::model::{CapabilityIssuer, IssuerStatus};
use crate::store::JsonStore;

pub struct CapabilityIssuerStore {
    inner: JsonStore<CapabilityIssuer>,
}

impl CapabilityIssuerStore {
    pub fn new(dir: impl AsRef<std::path::Path>) -> Result<Self, GatewayError> {
        Ok(Self { inner: JsonStore::new(dir)? })
    }

    pub fn register(&self, org_id: Uuid, issuer_id: &str, name: &str, public_key: &str) -> Result<CapabilityIssuer, GatewayError> {
        if self.find_by_issuer_id(org_id, issuer_id)?.is_some() {
            return Err(GatewayError::Conflict(format!("issuer_id '{issuer_id}' already registered in this org")));
        }
        let issuer = CapabilityIssuer {
            id: Uuid::new_v4(),
            org_id,
            issuer_id: issuer_id.to_string(),
            name: name.to_string(),
            public_key: public_key.to_string(),
            status: IssuerStatus::Active,
            created_at: Utc::now(),
            revoked_at: None,
        };
        self.inner.save(&issuer)?;
        Ok(issuer)
    }

    pub fn get(&self, id: Uuid) -> Result<Option<CapabilityIssuer>, GatewayError> {
        self.inner.get(&id.to_string())
    }

    pub fn list_for_org(&self, org_id: Uuid) -> Result<Vec<CapabilityIssuer>, GatewayError> {
        Ok(self.inner.list()?.into_iter().filter(|i| i.org_id == org_id).collect())
    }

    pub fn find_by_issuer_id(&self, org_id: Uuid, issuer_id: &str) -> Result<Option<CapabilityIssuer>, GatewayError> {
        Ok(self
            .inner
            .list()?
            .into_iter()
            .find(|i| i.org_id == org_id && i.issuer_id == issuer_id))
    }

    pub fn revoke(&self, id: Uuid) -> Result<CapabilityIssuer, GatewayError> {
        self.inner.update(&id.to_string(), |i| {
            i.status = IssuerStatus::Revoked;
            i.revoked_at = Some(Utc::now());
            Ok(())
        })
    }
}
