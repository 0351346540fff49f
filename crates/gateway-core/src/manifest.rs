// manifest.rs — Manifest lifecycle state machine (§4.H):
//
//   pending --activate--> active --suspend--> suspended --activate--> active
//                            \                   /
//                             --revoke--> revoked
//
// Delete is permitted only from `pending`. The manifest hash is computed
// once at create time from the canonicalized `manifest_json` and never
// recomputed — mutating `manifest_json` after creation is not an operation
// this store exposes.

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::error::GatewayError;
use crate::model::{Manifest, ManifestStatus};
use crate::store::JsonStore;

pub struct ManifestStore {
    inner: JsonStore<Manifest>,
}

impl ManifestStore {
    pub fn new(dir: impl AsRef<std::path::Path>) -> Result<Self, GatewayError> {
        Ok(Self { inner: JsonStore::new(dir)? })
    }

    pub fn create(
        &self,
        org_id: Uuid,
        uapk_id: &str,
        version: &str,
        manifest_json: Value,
        description: Option<String>,
    ) -> Result<Manifest, GatewayError> {
        let manifest_hash = gateway_canon::canonical_hash(&manifest_json)?;
        let manifest = Manifest {
            id: Uuid::new_v4(),
            org_id,
            uapk_id: uapk_id.to_string(),
            version: version.to_string(),
            manifest_json,
            manifest_hash,
            status: ManifestStatus::Pending,
            description,
            created_at: Utc::now(),
        };
        self.inner.save(&manifest)?;
        Ok(manifest)
    }

    pub fn get(&self, id: Uuid) -> Result<Option<Manifest>, GatewayError> {
        self.inner.get(&id.to_string())
    }

    pub fn list_for_org(&self, org_id: Uuid) -> Result<Vec<Manifest>, GatewayError> {
        Ok(self.inner.list()?.into_iter().filter(|m| m.org_id == org_id).collect())
    }

    /// The most recently created manifest for `(org_id, uapk_id)`, regardless
    /// of status — callers check `status` themselves.
    pub fn find_latest(&self, org_id: Uuid, uapk_id: &str) -> Result<Option<Manifest>, GatewayError> {
        let mut matches: Vec<Manifest> = self
            .inner
            .list()?
            .into_iter()
            .filter(|m| m.org_id == org_id && m.uapk_id == uapk_id)
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matches.into_iter().next())
    }

    pub fn activate(&self, id: Uuid) -> Result<Manifest, GatewayError> {
        self.transition(id, ManifestStatus::Active, &[ManifestStatus::Pending, ManifestStatus::Suspended])
    }

    pub fn suspend(&self, id: Uuid) -> Result<Manifest, GatewayError> {
        self.transition(id, ManifestStatus::Suspended, &[ManifestStatus::Active])
    }

    pub fn revoke(&self, id: Uuid) -> Result<Manifest, GatewayError> {
        self.transition(id, ManifestStatus::Revoked, &[ManifestStatus::Active, ManifestStatus::Suspended])
    }

    /// Patch the mutable fields of a manifest — just `description`.
    /// `manifest_json`/`manifest_hash` are fixed at create time and not
    /// exposed for update here.
    pub fn update_description(&self, id: Uuid, description: Option<String>) -> Result<Manifest, GatewayError> {
        self.inner.update(&id.to_string(), |m| {
            m.description = description.clone();
            Ok(())
        })
    }

    fn transition(&self, id: Uuid, to: ManifestStatus, allowed_from: &[ManifestStatus]) -> Result<Manifest, GatewayError> {
        self.inner.update(&id.to_string(), |m| {
            if !allowed_from.contains(&m.status) {
                return Err(GatewayError::InvalidTransition {
                    from: format!("{:?}", m.status),
                    to: format!("{:?}", to),
                });
            }
            m.status = to;
            Ok(())
        })
    }

    /// Delete is permitted only from `pending`.
    pub fn delete(&self, id: Uuid) -> Result<(), GatewayError> {
        let manifest = self
            .inner
            .get(&id.to_string())?
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))?;
        if manifest.status != ManifestStatus::Pending {
            return Err(GatewayError::InvalidTransition {
                from: format!("{:?}", manifest.status),
                to: "deleted".to_string(),
            });
        }
        self.inner.delete(&id.to_string())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn store() -> ManifestStore {
        ManifestStore::new(tempdir().unwrap().into_path()).unwrap()
    }

    #[test]
    fn create_computes_manifest_hash() {
        let store = store();
        let manifest = store
            .create(Uuid::new_v4(), "billing-bot", "1.0.0", json!({"capabilities": {"requested": ["email:send"]}}), None)
            .unwrap();
        assert_eq!(manifest.status, ManifestStatus::Pending);
        assert!(!manifest.manifest_hash.is_empty());
    }

    #[test]
    fn activate_then_suspend_then_activate_succeeds() {
        let store = store();
        let manifest = store.create(Uuid::new_v4(), "bot", "1.0.0", json!({}), None).unwrap();
        let manifest = store.activate(manifest.id).unwrap();
        assert_eq!(manifest.status, ManifestStatus::Active);
        let manifest = store.suspend(manifest.id).unwrap();
        assert_eq!(manifest.status, ManifestStatus::Suspended);
        let manifest = store.activate(manifest.id).unwrap();
        assert_eq!(manifest.status, ManifestStatus::Active);
    }

    #[test]
    fn revoke_is_terminal() {
        let store = store();
        let manifest = store.create(Uuid::new_v4(), "bot", "1.0.0", json!({}), None).unwrap();
        let manifest = store.activate(manifest.id).unwrap();
        let manifest = store.revoke(manifest.id).unwrap();
        assert_eq!(manifest.status, ManifestStatus::Revoked);
        assert!(store.activate(manifest.id).is_err());
    }

    #[test]
    fn delete_only_from_pending() {
        let store = store();
        let manifest = store.create(Uuid::new_v4(), "bot", "1.0.0", json!({}), None).unwrap();
        let manifest = store.activate(manifest.id).unwrap();
        assert!(store.delete(manifest.id).is_err());

        let pending = store.create(Uuid::new_v4(), "bot-2", "1.0.0", json!({}), None).unwrap();
        assert!(store.delete(pending.id).is_ok());
    }
}
