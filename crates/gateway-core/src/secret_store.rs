// secret_store.rs — Secret storage and just-in-time decryption for
// connector dispatch. Plaintext never touches disk and lives only as long
// as the map the pipeline hands to a connector's `execute`.

use chrono::Utc;
use uuid::Uuid;

use crate::error::GatewayError;
use crate::model::Secret;
use crate::store::JsonStore;

pub struct SecretStore {
    inner: JsonStore<Secret>,
    cipher: gateway_crypto::SecretCipher,
}

impl SecretStore {
    pub fn new(dir: impl AsRef<std::path::Path>, cipher: gateway_crypto::SecretCipher) -> Result<Self, GatewayError> {
        Ok(Self { inner: JsonStore::new(dir)?, cipher })
    }

    pub fn set(&self, org_id: Uuid, name: &str, plaintext: &[u8], description: Option<String>) -> Result<Secret, GatewayError> {
        let encrypted_value = self.cipher.encrypt(plaintext)?;
        let now = Utc::now();
        let existing = self.inner.get(&format!("{org_id}_{name}"))?;
        let secret = Secret {
            id: existing.as_ref().map(|s| s.id).unwrap_or_else(Uuid::new_v4),
            org_id,
            name: name.to_string(),
            encrypted_value,
            description,
            created_at: existing.map(|s| s.created_at).unwrap_or(now),
            updated_at: now,
        };
        self.inner.save(&secret)?;
        Ok(secret)
    }

    pub fn list_for_org(&self, org_id: Uuid) -> Result<Vec<Secret>, GatewayError> {
        Ok(self.inner.list()?.into_iter().filter(|s| s.org_id == org_id).collect())
    }

    pub fn decrypt(&self, org_id: Uuid, name: &str) -> Result<Option<String>, GatewayError> {
        let Some(secret) = self.inner.get(&format!("{org_id}_{name}"))? else {
            return Ok(None);
        };
        let plaintext = self.cipher.decrypt(&secret.encrypted_value)?;
        Ok(Some(String::from_utf8_lossy(&plaintext).into_owned()))
    }

    /// Resolve every named secret for `org_id` into a plaintext map, for a
    /// single connector invocation. Missing secrets are silently skipped —
    /// the connector's own `resolve_param` leaves an unresolved
    /// `secret:<name>` reference in place, which surfaces as a request error
    /// rather than a gateway crash.
    pub fn resolve(&self, org_id: Uuid, names: &[String]) -> Result<std::collections::HashMap<String, String>, GatewayError> {
        let mut resolved = std::collections::HashMap::new();
        for name in names {
            if let Some(plaintext) = self.decrypt(org_id, name)? {
                resolved.insert(name.clone(), plaintext);
            }
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store() -> SecretStore {
        let key = gateway_crypto::SecretCipher::generate_key().unwrap();
        let cipher = gateway_crypto::SecretCipher::from_base64_key(&key).unwrap();
        SecretStore::new(tempdir().unwrap().into_path(), cipher).unwrap()
    }

    #[test]
    fn set_then_decrypt_round_trips() {
        let store = store();
        let org_id = Uuid::new_v4();
        store.set(org_id, "webhook-token", b"shh-secret", None).unwrap();
        assert_eq!(store.decrypt(org_id, "webhook-token").unwrap().unwrap(), "shh-secret");
    }

    #[test]
    fn decrypt_missing_returns_none() {
        let store = store();
        assert!(store.decrypt(Uuid::new_v4(), "missing").unwrap().is_none());
    }

    #[test]
    fn resolve_skips_unknown_names() {
        let store = store();
        let org_id = Uuid::new_v4();
        store.set(org_id, "known", b"value", None).unwrap();
        let resolved = store.resolve(org_id, &["known".to_string(), "unknown".to_string()]).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved.get("known").unwrap(), "value");
    }
}
