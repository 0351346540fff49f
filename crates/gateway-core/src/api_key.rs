// api_key.rs — ApiKey lifecycle: issue (plaintext returned once), lookup by
// prefix, revoke.

use chrono::Utc;
use uuid::Uuid;

use crate::error::GatewayError;
use crate::model::{ApiKey, ApiKeyStatus};
use crate::store::JsonStore;

pub struct ApiKeyStore {
    inner: JsonStore<ApiKey>,
}

impl ApiKeyStore {
    pub fn new(dir: impl AsRef<std::path::Path>) -> Result<Self, GatewayError> {
        Ok(Self { inner: JsonStore::new(dir)? })
    }

    /// Issue a new key, returning the stored row and the plaintext — the
    /// plaintext is never persisted and this is the only time it's visible.
    pub fn issue(&self, org_id: Uuid, name: &str) -> Result<(ApiKey, String), GatewayError> {
        let (plaintext, prefix) = gateway_crypto::generate_api_key()?;
        let key_hash = gateway_crypto::hash_password(&plaintext)?;
        let key = ApiKey {
            id: Uuid::new_v4(),
            org_id,
            name: name.to_string(),
            key_prefix: prefix,
            key_hash,
            status: ApiKeyStatus::Active,
            created_at: Utc::now(),
            last_used_at: None,
        };
        self.inner.save(&key)?;
        Ok((key, plaintext))
    }

    pub fn get(&self, id: Uuid) -> Result<Option<ApiKey>, GatewayError> {
        self.inner.get(&id.to_string())
    }

    pub fn list_for_org(&self, org_id: Uuid) -> Result<Vec<ApiKey>, GatewayError> {
        Ok(self.inner.list()?.into_iter().filter(|k| k.org_id == org_id).collect())
    }

    /// Verify a presented plaintext key against the candidates sharing its
    /// 12-character prefix, returning the matching active row.
    pub fn verify(&self, plaintext: &str) -> Result<Option<ApiKey>, GatewayError> {
        if plaintext.len() < 12 {
            return Ok(None);
        }
        let prefix = &plaintext[..12];
        for candidate in self.inner.list()? {
            if candidate.key_prefix != prefix || candidate.status != ApiKeyStatus::Active {
                continue;
            }
            if gateway_crypto::verify_password(plaintext, &candidate.key_hash).is_ok() {
                return self.inner.update(&candidate.id.to_string(), |k| {
                    k.last_used_at = Some(Utc::now());
                    Ok(())
                }).map(Some);
            }
        }
        Ok(None)
    }

    pub fn revoke(&self, id: Uuid) -> Result<ApiKey, GatewayError> {
        self.inner.update(&id.to_string(), |k| {
            k.status = ApiKeyStatus::Revoked;
            Ok(())
        })
    }
}
