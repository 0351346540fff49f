// store.rs — AuditStore: persistence for InteractionRecords, one JSON file
// per record (the same one-file-per-entity shape as a goal-run store),
// plus an in-memory last-hash cache per `(org_id, uapk_id)` chain.
//
// The cache *is* the row lock §5 describes: `seal()` takes the store's
// mutex, reads the cached `prev`, computes the new record, writes it, and
// updates the cache — all while holding the lock, so concurrent writers to
// the same chain serialize and none observes a stale `prev`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::AuditError;
use crate::record::InteractionRecord;

type ChainKey = (String, String);

pub struct AuditStore {
    records_dir: PathBuf,
    /// Last `record_hash` written for each `(org_id, uapk_id)` chain.
    last_hash: Mutex<HashMap<ChainKey, String>>,
}

impl AuditStore {
    /// Open (or create) a store backed by the given directory, recovering
    /// the last-hash cache from any records already on disk.
    pub fn open(store_dir: impl AsRef<Path>) -> Result<Self, AuditError> {
        let store_dir = store_dir.as_ref().to_path_buf();
        let records_dir = store_dir.join("records");
        fs::create_dir_all(&records_dir).map_err(|source| AuditError::OpenFailed {
            path: records_dir.clone(),
            source,
        })?;

        let store = Self {
            records_dir,
            last_hash: Mutex::new(HashMap::new()),
        };
        store.rebuild_cache()?;
        Ok(store)
    }

    fn rebuild_cache(&self) -> Result<(), AuditError> {
        let mut by_chain: HashMap<ChainKey, Vec<InteractionRecord>> = HashMap::new();
        for record in self.list_all()? {
            by_chain
                .entry((record.org_id.clone(), record.uapk_id.clone()))
                .or_default()
                .push(record);
        }
        let mut cache = self.last_hash.lock().expect("audit store mutex poisoned");
        for (key, mut records) in by_chain {
            records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.record_id.cmp(&b.record_id)));
            if let Some(last) = records.last() {
                cache.insert(key, last.record_hash.clone());
            }
        }
        Ok(())
    }

    fn record_path(&self, record_id: &str) -> PathBuf {
        self.records_dir.join(format!("{}.json", record_id))
    }

    /// Lock the store's chain-pointer table, returning the guard so the
    /// caller (the sealer) can read `prev`, write the record, and update
    /// the cache atomically with respect to other writers.
    pub fn lock_chains(&self) -> std::sync::MutexGuard<'_, HashMap<ChainKey, String>> {
        self.last_hash.lock().expect("audit store mutex poisoned")
    }

    /// Persist a record to disk. Does not touch the last-hash cache — the
    /// caller updates it while still holding the lock from
    /// [`AuditStore::lock_chains`].
    pub fn persist(&self, record: &InteractionRecord) -> Result<(), AuditError> {
        let path = self.record_path(&record.record_id);
        let json = serde_json::to_string_pretty(record)?;
        fs::write(&path, json).map_err(|source| AuditError::Io { path, source })?;
        Ok(())
    }

    /// Fetch one record by id.
    pub fn get(&self, record_id: &str) -> Result<Option<InteractionRecord>, AuditError> {
        let path = self.record_path(record_id);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path).map_err(|source| AuditError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    /// All records across all chains, in no particular order.
    pub fn list_all(&self) -> Result<Vec<InteractionRecord>, AuditError> {
        let mut records = Vec::new();
        let entries = fs::read_dir(&self.records_dir).map_err(|source| AuditError::Io {
            path: self.records_dir.clone(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| AuditError::Io {
                path: self.records_dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let json = fs::read_to_string(&path).map_err(|source| AuditError::Io {
                    path: path.clone(),
                    source,
                })?;
                if let Ok(record) = serde_json::from_str::<InteractionRecord>(&json) {
                    records.push(record);
                }
            }
        }
        Ok(records)
    }

    /// All records in one chain, ordered by `created_at` ascending, ties
    /// broken by `record_id` ascending — matching §4.D's verification
    /// ordering exactly.
    pub fn list_chain(
        &self,
        org_id: &str,
        uapk_id: &str,
    ) -> Result<Vec<InteractionRecord>, AuditError> {
        let mut records: Vec<InteractionRecord> = self
            .list_all()?
            .into_iter()
            .filter(|r| r.org_id == org_id && r.uapk_id == uapk_id)
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.record_id.cmp(&b.record_id)));
        Ok(records)
    }

    /// All records for an org (any chain), newest first — backs
    /// `GET /orgs/{id}/records`.
    pub fn list_org(&self, org_id: &str) -> Result<Vec<InteractionRecord>, AuditError> {
        let mut records: Vec<InteractionRecord> = self
            .list_all()?
            .into_iter()
            .filter(|r| r.org_id == org_id)
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Decision, PolicyTrace, Reason};
    use chrono::Utc;
    use tempfile::tempdir;

    fn blank_record(id: &str, org: &str, uapk: &str) -> InteractionRecord {
        let now = Utc::now();
        InteractionRecord {
            record_id: id.to_string(),
            org_id: org.to_string(),
            uapk_id: uapk.to_string(),
            agent_id: uapk.to_string(),
            action_type: "email:send".to_string(),
            tool: "email".to_string(),
            request_hash: "h".to_string(),
            decision: Decision::Approved,
            reasons_json: vec![Reason::new("ALL_CHECKS_PASSED", "ok")],
            policy_trace_json: PolicyTrace::new(now, now),
            result_hash: None,
            previous_record_hash: None,
            created_at: now,
            record_hash: format!("hash-{}", id),
            request: serde_json::json!({}),
            result: None,
            risk_snapshot_json: None,
            decision_reason: None,
            duration_ms: 1,
            capability_token_id: None,
            gateway_signature: "sig".to_string(),
        }
    }

    #[test]
    fn persist_and_get_round_trip() {
        let dir = tempdir().unwrap();
        let store = AuditStore::open(dir.path()).unwrap();
        let record = blank_record("ir-1", "org-1", "bot-1");
        store.persist(&record).unwrap();

        let found = store.get("ir-1").unwrap().unwrap();
        assert_eq!(found.record_id, "ir-1");
    }

    #[test]
    fn get_missing_returns_none() {
        let dir = tempdir().unwrap();
        let store = AuditStore::open(dir.path()).unwrap();
        assert!(store.get("ir-missing").unwrap().is_none());
    }

    #[test]
    fn list_chain_filters_by_org_and_uapk() {
        let dir = tempdir().unwrap();
        let store = AuditStore::open(dir.path()).unwrap();
        store.persist(&blank_record("ir-1", "org-1", "bot-1")).unwrap();
        store.persist(&blank_record("ir-2", "org-1", "bot-2")).unwrap();
        store.persist(&blank_record("ir-3", "org-2", "bot-1")).unwrap();

        let chain = store.list_chain("org-1", "bot-1").unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].record_id, "ir-1");
    }

    #[test]
    fn reopening_rebuilds_last_hash_cache() {
        let dir = tempdir().unwrap();
        {
            let store = AuditStore::open(dir.path()).unwrap();
            store.persist(&blank_record("ir-1", "org-1", "bot-1")).unwrap();
        }
        let store = AuditStore::open(dir.path()).unwrap();
        let cache = store.lock_chains();
        assert_eq!(
            cache.get(&("org-1".to_string(), "bot-1".to_string())),
            Some(&"hash-ir-1".to_string())
        );
    }
}
