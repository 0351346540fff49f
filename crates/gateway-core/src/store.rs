// store.rs — JsonStore<T>: one-JSON-file-per-entity persistence, generalized
// from a goal-run store to any entity keyed by a stable string id.
//
// A single `Mutex` around every read-modify-write gives each store instance
// the "keyed store with transactional read-modify-write semantics" the
// design calls for: concurrent callers against the same store serialize,
// none observes a stale value between read and write.

use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::GatewayError;

/// An entity that owns a stable string identifier used as its file name.
pub trait Entity {
    fn entity_id(&self) -> String;
}

pub struct JsonStore<T> {
    dir: PathBuf,
    lock: Mutex<()>,
    _marker: PhantomData<T>,
}

impl<T> JsonStore<T>
where
    T: Entity + Serialize + DeserializeOwned + Clone,
{
    /// Open (or create) a store backed by the given directory.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, GatewayError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| GatewayError::OpenFailed {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
            _marker: PhantomData,
        })
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Save an entity, creating or overwriting its file.
    pub fn save(&self, entity: &T) -> Result<(), GatewayError> {
        let path = self.path_for(&entity.entity_id());
        let json = serde_json::to_string_pretty(entity)?;
        fs::write(&path, json).map_err(|source| GatewayError::Io { path, source })?;
        Ok(())
    }

    /// Fetch one entity by id.
    pub fn get(&self, id: &str) -> Result<Option<T>, GatewayError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path).map_err(|source| GatewayError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    /// All entities in the store, in no particular order.
    pub fn list(&self) -> Result<Vec<T>, GatewayError> {
        let mut items = Vec::new();
        let entries = fs::read_dir(&self.dir).map_err(|source| GatewayError::Io {
            path: self.dir.clone(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| GatewayError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let json = fs::read_to_string(&path).map_err(|source| GatewayError::Io {
                    path: path.clone(),
                    source,
                })?;
                if let Ok(item) = serde_json::from_str::<T>(&json) {
                    items.push(item);
                }
            }
        }
        Ok(items)
    }

    /// Delete an entity. Returns whether it existed.
    pub fn delete(&self, id: &str) -> Result<bool, GatewayError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|source| GatewayError::Io { path, source })?;
        Ok(true)
    }

    /// Insert a brand-new entity, failing if one with the same id already
    /// exists. Gives primary-key uniqueness semantics under the store's lock
    /// — the single-use guarantee `UsedOverrideToken` relies on.
    pub fn insert_new(&self, entity: &T) -> Result<(), GatewayError> {
        let _guard = self.lock.lock().expect("store mutex poisoned");
        if self.get(&entity.entity_id())?.is_some() {
            return Err(GatewayError::Conflict(entity.entity_id()));
        }
        self.save(entity)
    }

    /// Atomically load an entity, mutate it, and persist the result.
    pub fn update<F>(&self, id: &str, f: F) -> Result<T, GatewayError>
    where
        F: FnOnce(&mut T) -> Result<(), GatewayError>,
    {
        let _guard = self.lock.lock().expect("store mutex poisoned");
        let mut entity = self.get(id)?.ok_or_else(|| GatewayError::NotFound(id.to_string()))?;
        f(&mut entity)?;
        self.save(&entity)?;
        Ok(entity)
    }

    /// Atomically load-or-default an entity by id, mutate it, and persist
    /// the result. Used for counters that spring into existence on first
    /// use (`ActionCounter`).
    pub fn update_or_insert<F>(&self, id: &str, default: impl FnOnce() -> T, f: F) -> Result<T, GatewayError>
    where
        F: FnOnce(&mut T) -> Result<(), GatewayError>,
    {
        let _guard = self.lock.lock().expect("store mutex poisoned");
        let mut entity = match self.get(id)? {
            Some(entity) => entity,
            None => default(),
        };
        f(&mut entity)?;
        self.save(&entity)?;
        Ok(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Widget {
        id: String,
        count: i64,
    }

    impl Entity for Widget {
        fn entity_id(&self) -> String {
            self.id.clone()
        }
    }

    #[test]
    fn save_and_get_round_trip() {
        let dir = tempdir().unwrap();
        let store: JsonStore<Widget> = JsonStore::new(dir.path()).unwrap();
        store.save(&Widget { id: "w-1".to_string(), count: 1 }).unwrap();
        let found = store.get("w-1").unwrap().unwrap();
        assert_eq!(found.count, 1);
    }

    #[test]
    fn get_missing_returns_none() {
        let dir = tempdir().unwrap();
        let store: JsonStore<Widget> = JsonStore::new(dir.path()).unwrap();
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn insert_new_rejects_duplicate_id() {
        let dir = tempdir().unwrap();
        let store: JsonStore<Widget> = JsonStore::new(dir.path()).unwrap();
        store.insert_new(&Widget { id: "w-1".to_string(), count: 0 }).unwrap();
        let result = store.insert_new(&Widget { id: "w-1".to_string(), count: 0 });
        assert!(matches!(result, Err(GatewayError::Conflict(_))));
    }

    #[test]
    fn update_mutates_and_persists() {
        let dir = tempdir().unwrap();
        let store: JsonStore<Widget> = JsonStore::new(dir.path()).unwrap();
        store.save(&Widget { id: "w-1".to_string(), count: 1 }).unwrap();
        store.update("w-1", |w| { w.count += 1; Ok(()) }).unwrap();
        assert_eq!(store.get("w-1").unwrap().unwrap().count, 2);
    }

    #[test]
    fn update_or_insert_creates_default_on_first_use() {
        let dir = tempdir().unwrap();
        let store: JsonStore<Widget> = JsonStore::new(dir.path()).unwrap();
        let result = store
            .update_or_insert("w-1", || Widget { id: "w-1".to_string(), count: 0 }, |w| { w.count += 1; Ok(()) })
            .unwrap();
        assert_eq!(result.count, 1);
    }

    #[test]
    fn store_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("widgets");
        {
            let store: JsonStore<Widget> = JsonStore::new(&path).unwrap();
            store.save(&Widget { id: "w-1".to_string(), count: 5 }).unwrap();
        }
        let store: JsonStore<Widget> = JsonStore::new(&path).unwrap();
        assert_eq!(store.get("w-1").unwrap().unwrap().count, 5);
    }

    #[test]
    fn delete_removes_entity() {
        let dir = tempdir().unwrap();
        let store: JsonStore<Widget> = JsonStore::new(dir.path()).unwrap();
        store.save(&Widget { id: "w-1".to_string(), count: 0 }).unwrap();
        assert!(store.delete("w-1").unwrap());
        assert!(store.get("w-1").unwrap().is_none());
    }
}
