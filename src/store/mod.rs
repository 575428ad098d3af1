//! Entity store for profile snapshots
//!
//! The store is the sole owner of cached profiles. It is keyed uniquely by
//! identity, so at most one snapshot per identity exists at any time.
//!
//! Two backends are provided:
//! - [`MemoryStore`]: process-lifetime only, never fails
//! - [`SqliteStore`]: survives restarts, may surface database errors

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::config::{StoreBackend, StoreConfig};
use crate::profile::ProfileSnapshot;
use crate::Result;
use serde_json::Value;
use std::sync::Arc;

/// Durable identity → snapshot mapping
///
/// Implementations provide their own internal locking: concurrent calls must
/// never lose entries or expose a partially written snapshot.
pub trait EntityStore: Send + Sync {
    /// Look up a snapshot. Absence is `Ok(None)`, not an error.
    fn get(&self, identity: &str) -> Result<Option<ProfileSnapshot>>;

    /// Store `details` under `identity`, replacing any existing entry.
    ///
    /// Last write wins. A failed put leaves the previous entry untouched.
    fn put(&self, identity: &str, details: Value) -> Result<ProfileSnapshot>;

    /// Remove the entry for `identity`, returning whether one existed
    fn delete(&self, identity: &str) -> Result<bool>;

    /// Point-in-time copy of every snapshot, ordered by identity
    fn all(&self) -> Result<Vec<ProfileSnapshot>>;

    /// Number of cached snapshots
    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Remove every snapshot, returning how many were removed
    fn clear(&self) -> Result<usize>;
}

/// Open the store backend selected by configuration
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn EntityStore>> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory profile store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Sqlite => Ok(Arc::new(SqliteStore::open(config)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    /// Contract checks every backend must pass
    fn exercise_contract(store: &dyn EntityStore) {
        assert!(store.get("alice").unwrap().is_none());
        assert!(store.is_empty().unwrap());

        let stored = store.put("alice", json!({ "login": "alice", "v": 1 })).unwrap();
        assert_eq!(stored.identity, "alice");
        assert_eq!(store.get("alice").unwrap(), Some(stored));

        // Overwrite keeps a single entry
        store.put("alice", json!({ "login": "alice", "v": 2 })).unwrap();
        assert_eq!(store.len().unwrap(), 1);
        assert_eq!(store.get("alice").unwrap().unwrap().details["v"], 2);

        // Keys are case-sensitive
        assert!(store.get("Alice").unwrap().is_none());

        store.put("bob", json!({ "login": "bob" })).unwrap();
        let all: Vec<String> = store
            .all()
            .unwrap()
            .into_iter()
            .map(|s| s.identity)
            .collect();
        assert_eq!(all, vec!["alice", "bob"]);

        assert!(store.delete("alice").unwrap());
        assert!(!store.delete("alice").unwrap());
        assert!(store.get("alice").unwrap().is_none());

        assert_eq!(store.clear().unwrap(), 1);
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_memory_store_contract() {
        exercise_contract(&MemoryStore::new());
    }

    #[test]
    fn test_sqlite_store_contract() {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig {
            backend: StoreBackend::Sqlite,
            path: temp_dir.path().join("profiles.db"),
            wal_mode: true,
        };
        let store = SqliteStore::open(&config).unwrap();
        exercise_contract(&store);
    }

    #[test]
    fn test_open_store_selects_backend() {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig {
            backend: StoreBackend::Sqlite,
            path: temp_dir.path().join("nested").join("profiles.db"),
            wal_mode: false,
        };
        let store = open_store(&config).unwrap();
        store.put("octocat", json!({})).unwrap();
        assert!(config.path.exists());

        let memory = open_store(&StoreConfig::default()).unwrap();
        assert!(memory.is_empty().unwrap());
    }
}
