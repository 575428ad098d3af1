//! In-memory store

use super::EntityStore;
use crate::profile::ProfileSnapshot;
use crate::Result;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Process-lifetime store backed by a locked map
///
/// Entries are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, ProfileSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a half-inserted entry,
    // so a poisoned map is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, ProfileSnapshot>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, ProfileSnapshot>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl EntityStore for MemoryStore {
    fn get(&self, identity: &str) -> Result<Option<ProfileSnapshot>> {
        Ok(self.read().get(identity).cloned())
    }

    fn put(&self, identity: &str, details: Value) -> Result<ProfileSnapshot> {
        let snapshot = ProfileSnapshot::new(identity, details);
        self.write().insert(identity.to_string(), snapshot.clone());
        tracing::debug!(identity, "Stored profile in memory");
        Ok(snapshot)
    }

    fn delete(&self, identity: &str) -> Result<bool> {
        Ok(self.write().remove(identity).is_some())
    }

    fn all(&self) -> Result<Vec<ProfileSnapshot>> {
        Ok(self.read().values().cloned().collect())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.read().len())
    }

    fn clear(&self) -> Result<usize> {
        let mut entries = self.write();
        let removed = entries.len();
        entries.clear();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_concurrent_puts_lose_nothing() {
        let store = Arc::new(MemoryStore::new());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..50 {
                        let id = format!("user-{}-{}", t, i);
                        store.put(&id, json!({ "login": id })).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len().unwrap(), 400);
        for snapshot in store.all().unwrap() {
            assert_eq!(snapshot.details["login"], snapshot.identity.as_str());
        }
    }

    #[test]
    fn test_all_is_restartable() {
        let store = MemoryStore::new();
        store.put("a", json!({})).unwrap();
        store.put("b", json!({})).unwrap();

        let snapshot = store.all().unwrap();
        store.put("c", json!({})).unwrap();

        // Earlier view is unaffected by later writes
        assert_eq!(snapshot.len(), 2);
        let ids: Vec<&str> = snapshot.iter().map(|s| s.identity.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(store.all().unwrap().len(), 3);
    }
}
