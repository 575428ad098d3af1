//! SQLite store implementation

use super::EntityStore;
use crate::config::StoreConfig;
use crate::profile::ProfileSnapshot;
use crate::{ProfileCacheError, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Persistent store that survives process restarts
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteStore {
    /// Open or create the profile database
    pub fn open(config: &StoreConfig) -> Result<Self> {
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        tracing::info!(path = %config.path.display(), "Opening profile database");

        let conn = Connection::open(&config.path)?;

        if config.wal_mode {
            conn.pragma_update(None, "journal_mode", "WAL")?;
        }

        let store = Self {
            conn: Mutex::new(conn),
            path: config.path.clone(),
        };
        store.init_schema()?;

        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn()?.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                identity TEXT PRIMARY KEY,
                details TEXT NOT NULL,
                fetched_at INTEGER NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ProfileCacheError::Storage("profile database lock poisoned".into()))
    }

    /// Get the database path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Raw row as read from the profiles table
type ProfileRow = (String, String, i64);

fn row_to_snapshot((identity, details, fetched_at): ProfileRow) -> Result<ProfileSnapshot> {
    let details: Value = serde_json::from_str(&details)?;
    let fetched_at = DateTime::<Utc>::from_timestamp_millis(fetched_at).ok_or_else(|| {
        ProfileCacheError::Storage(format!("invalid fetched_at for {}", identity))
    })?;

    Ok(ProfileSnapshot {
        identity,
        details,
        fetched_at,
    })
}

impl EntityStore for SqliteStore {
    fn get(&self, identity: &str) -> Result<Option<ProfileSnapshot>> {
        let row: Option<ProfileRow> = self
            .conn()?
            .query_row(
                "SELECT identity, details, fetched_at FROM profiles WHERE identity = ?",
                [identity],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        row.map(row_to_snapshot).transpose()
    }

    fn put(&self, identity: &str, details: Value) -> Result<ProfileSnapshot> {
        // Serialize before touching the database so a bad document never
        // disturbs the existing row
        let encoded = serde_json::to_string(&details)?;

        // Millisecond precision so the returned snapshot matches a later read
        let fetched_at = Utc::now().timestamp_millis();

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO profiles (identity, details, fetched_at) VALUES (?, ?, ?)",
            params![identity, encoded, fetched_at],
        )?;
        tx.commit()?;

        tracing::debug!(identity, "Stored profile in database");

        row_to_snapshot((identity.to_string(), encoded, fetched_at))
    }

    fn delete(&self, identity: &str) -> Result<bool> {
        let removed = self
            .conn()?
            .execute("DELETE FROM profiles WHERE identity = ?", [identity])?;
        Ok(removed > 0)
    }

    fn all(&self) -> Result<Vec<ProfileSnapshot>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT identity, details, fetched_at FROM profiles ORDER BY identity")?;

        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<rusqlite::Result<Vec<ProfileRow>>>()?;

        rows.into_iter().map(row_to_snapshot).collect()
    }

    fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM profiles", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn clear(&self) -> Result<usize> {
        tracing::info!(path = %self.path.display(), "Clearing profile database");
        let removed = self.conn()?.execute("DELETE FROM profiles", [])?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreBackend;
    use serde_json::json;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> StoreConfig {
        StoreConfig {
            backend: StoreBackend::Sqlite,
            path: dir.path().join("profiles.db"),
            wal_mode: true,
        }
    }

    #[test]
    fn test_store_creation() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::open(&config_in(&temp_dir)).unwrap();
        assert!(store.path().exists());
        assert_eq!(store.len().unwrap(), 0);
    }

    #[test]
    fn test_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(&temp_dir);

        let written = {
            let store = SqliteStore::open(&config).unwrap();
            store
                .put("octocat", json!({ "login": "octocat", "followers": ["alice"] }))
                .unwrap()
        };

        let store = SqliteStore::open(&config).unwrap();
        let loaded = store.get("octocat").unwrap().unwrap();
        assert_eq!(loaded, written);
        assert!(loaded.has_follower("alice"));
    }

    #[test]
    fn test_details_round_trip_key_order() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::open(&config_in(&temp_dir)).unwrap();

        let details: Value =
            serde_json::from_str(r#"{"login":"x","name":null,"nested":{"b":1,"a":[true,2.5]}}"#)
                .unwrap();
        store.put("x", details.clone()).unwrap();

        let loaded = store.get("x").unwrap().unwrap();
        assert_eq!(loaded.details, details);
        assert_eq!(
            serde_json::to_string(&loaded.details).unwrap(),
            r#"{"login":"x","name":null,"nested":{"b":1,"a":[true,2.5]}}"#
        );
    }
}
