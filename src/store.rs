use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to create state directory: {0}")]
    Io(#[from] std::io::Error),
}

/// String-keyed blob store. Writes are last-write-wins; nothing here is
/// transactional across keys.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Key-value table in a SQLite file
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and its parent directory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO kv (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

/// In-process store for tests and `--status` dry runs
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// The store the binary runs on: the SQLite file when it can be opened,
/// otherwise an in-process map so the timer still runs on defaults.
#[derive(Debug)]
pub enum StateStore {
    Sqlite(SqliteStore),
    Memory(MemoryStore),
}

impl StateStore {
    pub fn open_or_memory<P: AsRef<Path>>(path: P) -> Self {
        match SqliteStore::open(&path) {
            Ok(store) => StateStore::Sqlite(store),
            Err(e) => {
                warn!(
                    path = %path.as_ref().display(),
                    error = %e,
                    "state database unavailable, nothing will be saved"
                );
                StateStore::Memory(MemoryStore::new())
            }
        }
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self, StateStore::Sqlite(_))
    }
}

impl KeyValueStore for StateStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self {
            StateStore::Sqlite(store) => store.get(key),
            StateStore::Memory(store) => store.get(key),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        match self {
            StateStore::Sqlite(store) => store.set(key, value),
            StateStore::Memory(store) => store.set(key, value),
        }
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        match self {
            StateStore::Sqlite(store) => store.remove(key),
            StateStore::Memory(store) => store.remove(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn sqlite_set_get_overwrite_remove() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.get("settings").unwrap(), None);

        store.set("settings", "{}").unwrap();
        assert_eq!(store.get("settings").unwrap().as_deref(), Some("{}"));

        store.set("settings", r#"{"focusMinutes":50}"#).unwrap();
        assert_eq!(
            store.get("settings").unwrap().as_deref(),
            Some(r#"{"focusMinutes":50}"#)
        );

        store.remove("settings").unwrap();
        assert_eq!(store.get("settings").unwrap(), None);
    }

    #[test]
    fn sqlite_file_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("state.db");
        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.set("session_data", r#"{"date":"2026-01-01","count":3}"#).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(
            store.get("session_data").unwrap().as_deref(),
            Some(r#"{"date":"2026-01-01","count":3}"#)
        );
    }

    #[test]
    fn memory_store_behaves_like_a_map() {
        let mut store = MemoryStore::new();
        assert!(store.is_empty());
        store.set("a", "1").unwrap();
        store.set("a", "2").unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().as_deref(), Some("2"));
        store.remove("a").unwrap();
        store.remove("missing").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn unopenable_path_falls_back_to_memory() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();

        let mut store = StateStore::open_or_memory(blocker.join("state.db"));
        assert!(!store.is_persistent());
        store.set("settings", "{}").unwrap();
        assert_eq!(store.get("settings").unwrap().as_deref(), Some("{}"));

        let store = StateStore::open_or_memory(dir.path().join("ok").join("state.db"));
        assert!(store.is_persistent());
    }
}
