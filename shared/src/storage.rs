//! Native snapshot storage for hosts that run the core without a key-value
//! shell, plus a write-through wrapper around [`PreferenceStore`].

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::model::{LocationPatch, UserPatch};
use crate::preferences::{
    PersistRequest, PersistenceError, PreferenceError, PreferenceState, PreferenceStore,
    Rehydration,
};

pub trait SnapshotStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError>;
    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), PersistenceError>;
}

#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| PersistenceError::Storage("lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), PersistenceError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| PersistenceError::Storage("lock poisoned".into()))?;
        entries.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use sqlite::SqliteSnapshotStore;

#[cfg(not(target_arch = "wasm32"))]
mod sqlite {
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::{SystemTime, UNIX_EPOCH};

    use rusqlite::{params, Connection, OptionalExtension};

    use super::SnapshotStore;
    use crate::preferences::PersistenceError;

    fn storage_err(e: rusqlite::Error) -> PersistenceError {
        PersistenceError::Storage(e.to_string())
    }

    /// Single-table SQLite key-value store.
    pub struct SqliteSnapshotStore {
        conn: Mutex<Connection>,
    }

    impl SqliteSnapshotStore {
        pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
            Self::init(Connection::open(path).map_err(storage_err)?)
        }

        pub fn open_in_memory() -> Result<Self, PersistenceError> {
            Self::init(Connection::open_in_memory().map_err(storage_err)?)
        }

        fn init(conn: Connection) -> Result<Self, PersistenceError> {
            conn.execute_batch(
                r"
                CREATE TABLE IF NOT EXISTS kv (
                    key TEXT PRIMARY KEY,
                    value BLOB NOT NULL,
                    updated_at_ms INTEGER NOT NULL
                );
                ",
            )
            .map_err(storage_err)?;
            Ok(Self { conn: Mutex::new(conn) })
        }

        fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, PersistenceError> {
            self.conn
                .lock()
                .map_err(|_| PersistenceError::Storage("lock poisoned".into()))
        }
    }

    impl SnapshotStore for SqliteSnapshotStore {
        fn load(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
            self.lock()?
                .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
                .optional()
                .map_err(storage_err)
        }

        fn save(&self, key: &str, bytes: &[u8]) -> Result<(), PersistenceError> {
            let now_ms = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
                .unwrap_or(0);
            self.lock()?
                .execute(
                    "INSERT INTO kv (key, value, updated_at_ms) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                    updated_at_ms = excluded.updated_at_ms",
                    params![key, bytes, now_ms],
                )
                .map(|_| ())
                .map_err(storage_err)
        }
    }
}

/// A [`PreferenceStore`] that rehydrates from `S` on open and writes every
/// persisted mutation straight back. Write failures are logged; in-memory
/// state is kept either way.
pub struct LocalPreferences<S: SnapshotStore> {
    store: PreferenceStore,
    backend: S,
}

impl<S: SnapshotStore> LocalPreferences<S> {
    pub fn open(backend: S) -> (Self, Rehydration) {
        Self::open_with(PreferenceStore::new(), backend)
    }

    pub fn open_with(mut store: PreferenceStore, backend: S) -> (Self, Rehydration) {
        let bytes = match backend.load(store.storage_key()) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "snapshot load failed, starting from defaults");
                None
            }
        };
        let outcome = store.rehydrate(bytes.as_deref());
        (Self { store, backend }, outcome)
    }

    pub fn state(&self) -> &PreferenceState {
        self.store.state()
    }

    pub fn store_mut(&mut self) -> &mut PreferenceStore {
        &mut self.store
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn set_language(&mut self, code: &str) -> Result<(), PreferenceError> {
        let request = self.store.set_language(code)?;
        self.write(request);
        Ok(())
    }

    pub fn set_location(&mut self, patch: LocationPatch) {
        let request = self.store.set_location(patch);
        self.write(request);
    }

    pub fn set_offline(&mut self, offline: bool) {
        self.store.set_offline(offline);
    }

    pub fn set_user(&mut self, patch: UserPatch) {
        let request = self.store.set_user(patch);
        self.write(request);
    }

    fn write(&self, request: Option<PersistRequest>) {
        let Some(PersistRequest { key, bytes }) = request else {
            return;
        };
        match self.backend.save(&key, &bytes) {
            Ok(()) => debug!(%key, len = bytes.len(), "snapshot written"),
            Err(e) => warn!(%key, error = %e, "snapshot write failed"),
        }
    }
}
