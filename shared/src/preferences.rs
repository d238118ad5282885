//! Process-wide user preferences: language, location, offline flag and user
//! identity.
//!
//! The store performs no I/O. Every persistent mutation hands back a
//! [`PersistRequest`] that the caller writes to durable storage; a failed
//! write never invalidates the in-memory state.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::locale::{translations, Language, TranslationTable};
use crate::model::{LocationPatch, LocationRecord, UserPatch, UserRecord};

pub const STORAGE_KEY: &str = "agro-plus-storage";
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PreferenceError {
    #[error("invalid language code: {0:?}")]
    InvalidLanguageCode(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersistenceError {
    #[error("snapshot encode failed: {0}")]
    Encode(String),

    #[error("snapshot decode failed: {0}")]
    Decode(String),

    #[error("snapshot version {found} is newer than supported {max}")]
    UnsupportedVersion { found: u32, max: u32 },

    #[error("storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceState {
    pub language: Language,
    pub location: LocationRecord,
    pub is_offline: bool,
    pub user: UserRecord,
    /// Always the table for `language`.
    pub translations: &'static TranslationTable,
}

impl Default for PreferenceState {
    fn default() -> Self {
        let language = Language::default();
        Self {
            language,
            location: LocationRecord::default(),
            is_offline: false,
            user: UserRecord::default(),
            translations: translations(language),
        }
    }
}

/// The persisted subset of [`PreferenceState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub version: u32,
    pub language: Language,
    pub location: LocationRecord,
    pub user: UserRecord,
}

impl Snapshot {
    pub fn encode(&self) -> Result<Vec<u8>, PersistenceError> {
        serde_json::to_vec(self).map_err(|e| PersistenceError::Encode(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, PersistenceError> {
        let snapshot: Self =
            serde_json::from_slice(bytes).map_err(|e| PersistenceError::Decode(e.to_string()))?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found: snapshot.version,
                max: SNAPSHOT_VERSION,
            });
        }
        Ok(snapshot)
    }
}

/// Bytes to write under `key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistRequest {
    pub key: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Language,
    Location,
    Offline,
    User,
    Rehydrated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rehydration {
    Restored,
    Missing,
    Discarded(PersistenceError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type Listener = Box<dyn Fn(&PreferenceState, Change) + Send + Sync>;

pub struct PreferenceStore {
    state: PreferenceState,
    storage_key: String,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl Default for PreferenceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PreferenceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreferenceStore")
            .field("state", &self.state)
            .field("storage_key", &self.storage_key)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl PreferenceStore {
    pub fn new() -> Self {
        Self::with_storage_key(STORAGE_KEY)
    }

    pub fn with_storage_key(key: impl Into<String>) -> Self {
        Self {
            state: PreferenceState::default(),
            storage_key: key.into(),
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn state(&self) -> &PreferenceState {
        &self.state
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            language: self.state.language,
            location: self.state.location.clone(),
            user: self.state.user.clone(),
        }
    }

    /// Unknown codes are rejected and leave the state untouched.
    #[must_use = "the returned request must be written to storage"]
    pub fn set_language(&mut self, code: &str) -> Result<Option<PersistRequest>, PreferenceError> {
        let language = Language::from_code(code)
            .ok_or_else(|| PreferenceError::InvalidLanguageCode(code.to_string()))?;

        self.state.language = language;
        self.state.translations = translations(language);
        info!(%language, "language changed");

        self.notify(Change::Language);
        Ok(self.persist_request())
    }

    #[must_use = "the returned request must be written to storage"]
    pub fn set_location(&mut self, patch: LocationPatch) -> Option<PersistRequest> {
        self.state.location.merge(patch);
        debug!(
            named = self.state.location.has_named_location(),
            coordinates = self.state.location.coordinates.is_some(),
            "location updated"
        );

        self.notify(Change::Location);
        self.persist_request()
    }

    /// Runtime only; resets to `false` on restart.
    pub fn set_offline(&mut self, offline: bool) {
        self.state.is_offline = offline;
        self.notify(Change::Offline);
    }

    #[must_use = "the returned request must be written to storage"]
    pub fn set_user(&mut self, patch: UserPatch) -> Option<PersistRequest> {
        self.state.user.merge(patch);
        debug!(anonymous = self.state.user.is_anonymous(), "user updated");

        self.notify(Change::User);
        self.persist_request()
    }

    /// Overlays a persisted snapshot onto the defaults. Anything unreadable
    /// falls back to defaults.
    pub fn rehydrate(&mut self, bytes: Option<&[u8]>) -> Rehydration {
        let outcome = match bytes.map(Snapshot::decode) {
            None => {
                self.reset_persisted();
                Rehydration::Missing
            }
            Some(Ok(snapshot)) => {
                self.state.language = snapshot.language;
                self.state.location = snapshot.location;
                self.state.user = snapshot.user;
                Rehydration::Restored
            }
            Some(Err(e)) => {
                warn!(error = %e, "discarding persisted preferences");
                self.reset_persisted();
                Rehydration::Discarded(e)
            }
        };
        self.state.translations = translations(self.state.language);
        info!(language = %self.state.language, ?outcome, "preferences rehydrated");

        self.notify(Change::Rehydrated);
        outcome
    }

    pub fn subscribe(&mut self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    fn reset_persisted(&mut self) {
        let defaults = PreferenceState::default();
        self.state.language = defaults.language;
        self.state.location = defaults.location;
        self.state.user = defaults.user;
    }

    fn notify(&self, change: Change) {
        for (_, listener) in &self.listeners {
            listener(&self.state, change);
        }
    }

    fn persist_request(&self) -> Option<PersistRequest> {
        match self.snapshot().encode() {
            Ok(bytes) => Some(PersistRequest { key: self.storage_key.clone(), bytes }),
            Err(e) => {
                warn!(error = %e, "preferences not persisted");
                None
            }
        }
    }
}
