use crux_kv::KeyValue;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::event::Event;
use crate::preferences::PersistRequest;

pub type KvCapability = KeyValue<Event>;

pub const MAX_KEY_LENGTH: usize = 512;
pub const MAX_VALUE_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum KvError {
    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("value too large: {size} bytes exceeds maximum of {max} bytes")]
    ValueTooLarge { size: usize, max: usize },

    #[error("storage error: {message}")]
    Storage { message: String },
}

impl From<crux_kv::error::KeyValueError> for KvError {
    fn from(e: crux_kv::error::KeyValueError) -> Self {
        KvError::Storage { message: e.to_string() }
    }
}

pub fn validate_key(key: &str) -> Result<(), KvError> {
    let reason = if key.trim().is_empty() {
        "key cannot be empty"
    } else if key.len() > MAX_KEY_LENGTH {
        "key too long"
    } else if key.chars().any(char::is_control) {
        "key contains control characters"
    } else {
        return Ok(());
    };
    Err(KvError::InvalidKey { key: key.to_string(), reason: reason.to_string() })
}

/// Reads the preference snapshot. A missing key arrives as `Ok(None)`.
pub fn load_snapshot(kv: &KvCapability, key: &str) {
    kv.get(key.to_string(), |result| {
        Event::SnapshotLoaded(result.map_err(KvError::from))
    });
}

/// Writes the preference snapshot. Invalid writes are dropped with a warning
/// and never reach the shell.
pub fn save_snapshot(kv: &KvCapability, request: PersistRequest) {
    let PersistRequest { key, bytes } = request;
    let checked = validate_key(&key).and_then(|()| {
        if bytes.len() > MAX_VALUE_SIZE {
            Err(KvError::ValueTooLarge { size: bytes.len(), max: MAX_VALUE_SIZE })
        } else {
            Ok(())
        }
    });
    if let Err(e) = checked {
        warn!(error = %e, "preference snapshot not written");
        return;
    }
    kv.set(key, bytes, |result| {
        Event::SnapshotSaved(result.map(|_previous| ()).map_err(KvError::from))
    });
}
