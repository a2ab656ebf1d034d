//! Persistence port for client-side state.
//!
//! Stores persist through the [`Storage`] trait, a string key/value port
//! injected as `Arc<dyn Storage>`. Two backends ship with the crate:
//!
//! - [`MemoryStorage`] - process-local map, used by tests and ephemeral sessions
//! - [`FileStorage`] - one JSON file per key inside a data directory
//!
//! Every record is wrapped in a versioned envelope:
//!
//! ```text
//! {"version": 1, "data": <record>}
//! ```
//!
//! A record whose version is unknown or whose body no longer parses is
//! treated as absent so a format change never bricks a client.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Current persisted record format.
pub const SCHEMA_VERSION: u32 = 1;

/// Fixed storage keys for persisted records.
pub mod keys {
    /// Signed-in user and access token.
    pub const SESSION: &str = "comfycube_user";

    /// Cart lines.
    pub const CART: &str = "comfycube_cart";

    /// Wishlist entries.
    pub const WISHLIST: &str = "comfycube_wishlist";
}

/// Errors raised by a [`Storage`] backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("I/O error for key {key}: {source}")]
    Io {
        /// Key being accessed.
        key: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Record could not be serialized.
    #[error("failed to serialize record for key {key}: {source}")]
    Serialize {
        /// Key being written.
        key: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// Key contains characters that are not allowed in a storage key.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// Backend is unusable (e.g. a poisoned lock).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Durable key/value storage for serialized client state.
pub trait Storage: Send + Sync + fmt::Debug {
    /// Load the raw value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the value under `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    data: serde_json::Value,
}

/// Load and decode a versioned record.
///
/// Returns `Ok(None)` when the key is missing, the envelope has an unknown
/// version, or the body does not decode into `T`.
///
/// # Errors
///
/// Returns an error only if the backend itself fails.
pub fn load_record<T: DeserializeOwned>(
    storage: &dyn Storage,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = storage.load(key)? else {
        return Ok(None);
    };

    let envelope: Envelope = match serde_json::from_str(&raw) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(key, error = %e, "Discarding unreadable persisted record");
            return Ok(None);
        }
    };

    if envelope.version != SCHEMA_VERSION {
        warn!(
            key,
            version = envelope.version,
            expected = SCHEMA_VERSION,
            "Discarding persisted record with unknown schema version"
        );
        return Ok(None);
    }

    match serde_json::from_value(envelope.data) {
        Ok(record) => Ok(Some(record)),
        Err(e) => {
            warn!(key, error = %e, "Discarding persisted record that no longer decodes");
            Ok(None)
        }
    }
}

/// Encode and store a record in a versioned envelope.
///
/// # Errors
///
/// Returns an error if serialization or the backend write fails.
pub fn save_record<T: Serialize>(
    storage: &dyn Storage,
    key: &str,
    record: &T,
) -> Result<(), StorageError> {
    let body = serde_json::to_string(&EnvelopeRef {
        version: SCHEMA_VERSION,
        data: record,
    })
    .map_err(|source| StorageError::Serialize {
        key: key.to_string(),
        source,
    })?;
    storage.save(key, &body)
}

// =============================================================================
// MemoryStorage
// =============================================================================

/// In-memory storage backend.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Unavailable("memory storage lock poisoned".to_string()))
    }
}

impl Storage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries()?.remove(key);
        Ok(())
    }
}

// =============================================================================
// FileStorage
// =============================================================================

/// File-backed storage: `<dir>/<key>.json`.
///
/// Writes go to `<key>.json.tmp` first and are renamed into place, so a
/// crash mid-write leaves the previous record intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create a backend rooted at `dir`.
    ///
    /// The directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the record files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

impl Storage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(io_err)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)?;

        debug!(key, path = %path.display(), "Persisted record");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// Backend that rejects every write; lets tests exercise failure paths.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct ReadOnlyStorage {
    pub(crate) inner: MemoryStorage,
}

#[cfg(test)]
impl Storage for ReadOnlyStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.load(key)
    }

    fn save(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("read-only".to_string()))
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("read-only".to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Record {
        name: String,
        count: u32,
    }

    fn sample() -> Record {
        Record {
            name: "sofa".to_string(),
            count: 2,
        }
    }

    #[test]
    fn test_memory_save_load_remove() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.load("k").unwrap(), None);

        storage.save("k", "v").unwrap();
        assert_eq!(storage.load("k").unwrap().as_deref(), Some("v"));

        storage.remove("k").unwrap();
        storage.remove("k").unwrap();
        assert_eq!(storage.load("k").unwrap(), None);
    }

    #[test]
    fn test_record_envelope_carries_version() {
        let storage = MemoryStorage::new();
        save_record(&storage, keys::CART, &sample()).unwrap();

        let raw = storage.load(keys::CART).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], SCHEMA_VERSION);
        assert_eq!(value["data"]["name"], "sofa");

        let loaded: Option<Record> = load_record(&storage, keys::CART).unwrap();
        assert_eq!(loaded, Some(sample()));
    }

    #[test]
    fn test_unknown_version_is_discarded() {
        let storage = MemoryStorage::new();
        storage
            .save(keys::CART, r#"{"version":99,"data":{"name":"x","count":1}}"#)
            .unwrap();

        let loaded: Option<Record> = load_record(&storage, keys::CART).unwrap();
        assert_eq!(loaded, None);
    }

    #[test]
    fn test_garbage_is_discarded() {
        let storage = MemoryStorage::new();
        storage.save(keys::CART, "not json").unwrap();
        let loaded: Option<Record> = load_record(&storage, keys::CART).unwrap();
        assert_eq!(loaded, None);

        storage
            .save(keys::CART, r#"{"version":1,"data":{"unexpected":true}}"#)
            .unwrap();
        let loaded: Option<Record> = load_record(&storage, keys::CART).unwrap();
        assert_eq!(loaded, None);
    }

    #[test]
    fn test_file_storage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("state"));

        assert_eq!(storage.load(keys::SESSION).unwrap(), None);
        save_record(&storage, keys::SESSION, &sample()).unwrap();
        assert!(dir.path().join("state/comfycube_user.json").exists());

        // A second backend over the same directory sees the record
        let reopened = FileStorage::new(dir.path().join("state"));
        let loaded: Option<Record> = load_record(&reopened, keys::SESSION).unwrap();
        assert_eq!(loaded, Some(sample()));

        reopened.remove(keys::SESSION).unwrap();
        reopened.remove(keys::SESSION).unwrap();
        assert_eq!(storage.load(keys::SESSION).unwrap(), None);
    }

    #[test]
    fn test_file_storage_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        assert!(matches!(
            storage.save("../escape", "x"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(storage.load(""), Err(StorageError::InvalidKey(_))));
    }
}
