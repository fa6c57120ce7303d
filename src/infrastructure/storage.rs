// Key-value persistence backends and the namespaced collection envelope
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io error on key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("malformed document under key {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode document for key {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// String key-value store holding one serialized document per key.
///
/// `set` must be durable when it returns.
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn write_atomic(&self, key: &str, value: &str) -> io::Result<()> {
        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{}.json.tmp", key));
        {
            let mut file = File::create(&tmp)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;

        // Persist the rename itself
        #[cfg(unix)]
        File::open(&self.dir)?.sync_all()?;

        Ok(())
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.write_atomic(key, value).map_err(|source| StorageError::Io {
            key: key.to_string(),
            source,
        })
    }
}

/// Volatile storage, used by tests and for `storage.dir = ":memory:"`.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, simulating an unavailable medium.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Unavailable("memory storage lock poisoned".to_string()))
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(format!("write to {} rejected", key)));
        }
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

pub const PERSIST_VERSION: u32 = 0;

/// Envelope written for every namespace: `{ "state": ..., "version": 0 }`.
#[derive(Debug, Serialize, Deserialize)]
struct Persisted<T> {
    state: T,
    #[serde(default)]
    version: u32,
}

/// Load the collection stored under `key`, or `None` when nothing was written yet.
///
/// A document with a top-level `state` key is read as the envelope, anything
/// else as a bare collection. A document that fails to decode is an error,
/// never an empty collection.
pub fn load_namespace<T: DeserializeOwned>(
    storage: &dyn KeyValueStorage,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = storage.get(key)? else {
        return Ok(None);
    };
    let decode = |source: serde_json::Error| StorageError::Decode {
        key: key.to_string(),
        source,
    };

    let document: serde_json::Value = serde_json::from_str(&raw).map_err(decode)?;
    if document.get("state").is_none() {
        return serde_json::from_value(document).map(Some).map_err(decode);
    }

    let persisted: Persisted<T> = serde_json::from_value(document).map_err(decode)?;
    if persisted.version != PERSIST_VERSION {
        tracing::warn!("{} stored with version {}, reading as {}", key, persisted.version, PERSIST_VERSION);
    }
    Ok(Some(persisted.state))
}

/// Overwrite the whole collection stored under `key`.
pub fn save_namespace<T: Serialize>(
    storage: &dyn KeyValueStorage,
    key: &str,
    state: &T,
) -> Result<(), StorageError> {
    let document = Persisted {
        state,
        version: PERSIST_VERSION,
    };
    let raw = serde_json::to_string(&document).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })?;
    storage.set(key, &raw)
}
