use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, warn};

use super::GeolocationError;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("address cache at {} is unreadable: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("address cache at {} is not a JSON object: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Keyed store for remote address lookups. Entries never expire.
pub trait AddressCache: Send + Sync {
    fn lookup(&self, key: &str) -> Option<Value>;
    fn store(&self, key: &str, value: Value) -> Result<(), CacheError>;
}

/// Returns the cached value for `key`, or calls `fetch` and caches its result.
///
/// Fetch failures propagate and are never cached. A failed cache write only
/// costs a repeat lookup next time, so it is logged rather than returned.
pub fn cached_lookup<T, F>(cache: &dyn AddressCache, key: &str, fetch: F) -> Result<T, GeolocationError>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Result<T, GeolocationError>,
{
    if let Some(hit) = cache.lookup(key) {
        match serde_json::from_value::<T>(hit) {
            Ok(value) => {
                debug!(key, "address cache hit");
                return Ok(value);
            }
            Err(error) => warn!(key, %error, "discarding unreadable address cache entry"),
        }
    }

    let fetched = fetch()?;
    match serde_json::to_value(&fetched) {
        Ok(value) => {
            if let Err(error) = cache.store(key, value) {
                warn!(key, %error, "failed to persist address lookup");
            }
        }
        Err(error) => warn!(key, %error, "address lookup is not cacheable"),
    }

    Ok(fetched)
}

#[derive(Debug, Default)]
pub struct InMemoryAddressCache {
    entries: Mutex<HashMap<String, Value>>,
}

impl InMemoryAddressCache {
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AddressCache for InMemoryAddressCache {
    fn lookup(&self, key: &str) -> Option<Value> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn store(&self, key: &str, value: Value) -> Result<(), CacheError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        Ok(())
    }
}

/// Cache that remembers nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAddressCache;

impl AddressCache for NoopAddressCache {
    fn lookup(&self, _key: &str) -> Option<Value> {
        None
    }

    fn store(&self, _key: &str, _value: Value) -> Result<(), CacheError> {
        Ok(())
    }
}

/// JSON object file shared across runs. The whole file is rewritten on every store.
#[derive(Debug)]
pub struct FileAddressCache {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, Value>>,
}

impl FileAddressCache {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CacheError> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| CacheError::Corrupt {
                path: path.clone(),
                source,
            })?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(CacheError::Io { path, source }),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AddressCache for FileAddressCache {
    fn lookup(&self, key: &str) -> Option<Value> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn store(&self, key: &str, value: Value) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value);

        let serialized = serde_json::to_string_pretty(&*entries).map_err(|source| {
            CacheError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        std::fs::write(&self.path, serialized).map_err(|source| CacheError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
