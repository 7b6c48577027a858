//! Time-bounded key/value cache for upstream responses
//!
//! Two backends share the [`Cache`] trait: an in-process map for tests and
//! short-lived runs, and a directory of JSON files that survives restarts.
//! Expired entries are evicted lazily on read.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Shared cache contract
///
/// Implementations must be safe to share across concurrent fetchers.
pub trait Cache: Send + Sync {
    /// Value for `key`, or `None` when absent or expired
    fn get(&self, key: &str) -> Option<serde_json::Value>;

    /// Store `value` under `key` for `ttl`
    fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) -> Result<()>;

    /// Drop any entry for `key`
    fn invalidate(&self, key: &str) -> Result<()>;
}

/// Build a cache key from its parts, e.g. `["s2", "affiliations", id]`
pub fn cache_key(parts: &[&str]) -> String {
    parts.join(":")
}

/// Stored form of a cache entry
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    data: serde_json::Value,
    ts: DateTime<Utc>,
    ttl_secs: u64,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.ts);
        age.num_milliseconds() > (self.ttl_secs as i64).saturating_mul(1000)
    }
}

/// Clock used to stamp and age entries
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// In-process cache
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    clock: Clock,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_clock(system_clock())
    }

    /// Cache driven by an explicit clock (tests age entries without sleeping)
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Number of stored entries, expired or not
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<serde_json::Value> {
        let mut entries = self.entries.lock().ok()?;
        let now = (self.clock)();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                debug!(key = %key, "Cache entry expired");
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.data.clone()),
            None => None,
        }
    }

    fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::Cache("memory cache lock poisoned".to_string()))?;
        entries.insert(
            key.to_string(),
            CacheEntry {
                data: value,
                ts: (self.clock)(),
                ttl_secs: ttl.as_secs(),
            },
        );
        Ok(())
    }

    fn invalidate(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::Cache("memory cache lock poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

/// Directory-backed cache, one JSON file per key
///
/// File names are the first 16 hex digits of the key's SHA-256, so keys may
/// contain any characters.
pub struct FileCache {
    dir: PathBuf,
    clock: Clock,
}

impl FileCache {
    /// Open (creating if needed) a cache rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with_clock(dir, system_clock())
    }

    pub fn open_with_clock(dir: impl Into<PathBuf>, clock: Clock) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "File cache opened");
        Ok(Self { dir, clock })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        self.dir.join(format!("{}.json", &hex[..16]))
    }

    fn read_entry(path: &Path) -> Option<CacheEntry> {
        let content = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt cache entry, treating as miss");
                None
            }
        }
    }
}

impl Cache for FileCache {
    fn get(&self, key: &str) -> Option<serde_json::Value> {
        let path = self.entry_path(key);
        let entry = Self::read_entry(&path)?;
        if entry.is_expired((self.clock)()) {
            debug!(key = %key, "Cache entry expired");
            let _ = std::fs::remove_file(&path);
            return None;
        }
        Some(entry.data)
    }

    fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) -> Result<()> {
        let entry = CacheEntry {
            data: value,
            ts: (self.clock)(),
            ttl_secs: ttl.as_secs(),
        };
        let path = self.entry_path(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec(&entry)?)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn invalidate(&self, key: &str) -> Result<()> {
        match std::fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
