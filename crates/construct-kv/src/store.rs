//! Key-Value Store Trait
//!
//! The `kv_*` RPC methods talk to a [`KvStore`]. Values are arbitrary JSON
//! and keys are plain strings. Every store also tracks when each key was
//! last read, which drives the idle eviction of cache entries.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};

use crate::pattern::LikePattern;

/// Key prefix whose entries are subject to idle eviction
pub const CACHE_PREFIX: &str = "cache:";

/// Errors produced by key-value stores
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("Invalid key pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("Maximum number of entries reached: {0}")]
    MaxEntriesReached(usize),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type KvResult<T> = Result<T, KvError>;

/// Store configuration
#[derive(Debug, Clone)]
pub struct KvConfig {
    /// Evictable entries not read within this window are dropped by a sweep
    pub max_idle: Duration,
    /// Only keys with this prefix are ever evicted
    pub evictable_prefix: String,
    /// Upper bound on stored entries
    pub max_entries: usize,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            max_idle: Duration::days(30),
            evictable_prefix: CACHE_PREFIX.to_string(),
            max_entries: 100_000,
        }
    }
}

/// Outcome of one eviction sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Entries removed from the store
    pub evicted: usize,
    /// Access records dropped
    pub pruned: usize,
}

/// Key-value store with access tracking.
///
/// Implementations must be usable from several dispatching threads at once.
pub trait KvStore: Send + Sync {
    /// Value stored under `key`
    fn get(&self, key: &str) -> KvResult<Option<Value>>;

    /// Entries whose key is in `keys` or matches `pattern`
    fn get_many(&self, keys: &[String], pattern: Option<&LikePattern>) -> KvResult<BTreeMap<String, Value>>;

    /// All keys in ascending order, optionally filtered
    fn keys(&self, pattern: Option<&LikePattern>) -> KvResult<Vec<String>>;

    /// Insert or replace a single entry
    fn set(&self, key: &str, value: Value) -> KvResult<()>;

    /// Insert or replace every entry of `entries`
    fn set_many(&self, entries: Map<String, Value>) -> KvResult<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> KvResult<()>;

    /// Remove every key in `keys` and every key matching `pattern`.
    /// Returns the number of entries removed.
    fn delete_many(&self, keys: &[String], pattern: Option<&LikePattern>) -> KvResult<usize>;

    /// Record that `key` was read at `at`
    fn record_access(&self, key: &str, at: DateTime<Utc>);

    /// Last recorded read of `key`
    fn last_access(&self, key: &str) -> Option<DateTime<Utc>>;

    /// Evict idle cache entries and prune stale access records, measured
    /// against `now`.
    fn sweep_at(&self, now: DateTime<Utc>) -> KvResult<SweepStats>;

    fn sweep(&self) -> KvResult<SweepStats> {
        self.sweep_at(Utc::now())
    }

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
