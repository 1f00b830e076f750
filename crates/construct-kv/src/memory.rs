//! In-Memory Key-Value Store
//!
//! Entries and access times live in two maps behind `parking_lot` locks.
//! When both are needed the entries lock is always taken first.
//!
//! The whole store can be written to and restored from a JSON snapshot
//! file so a cache survives restarts of the bridge.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::pattern::LikePattern;
use crate::store::{KvConfig, KvError, KvResult, KvStore, SweepStats};

/// In-memory key-value store
#[derive(Debug, Clone)]
pub struct InMemoryKvStore {
    /// Stored values by key, kept sorted for `keys`
    entries: Arc<RwLock<BTreeMap<String, Value>>>,
    /// Last read time by key
    access: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
    config: KvConfig,
}

/// On-disk form of a store
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    entries: BTreeMap<String, Value>,
    #[serde(default)]
    access: BTreeMap<String, DateTime<Utc>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::with_config(KvConfig::default())
    }

    pub fn with_config(config: KvConfig) -> Self {
        Self {
            entries: Arc::new(RwLock::new(BTreeMap::new())),
            access: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    pub fn config(&self) -> &KvConfig {
        &self.config
    }

    /// Restore a store from a snapshot written by [`InMemoryKvStore::save`].
    /// A missing file yields an empty store.
    pub fn load(path: impl AsRef<Path>, config: KvConfig) -> KvResult<Self> {
        let path = path.as_ref();
        let store = Self::with_config(config);
        if !path.exists() {
            debug!("No snapshot at {}, starting empty", path.display());
            return Ok(store);
        }

        let snapshot: Snapshot = serde_json::from_slice(&fs::read(path)?)?;
        info!(
            "Loaded {} entries from {}",
            snapshot.entries.len(),
            path.display()
        );
        *store.entries.write() = snapshot.entries;
        *store.access.write() = snapshot.access.into_iter().collect();
        Ok(store)
    }

    /// Write the store to `path`, replacing any previous snapshot
    pub fn save(&self, path: impl AsRef<Path>) -> KvResult<()> {
        let path = path.as_ref();
        let snapshot = {
            let entries = self.entries.read();
            let access = self.access.read();
            Snapshot {
                entries: entries.clone(),
                access: access.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            }
        };

        // Write beside the target and rename so readers never see a torn file
        let staging = path.with_extension("tmp");
        fs::write(&staging, serde_json::to_vec(&snapshot)?)?;
        fs::rename(&staging, path)?;
        debug!("Saved {} entries to {}", snapshot.entries.len(), path.display());
        Ok(())
    }

    fn check_capacity(&self, entries: &BTreeMap<String, Value>, new_keys: usize) -> KvResult<()> {
        if entries.len() + new_keys > self.config.max_entries {
            return Err(KvError::MaxEntriesReached(self.config.max_entries));
        }
        Ok(())
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for InMemoryKvStore {
    fn get(&self, key: &str) -> KvResult<Option<Value>> {
        let value = self.entries.read().get(key).cloned();
        self.record_access(key, Utc::now());
        Ok(value)
    }

    fn get_many(&self, keys: &[String], pattern: Option<&LikePattern>) -> KvResult<BTreeMap<String, Value>> {
        let found: BTreeMap<String, Value> = {
            let entries = self.entries.read();
            entries
                .iter()
                .filter(|(key, _)| keys.contains(*key) || pattern.is_some_and(|p| p.matches(key)))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        };

        let now = Utc::now();
        let mut access = self.access.write();
        for key in found.keys() {
            access.insert(key.clone(), now);
        }
        Ok(found)
    }

    fn keys(&self, pattern: Option<&LikePattern>) -> KvResult<Vec<String>> {
        let entries = self.entries.read();
        Ok(entries
            .keys()
            .filter(|key| pattern.is_none_or(|p| p.matches(key)))
            .cloned()
            .collect())
    }

    fn set(&self, key: &str, value: Value) -> KvResult<()> {
        let mut entries = self.entries.write();
        if !entries.contains_key(key) {
            self.check_capacity(&entries, 1)?;
        }
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn set_many(&self, values: Map<String, Value>) -> KvResult<()> {
        let mut entries = self.entries.write();
        let new_keys = values.keys().filter(|k| !entries.contains_key(*k)).count();
        self.check_capacity(&entries, new_keys)?;
        entries.extend(values);
        Ok(())
    }

    fn delete(&self, key: &str) -> KvResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn delete_many(&self, keys: &[String], pattern: Option<&LikePattern>) -> KvResult<usize> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| {
            !(keys.contains(key) || pattern.is_some_and(|p| p.matches(key)))
        });
        Ok(before - entries.len())
    }

    fn record_access(&self, key: &str, at: DateTime<Utc>) {
        self.access.write().insert(key.to_string(), at);
    }

    fn last_access(&self, key: &str) -> Option<DateTime<Utc>> {
        self.access.read().get(key).copied()
    }

    fn sweep_at(&self, now: DateTime<Utc>) -> KvResult<SweepStats> {
        // A window reaching past the earliest representable time leaves nothing idle
        let cutoff = now.checked_sub_signed(self.config.max_idle);
        let mut entries = self.entries.write();
        let mut access = self.access.write();

        let before = entries.len();
        if let Some(cutoff) = cutoff {
            entries.retain(|key, _| {
                !key.starts_with(&self.config.evictable_prefix)
                    || access.get(key).is_some_and(|at| *at > cutoff)
            });
        }
        let evicted = before - entries.len();

        let before = access.len();
        access.retain(|key, at| {
            cutoff.is_none_or(|cutoff| *at > cutoff) && entries.contains_key(key)
        });
        let pruned = before - access.len();

        if evicted > 0 || pruned > 0 {
            info!("Evicted {} idle entries, pruned {} access records", evicted, pruned);
        }
        Ok(SweepStats { evicted, pruned })
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}
