//! Tag-invalidated cache storage.
//!
//! Every tag carries a generation counter. A value is stored together with
//! the generations of its tags observed *before* the value was loaded;
//! invalidating a tag bumps its generation, so anything loaded earlier can
//! neither be read back nor be written after the fact.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use metrics::counter;
use tracing::debug;

use super::keys::{CacheKey, CacheTag, CachedValue};
use super::lock::{rw_read, rw_write};
use super::registry::CacheRegistry;

const SOURCE: &str = "cache::store";
const METRIC_CACHE_HIT: &str = "gitpress_cache_hit_total";
const METRIC_CACHE_MISS: &str = "gitpress_cache_miss_total";
const METRIC_CACHE_INVALIDATE: &str = "gitpress_cache_invalidate_total";
const METRIC_CACHE_STALE_WRITE: &str = "gitpress_cache_stale_write_total";

pub type Generation = u64;

/// Tag generations observed at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagStamps(BTreeMap<CacheTag, Generation>);

impl TagStamps {
    fn is_current(&self, generations: &HashMap<CacheTag, Generation>) -> bool {
        self.0
            .iter()
            .all(|(tag, seen)| generations.get(tag).copied().unwrap_or_default() == *seen)
    }
}

/// Tag-based cache capability used by the content repository.
///
/// Fill protocol: `stamp` the owning tags, load the value, then `set` with
/// that stamp. A `set` whose stamp predates an invalidation is discarded.
#[async_trait]
pub trait TagCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Option<CachedValue>;

    async fn stamp(&self, tags: &[CacheTag]) -> TagStamps;

    /// Returns `false` when the write was discarded as stale.
    async fn set(&self, key: CacheKey, value: CachedValue, stamps: TagStamps) -> bool;

    async fn invalidate(&self, tag: &CacheTag);
}

struct Entry {
    value: CachedValue,
    stamps: TagStamps,
}

/// In-process [`TagCache`]. Entries live until their tag is invalidated.
pub struct MemoryTagCache {
    generations: RwLock<HashMap<CacheTag, Generation>>,
    entries: RwLock<HashMap<CacheKey, Entry>>,
    registry: CacheRegistry,
}

impl MemoryTagCache {
    pub fn new() -> Self {
        Self {
            generations: RwLock::new(HashMap::new()),
            entries: RwLock::new(HashMap::new()),
            registry: CacheRegistry::new(),
        }
    }

    pub fn generation(&self, tag: &CacheTag) -> Generation {
        rw_read(&self.generations, SOURCE, "generation")
            .get(tag)
            .copied()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: &CacheKey) -> Option<CachedValue> {
        // Lock order: generations, then entries.
        let generations = rw_read(&self.generations, SOURCE, "get");
        let entries = rw_read(&self.entries, SOURCE, "get");
        let entry = entries.get(key)?;
        entry
            .stamps
            .is_current(&generations)
            .then(|| entry.value.clone())
    }
}

impl Default for MemoryTagCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TagCache for MemoryTagCache {
    async fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        let value = self.lookup(key);
        if value.is_some() {
            counter!(METRIC_CACHE_HIT).increment(1);
        } else {
            counter!(METRIC_CACHE_MISS).increment(1);
        }
        value
    }

    async fn stamp(&self, tags: &[CacheTag]) -> TagStamps {
        let generations = rw_read(&self.generations, SOURCE, "stamp");
        TagStamps(
            tags.iter()
                .map(|tag| {
                    let generation = generations.get(tag).copied().unwrap_or_default();
                    (tag.clone(), generation)
                })
                .collect(),
        )
    }

    async fn set(&self, key: CacheKey, value: CachedValue, stamps: TagStamps) -> bool {
        // Holding the generations read lock keeps invalidation out until the
        // entry is in place.
        let generations = rw_read(&self.generations, SOURCE, "set");
        if !stamps.is_current(&generations) {
            counter!(METRIC_CACHE_STALE_WRITE).increment(1);
            debug!(key = ?key, "Discarded cache write loaded before an invalidation");
            return false;
        }

        self.registry.register(&key);
        rw_write(&self.entries, SOURCE, "set").insert(key, Entry { value, stamps });
        true
    }

    async fn invalidate(&self, tag: &CacheTag) {
        let mut generations = rw_write(&self.generations, SOURCE, "invalidate");
        let generation = generations.entry(tag.clone()).or_default();
        *generation += 1;
        let generation = *generation;

        let keys = self.registry.take_keys(tag);
        let purged = {
            let mut entries = rw_write(&self.entries, SOURCE, "invalidate");
            keys.iter()
                .filter(|key| entries.remove(*key).is_some())
                .count()
        };
        drop(generations);

        counter!(METRIC_CACHE_INVALIDATE).increment(1);
        debug!(tag = %tag, generation, purged, "Cache tag invalidated");
    }
}
