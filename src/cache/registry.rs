//! Tag registry.
//!
//! Records which cache keys are currently stored under each tag so that
//! invalidating a tag can purge exactly those entries.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use super::keys::{CacheKey, CacheTag};
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::registry";

pub struct CacheRegistry {
    tag_to_keys: RwLock<HashMap<CacheTag, HashSet<CacheKey>>>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self {
            tag_to_keys: RwLock::new(HashMap::new()),
        }
    }

    /// Record `key` under its owning tag.
    pub fn register(&self, key: &CacheKey) {
        rw_write(&self.tag_to_keys, SOURCE, "register")
            .entry(key.owning_tag())
            .or_default()
            .insert(key.clone());
    }

    /// Remove and return every key registered under `tag`.
    pub fn take_keys(&self, tag: &CacheTag) -> HashSet<CacheKey> {
        rw_write(&self.tag_to_keys, SOURCE, "take_keys")
            .remove(tag)
            .unwrap_or_default()
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new()
    }
}
