//! Cache configuration.
//!
//! Controls the tag cache and the eager refresh worker via the `[cache]`
//! section of `gitpress.toml`.

use serde::Deserialize;

const DEFAULT_REFRESH_QUEUE_LIMIT: usize = 1024;
const DEFAULT_CONSUME_BATCH_LIMIT: usize = 100;
const DEFAULT_AUTO_CONSUME_INTERVAL_MS: u64 = 5000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Serve repository reads from the tag cache.
    pub enabled: bool,
    /// Re-read invalidated content in the background after a webhook.
    pub eager_refresh: bool,
    /// Load the index and every post once at startup.
    pub warm_on_startup: bool,
    /// Pending refresh events kept before new ones are dropped.
    pub refresh_queue_limit: usize,
    /// Maximum events per consumption batch.
    pub consume_batch_limit: usize,
    /// Interval (ms) of the background drain.
    pub auto_consume_interval_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            eager_refresh: true,
            warm_on_startup: true,
            refresh_queue_limit: DEFAULT_REFRESH_QUEUE_LIMIT,
            consume_batch_limit: DEFAULT_CONSUME_BATCH_LIMIT,
            auto_consume_interval_ms: DEFAULT_AUTO_CONSUME_INTERVAL_MS,
        }
    }
}

impl CacheConfig {
    /// Refresh events are only worth queueing when there is a cache to fill.
    pub fn refresh_enabled(&self) -> bool {
        self.enabled && self.eager_refresh
    }

    pub fn warmup_enabled(&self) -> bool {
        self.enabled && self.warm_on_startup
    }

    /// Batch limit clamped to at least one event.
    pub fn batch_limit(&self) -> usize {
        self.consume_batch_limit.max(1)
    }
}
