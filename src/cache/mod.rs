//! Tag-based content cache.
//!
//! Repository reads are cached under keys owned by a single tag
//! (`posts-index` or `post-<slug>`). The webhook invalidates tags and may
//! schedule an eager refresh that re-reads the invalidated scopes.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! eager_refresh = true
//! warm_on_startup = true
//! refresh_queue_limit = 1024
//! # ... see config.rs for all options
//! ```

mod config;
mod consumer;
mod events;
mod keys;
mod lock;
mod planner;
mod registry;
mod store;
mod trigger;

pub use config::CacheConfig;
pub use consumer::RefreshConsumer;
pub use events::{Epoch, RefreshEvent, RefreshKind, RefreshQueue};
pub use keys::{CacheKey, CacheTag, CachedValue, UnknownTag};
pub use planner::RefreshPlan;
pub use registry::CacheRegistry;
pub use store::{Generation, MemoryTagCache, TagCache, TagStamps};
pub use trigger::CacheTrigger;
