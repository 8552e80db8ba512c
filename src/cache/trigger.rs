//! Cache trigger service.
//!
//! Front door for the webhook: invalidates tags synchronously and schedules
//! eager refresh in the background.

use std::sync::Arc;

use tracing::{debug, info};

use super::config::CacheConfig;
use super::consumer::RefreshConsumer;
use super::events::{RefreshKind, RefreshQueue};
use super::keys::CacheTag;
use super::store::TagCache;

pub struct CacheTrigger {
    config: CacheConfig,
    cache: Arc<dyn TagCache>,
    queue: Arc<RefreshQueue>,
    consumer: Arc<RefreshConsumer>,
}

impl CacheTrigger {
    pub fn new(
        config: CacheConfig,
        cache: Arc<dyn TagCache>,
        queue: Arc<RefreshQueue>,
        consumer: Arc<RefreshConsumer>,
    ) -> Self {
        Self {
            config,
            cache,
            queue,
            consumer,
        }
    }

    /// Invalidate `tags`. Completes before returning, so a read issued
    /// afterwards never sees the old values.
    pub async fn invalidate(&self, tags: &[CacheTag]) {
        for tag in tags {
            self.cache.invalidate(tag).await;
        }
        info!(
            target = "gitpress::cache",
            tags = ?tags.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "Cache tags invalidated"
        );
    }

    /// Queue refresh events and start a detached consumer run.
    ///
    /// Never waits for the refresh itself. Returns how many events were
    /// accepted by the queue.
    pub fn schedule_refresh(&self, kinds: impl IntoIterator<Item = RefreshKind>) -> usize {
        if !self.config.refresh_enabled() {
            debug!(target = "gitpress::cache", "Eager refresh disabled; nothing scheduled");
            return 0;
        }

        let accepted = kinds
            .into_iter()
            .filter(|kind| self.queue.publish(kind.clone()))
            .count();

        if accepted > 0 {
            let consumer = self.consumer.clone();
            tokio::spawn(async move {
                consumer.consume().await;
            });
        }
        accepted
    }

    /// Load the index and every post once. Awaited by the server before it
    /// starts accepting connections.
    pub async fn warmup_on_startup(&self) {
        if !self.config.warmup_enabled() {
            debug!(target = "gitpress::cache", "Startup warmup disabled");
            return;
        }
        self.queue.publish(RefreshKind::WarmupOnStartup);
        self.consumer.consume().await;
    }

    /// Drain whatever the webhook path left behind.
    pub async fn consume_pending(&self) -> bool {
        self.consumer.consume().await
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<RefreshQueue> {
        &self.queue
    }
}
