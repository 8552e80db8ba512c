//! Refresh consumer.
//!
//! Drains refresh events and re-reads the invalidated scopes through the
//! content repository so the next visitor hits a warm cache.

use std::sync::Arc;
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use metrics::histogram;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::application::posts::PostService;

use super::config::CacheConfig;
use super::events::RefreshQueue;
use super::planner::RefreshPlan;

const METRIC_REFRESH_MS: &str = "gitpress_refresh_ms";

/// Executes refresh plans.
///
/// Failures are logged and dropped: a refresh is an optimisation, the next
/// read-through fills whatever was missed.
pub struct RefreshConsumer {
    config: CacheConfig,
    queue: Arc<RefreshQueue>,
    posts: Option<Arc<PostService>>,
    #[cfg(test)]
    warm_invocations: Arc<AtomicUsize>,
}

impl RefreshConsumer {
    pub fn new(config: CacheConfig, queue: Arc<RefreshQueue>, posts: Arc<PostService>) -> Self {
        Self {
            config,
            queue,
            posts: Some(posts),
            #[cfg(test)]
            warm_invocations: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[cfg(test)]
    pub fn new_without_service(config: CacheConfig, queue: Arc<RefreshQueue>) -> Self {
        Self {
            config,
            queue,
            posts: None,
            warm_invocations: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Drain one batch and warm what it names.
    ///
    /// Returns true if any events were processed.
    #[instrument(skip(self))]
    pub async fn consume(&self) -> bool {
        let started_at = Instant::now();
        let events = self.queue.drain(self.config.batch_limit());
        if events.is_empty() {
            return false;
        }

        let event_count = events.len();
        let event_ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();
        let plan = RefreshPlan::from_events(events);

        info!(
            target = "gitpress::cache",
            event_count,
            event_ids = ?event_ids,
            plan = %plan,
            "Refresh starting"
        );

        if self.config.enabled && plan.has_warm_actions() {
            self.warm(&plan).await;
        }

        info!(target = "gitpress::cache", event_count, "Refresh complete");
        histogram!(METRIC_REFRESH_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        true
    }

    async fn warm(&self, plan: &RefreshPlan) {
        #[cfg(test)]
        self.warm_invocations.fetch_add(1, Ordering::Relaxed);

        let Some(posts) = &self.posts else {
            debug!(target = "gitpress::cache", "Warming skipped: no content service");
            return;
        };

        if plan.warm_index {
            match posts.get_all_posts().await {
                Ok(all) => debug!(target = "gitpress::cache", count = all.len(), "Warmed: posts index"),
                Err(err) => warn!(target = "gitpress::cache", error = %err, "Failed to warm posts index"),
            }
            if let Err(err) = posts.get_all_slugs().await {
                warn!(target = "gitpress::cache", error = %err, "Failed to warm slug list");
            }
            if let Err(err) = posts.get_first_post_slug().await {
                warn!(target = "gitpress::cache", error = %err, "Failed to warm first post slug");
            }
        }

        if plan.warm_all_posts {
            match posts.get_all_slugs().await {
                Ok(slugs) => {
                    for slug in slugs.iter() {
                        posts.get_post_by_slug(slug.as_str()).await;
                    }
                    debug!(target = "gitpress::cache", count = slugs.len(), "Warmed: all posts");
                }
                Err(err) => warn!(target = "gitpress::cache", error = %err, "Failed to list posts for warmup"),
            }
        }

        for slug in &plan.warm_posts {
            posts.get_post_by_slug(slug.as_str()).await;
        }
        if !plan.warm_posts.is_empty() {
            debug!(target = "gitpress::cache", count = plan.warm_posts.len(), "Warmed: posts");
        }
    }

    pub fn queue(&self) -> &Arc<RefreshQueue> {
        &self.queue
    }

    #[cfg(test)]
    fn warm_invocation_count(&self) -> usize {
        self.warm_invocations.load(Ordering::Relaxed)
    }
}
