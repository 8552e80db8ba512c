//! Refresh events.
//!
//! The webhook enqueues one event per invalidated scope; the consumer turns
//! them into cache reads. The queue is bounded and never blocks a producer:
//! once full, new events are dropped, matching the best-effort contract of
//! eager refresh.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::{counter, gauge};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::slug::Slug;

use super::lock::mutex_lock;

const SOURCE: &str = "cache::events";
const METRIC_QUEUE_LEN: &str = "gitpress_refresh_queue_len";
const METRIC_DROPPED: &str = "gitpress_refresh_dropped_total";

/// Monotonic, per-process event sequence number.
pub type Epoch = u64;

#[derive(Debug, Clone)]
pub struct RefreshEvent {
    pub id: Uuid,
    pub epoch: Epoch,
    pub kind: RefreshKind,
}

impl RefreshEvent {
    pub fn new(kind: RefreshKind, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshKind {
    /// `posts-index` was invalidated.
    Index,
    /// `post-<slug>` was invalidated.
    Post { slug: Slug },
    /// Load everything once after boot.
    WarmupOnStartup,
}

pub struct RefreshQueue {
    queue: Mutex<VecDeque<RefreshEvent>>,
    epoch_counter: AtomicU64,
    limit: usize,
}

impl RefreshQueue {
    pub fn new(limit: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            epoch_counter: AtomicU64::new(0),
            limit: limit.max(1),
        }
    }

    pub fn next_epoch(&self) -> Epoch {
        self.epoch_counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Enqueue an event. Returns `false` if the queue was full and the event
    /// was dropped.
    pub fn publish(&self, kind: RefreshKind) -> bool {
        let event = RefreshEvent::new(kind, self.next_epoch());
        let mut queue = mutex_lock(&self.queue, SOURCE, "publish");

        if queue.len() >= self.limit {
            counter!(METRIC_DROPPED).increment(1);
            warn!(
                event_kind = ?event.kind,
                limit = self.limit,
                "Refresh queue full, event dropped"
            );
            return false;
        }

        info!(
            event_id = %event.id,
            event_epoch = event.epoch,
            event_kind = ?event.kind,
            "Refresh event enqueued"
        );
        queue.push_back(event);
        gauge!(METRIC_QUEUE_LEN).set(queue.len() as f64);
        true
    }

    /// Drain up to `limit` events in FIFO order.
    pub fn drain(&self, limit: usize) -> Vec<RefreshEvent> {
        let mut queue = mutex_lock(&self.queue, SOURCE, "drain");
        let count = limit.min(queue.len());
        let drained = queue.drain(..count).collect();
        gauge!(METRIC_QUEUE_LEN).set(queue.len() as f64);
        drained
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.queue, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
