//! Refresh plan generation.
//!
//! Collapses a batch of refresh events into the set of reads that
//! repopulate the cache.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::domain::slug::Slug;

use super::events::{RefreshEvent, RefreshKind};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RefreshPlan {
    /// Reload the listing (`posts-index`).
    pub warm_index: bool,
    /// Reload these posts.
    pub warm_posts: BTreeSet<Slug>,
    /// Reload every listed post (startup warmup).
    pub warm_all_posts: bool,
}

impl fmt::Display for RefreshPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RefreshPlan {{ warm_index: {}, warm_posts: {}, warm_all_posts: {} }}",
            self.warm_index,
            self.warm_posts.len(),
            self.warm_all_posts,
        )
    }
}

impl RefreshPlan {
    /// Merge events: duplicates (by id) are ignored, repeated scopes fold
    /// into one read, and a full warmup subsumes individual posts.
    pub fn from_events(events: Vec<RefreshEvent>) -> Self {
        let mut plan = Self::default();
        let mut seen_ids = HashSet::new();

        for event in events.into_iter().filter(|e| seen_ids.insert(e.id)) {
            match event.kind {
                RefreshKind::Index => plan.warm_index = true,
                RefreshKind::Post { slug } => {
                    plan.warm_posts.insert(slug);
                }
                RefreshKind::WarmupOnStartup => {
                    plan.warm_index = true;
                    plan.warm_all_posts = true;
                }
            }
        }

        if plan.warm_all_posts {
            plan.warm_posts.clear();
        }
        plan
    }

    pub fn has_warm_actions(&self) -> bool {
        self.warm_index || self.warm_all_posts || !self.warm_posts.is_empty()
    }
}
