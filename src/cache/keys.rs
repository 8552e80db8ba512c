//! Cache key and tag definitions.
//!
//! `CacheKey` names a cached read; `CacheTag` names the invalidation scope
//! that owns it. The tag strings are part of the webhook response contract.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::domain::posts::{Post, PostMetadata};
use crate::domain::slug::Slug;

const POSTS_INDEX_TAG: &str = "posts-index";
const POST_TAG_PREFIX: &str = "post-";

/// Identifies a cached read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheKey {
    /// Published post metadata, newest first.
    AllPosts,
    /// One post by slug.
    PostBySlug(Slug),
    /// Every listed slug, published or not.
    AllSlugs,
    /// Slug of the first listed file.
    FirstSlug,
}

impl CacheKey {
    /// The single tag owning this key.
    pub fn owning_tag(&self) -> CacheTag {
        match self {
            CacheKey::AllPosts | CacheKey::AllSlugs | CacheKey::FirstSlug => CacheTag::PostsIndex,
            CacheKey::PostBySlug(slug) => CacheTag::Post(slug.clone()),
        }
    }
}

/// Invalidation scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheTag {
    /// `posts-index`
    PostsIndex,
    /// `post-<slug>`
    Post(Slug),
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheTag::PostsIndex => f.write_str(POSTS_INDEX_TAG),
            CacheTag::Post(slug) => write!(f, "{POST_TAG_PREFIX}{slug}"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("`{0}` is not a cache tag")]
pub struct UnknownTag(pub String);

impl FromStr for CacheTag {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == POSTS_INDEX_TAG {
            return Ok(CacheTag::PostsIndex);
        }
        s.strip_prefix(POST_TAG_PREFIX)
            .and_then(|slug| Slug::parse(slug).ok())
            .map(CacheTag::Post)
            .ok_or_else(|| UnknownTag(s.to_string()))
    }
}

/// Values held by the tag cache. Shared via `Arc` so hits never clone posts.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Posts(Arc<Vec<PostMetadata>>),
    Post(Arc<Post>),
    Slugs(Arc<Vec<Slug>>),
    FirstSlug(Option<Slug>),
}

macro_rules! cached_value_conversions {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for CachedValue {
                fn from(value: $ty) -> Self {
                    CachedValue::$variant(value)
                }
            }

            impl TryFrom<CachedValue> for $ty {
                type Error = CachedValue;

                fn try_from(value: CachedValue) -> Result<Self, Self::Error> {
                    match value {
                        CachedValue::$variant(inner) => Ok(inner),
                        other => Err(other),
                    }
                }
            }
        )*
    };
}

cached_value_conversions! {
    Posts => Arc<Vec<PostMetadata>>,
    Post => Arc<Post>,
    Slugs => Arc<Vec<Slug>>,
    FirstSlug => Option<Slug>,
}
