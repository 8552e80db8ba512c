//! Content repository: cached, tag-scoped reads of posts.
//!
//! Collection reads (`get_all_posts`, `get_all_slugs`,
//! `get_first_post_slug`) are owned by `posts-index`; a single post is owned
//! by `post-<slug>`. Values stay cached until their tag is invalidated.

use std::future::Future;
use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::application::frontmatter::{self, FrontMatterError};
use crate::application::repos::{ContentFile, ContentStore, StoreError};
use crate::cache::{CacheKey, CachedValue, TagCache};
use crate::domain::posts::{self, MetadataError, Post, PostMetadata};
use crate::domain::slug::{ContentLayout, Slug, SlugError};

const DEFAULT_FETCH_CONCURRENCY: usize = 8;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("malformed front matter in `{path}`: {source}")]
    FrontMatter {
        path: String,
        #[source]
        source: FrontMatterError,
    },
    #[error("invalid metadata in `{path}`: {source}")]
    Metadata {
        path: String,
        #[source]
        source: MetadataError,
    },
    #[error("invalid slug: {0}")]
    Slug(#[from] SlugError),
}

impl ContentError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ContentError::Store(err) if err.is_not_found())
    }

    /// Per-document failures that make a single file unusable without
    /// saying anything about the rest of the listing.
    fn is_document_error(&self) -> bool {
        matches!(
            self,
            ContentError::FrontMatter { .. } | ContentError::Metadata { .. }
        ) || self.is_not_found()
    }
}

pub struct PostService {
    store: Arc<dyn ContentStore>,
    cache: Arc<dyn TagCache>,
    layout: ContentLayout,
    cache_enabled: bool,
    fetch_concurrency: usize,
}

impl PostService {
    pub fn new(
        store: Arc<dyn ContentStore>,
        cache: Arc<dyn TagCache>,
        layout: ContentLayout,
    ) -> Self {
        Self {
            store,
            cache,
            layout,
            cache_enabled: true,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }

    /// Bypass the cache entirely; every read goes to the store.
    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn with_fetch_concurrency(mut self, concurrency: usize) -> Self {
        self.fetch_concurrency = concurrency.max(1);
        self
    }

    /// Published posts, newest first.
    ///
    /// Listing and transport failures propagate and leave the cache
    /// untouched. A single unreadable document is skipped.
    #[instrument(skip(self))]
    pub async fn get_all_posts(&self) -> Result<Arc<Vec<PostMetadata>>, ContentError> {
        self.cached(CacheKey::AllPosts, || async {
            self.load_all_posts().await.map(Arc::new)
        })
        .await
    }

    /// A post by slug, published or not. Every failure reads as absent and
    /// absence is never cached.
    #[instrument(skip(self))]
    pub async fn get_post_by_slug(&self, slug: &str) -> Option<Arc<Post>> {
        let slug = match Slug::parse(slug) {
            Ok(slug) => slug,
            Err(err) => {
                debug!(target = "gitpress::content", slug, error = %err, "Rejected post slug");
                return None;
            }
        };

        let result = self
            .cached(CacheKey::PostBySlug(slug.clone()), || async {
                self.load_post(&slug).await.map(Arc::new)
            })
            .await;

        match result {
            Ok(post) => Some(post),
            Err(err) if err.is_not_found() => {
                debug!(target = "gitpress::content", slug = %slug, "Post not found");
                None
            }
            Err(err) => {
                warn!(
                    target = "gitpress::content",
                    slug = %slug,
                    error = %err,
                    "Post could not be loaded; treating as absent"
                );
                None
            }
        }
    }

    /// The post listed right after `slug`, derived from the cached listing.
    #[instrument(skip(self))]
    pub async fn get_next_post(&self, slug: &str) -> Result<Option<PostMetadata>, ContentError> {
        let all = self.get_all_posts().await?;
        Ok(posts::next_after(&all, slug).cloned())
    }

    /// Slug of the first content file in listing order.
    #[instrument(skip(self))]
    pub async fn get_first_post_slug(&self) -> Result<Option<Slug>, ContentError> {
        self.cached(CacheKey::FirstSlug, || async {
            let files = self.store.list_content_files().await?;
            Ok(files
                .iter()
                .find_map(|file| ContentLayout::file_name_to_slug(&file.name)))
        })
        .await
    }

    /// Every listed slug, including unpublished posts.
    #[instrument(skip(self))]
    pub async fn get_all_slugs(&self) -> Result<Arc<Vec<Slug>>, ContentError> {
        self.cached(CacheKey::AllSlugs, || async {
            let files = self.store.list_content_files().await?;
            Ok(Arc::new(
                files
                    .iter()
                    .filter_map(|file| ContentLayout::file_name_to_slug(&file.name))
                    .collect(),
            ))
        })
        .await
    }

    /// Read-through with a stamp taken before loading, so a load that races
    /// an invalidation is never stored.
    async fn cached<T, F, Fut>(&self, key: CacheKey, load: F) -> Result<T, ContentError>
    where
        T: Clone + Into<CachedValue> + TryFrom<CachedValue>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ContentError>>,
    {
        if !self.cache_enabled {
            return load().await;
        }

        if let Some(value) = self.cache.get(&key).await
            && let Ok(hit) = T::try_from(value)
        {
            return Ok(hit);
        }

        let stamps = self.cache.stamp(&[key.owning_tag()]).await;
        let value = load().await?;
        self.cache.set(key, value.clone().into(), stamps).await;
        Ok(value)
    }

    async fn load_all_posts(&self) -> Result<Vec<PostMetadata>, ContentError> {
        let files = self.store.list_content_files().await?;

        let loaded: Vec<Option<PostMetadata>> = stream::iter(files)
            .map(|file| self.load_listed(file))
            .buffered(self.fetch_concurrency)
            .try_collect()
            .await?;

        let mut published: Vec<PostMetadata> = loaded
            .into_iter()
            .flatten()
            .filter(PostMetadata::is_published)
            .collect();
        posts::sort_newest_first(&mut published);
        Ok(published)
    }

    async fn load_listed(&self, file: ContentFile) -> Result<Option<PostMetadata>, ContentError> {
        let Some(slug) = ContentLayout::file_name_to_slug(&file.name) else {
            debug!(target = "gitpress::content", name = %file.name, "Skipped listed file without a valid slug");
            return Ok(None);
        };

        match self.load_document(slug, &file.path).await {
            Ok(post) => Ok(Some(post.metadata)),
            Err(err) if err.is_document_error() => {
                warn!(
                    target = "gitpress::content",
                    path = %file.path,
                    error = %err,
                    "Skipped unreadable post while building the index"
                );
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn load_post(&self, slug: &Slug) -> Result<Post, ContentError> {
        let path = self.layout.slug_to_path(slug);
        self.load_document(slug.clone(), &path).await
    }

    async fn load_document(&self, slug: Slug, path: &str) -> Result<Post, ContentError> {
        let raw = self.store.fetch_file_content(path).await?;
        let parsed = frontmatter::parse(&raw).map_err(|source| ContentError::FrontMatter {
            path: path.to_string(),
            source,
        })?;
        let metadata = PostMetadata::from_front_matter(slug, &parsed.metadata).map_err(
            |source| ContentError::Metadata {
                path: path.to_string(),
                source,
            },
        )?;
        Ok(Post {
            metadata,
            content: parsed.body,
        })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::application::repos::testing::FakeStore;
    use crate::cache::{CacheTag, MemoryTagCache};

    fn doc(title: &str, timestamp: &str, extra: &str) -> String {
        format!("---\ntitle: {title}\ntimestamp: {timestamp}\ndescription: d\n{extra}---\nBody of {title}\n")
    }

    fn service(store: &Arc<FakeStore>, cache: &Arc<MemoryTagCache>) -> PostService {
        PostService::new(store.clone(), cache.clone(), ContentLayout::default())
    }

    fn seeded() -> (Arc<FakeStore>, Arc<MemoryTagCache>) {
        let store = Arc::new(FakeStore::default());
        store.put("content/a.mdx", &doc("A", "2024-01-01T00:00:00Z", ""));
        store.put("content/b.mdx", &doc("B", "2024-03-01T00:00:00Z", ""));
        store.put(
            "content/hidden.mdx",
            &doc("Hidden", "2024-05-01T00:00:00Z", "published: false\n"),
        );
        store.put("content/c.mdx", &doc("C", "2024-02-01T00:00:00Z", ""));
        (store, Arc::new(MemoryTagCache::new()))
    }

    fn slugs(posts: &[PostMetadata]) -> Vec<&str> {
        posts.iter().map(|p| p.slug.as_str()).collect()
    }

    #[tokio::test]
    async fn all_posts_are_published_and_sorted() {
        let (store, cache) = seeded();
        let posts = service(&store, &cache).get_all_posts().await.expect("posts");
        assert_eq!(slugs(&posts), vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn all_posts_are_served_from_cache_until_index_invalidated() {
        let (store, cache) = seeded();
        let service = service(&store, &cache);

        service.get_all_posts().await.expect("first");
        let fetches = store.fetch_count();
        service.get_all_posts().await.expect("second");
        assert_eq!(store.fetch_count(), fetches);

        store.put("content/d.mdx", &doc("D", "2025-01-01T00:00:00Z", ""));
        assert_eq!(slugs(&service.get_all_posts().await.expect("cached")).len(), 3);

        cache.invalidate(&CacheTag::PostsIndex).await;
        let posts = service.get_all_posts().await.expect("fresh");
        assert_eq!(slugs(&posts), vec!["d", "b", "c", "a"]);
    }

    #[tokio::test]
    async fn post_by_slug_returns_full_post() {
        let store = Arc::new(FakeStore::default());
        store.put(
            "content/a.mdx",
            "---\ntitle: \"A\"\ntimestamp: \"2024-01-01T00:00:00Z\"\ndescription: \"d\"\n---\nHello\n",
        );
        let cache = Arc::new(MemoryTagCache::new());

        let post = service(&store, &cache)
            .get_post_by_slug("a")
            .await
            .expect("post");
        assert_eq!(post.metadata.title, "A");
        assert_eq!(post.metadata.timestamp, "2024-01-01T00:00:00Z");
        assert_eq!(post.metadata.description, "d");
        assert_eq!(post.metadata.slug.as_str(), "a");
        assert_eq!(post.content, "Hello\n");
    }

    #[tokio::test]
    async fn unpublished_post_is_still_reachable_by_slug() {
        let (store, cache) = seeded();
        let post = service(&store, &cache).get_post_by_slug("hidden").await;
        assert_eq!(post.map(|p| p.metadata.published), Some(Some(false)));
    }

    #[tokio::test]
    async fn absent_post_is_not_cached() {
        let (store, cache) = seeded();
        let service = service(&store, &cache);

        assert!(service.get_post_by_slug("new").await.is_none());
        store.put("content/new.mdx", &doc("New", "2024-06-01", ""));
        assert!(service.get_post_by_slug("new").await.is_some());
    }

    #[tokio::test]
    async fn failures_read_as_absent() {
        let (store, cache) = seeded();
        store.put("content/broken.mdx", "---\ntitle: [\n---\n");
        store.put("content/untitled.mdx", "---\ndescription: x\n---\n");
        store.fail_on("content/a.mdx");
        let service = service(&store, &cache);

        assert!(service.get_post_by_slug("broken").await.is_none());
        assert!(service.get_post_by_slug("untitled").await.is_none());
        assert!(service.get_post_by_slug("a").await.is_none());
        assert!(service.get_post_by_slug("../etc/passwd").await.is_none());
        assert!(service.get_post_by_slug("").await.is_none());
    }

    #[tokio::test]
    async fn post_invalidation_does_not_touch_the_index() {
        let (store, cache) = seeded();
        let service = service(&store, &cache);
        service.get_all_posts().await.expect("posts");
        service.get_post_by_slug("a").await.expect("post");

        store.put("content/a.mdx", &doc("A2", "2024-01-01T00:00:00Z", ""));
        cache
            .invalidate(&CacheTag::Post(Slug::parse("a").expect("slug")))
            .await;

        let listings = store.listing_count();
        assert_eq!(
            service.get_post_by_slug("a").await.expect("post").metadata.title,
            "A2"
        );
        let posts = service.get_all_posts().await.expect("posts");
        assert_eq!(store.listing_count(), listings);
        let a = posts.iter().find(|p| p.slug.as_str() == "a").expect("a");
        assert_eq!(a.title, "A");
    }

    #[tokio::test]
    async fn index_skips_broken_documents_but_fails_on_transport_errors() {
        let (store, cache) = seeded();
        store.put("content/broken.mdx", "---\ntitle: A\n");
        let service = service(&store, &cache);
        assert_eq!(
            slugs(&service.get_all_posts().await.expect("posts")),
            vec!["b", "c", "a"]
        );

        cache.invalidate(&CacheTag::PostsIndex).await;
        store.fail_on("content/c.mdx");
        let err = service.get_all_posts().await.expect_err("fetch failure");
        assert!(matches!(err, ContentError::Store(StoreError::Fetch { .. })));
        assert!(cache.get(&CacheKey::AllPosts).await.is_none());
    }

    #[tokio::test]
    async fn next_post_follows_sort_order() {
        let (store, cache) = seeded();
        let service = service(&store, &cache);

        let next = service.get_next_post("b").await.expect("next");
        assert_eq!(next.map(|p| p.slug.to_string()), Some("c".to_string()));
        assert_eq!(service.get_next_post("a").await.expect("last"), None);
        assert_eq!(service.get_next_post("unknown").await.expect("unknown"), None);
        assert_eq!(service.get_next_post("hidden").await.expect("hidden"), None);
    }

    #[tokio::test]
    async fn slugs_and_first_slug_follow_listing_order() {
        let (store, cache) = seeded();
        let service = service(&store, &cache);

        let all = service.get_all_slugs().await.expect("slugs");
        let names: Vec<_> = all.iter().map(Slug::as_str).collect();
        assert_eq!(names, vec!["a", "b", "hidden", "c"]);

        let first = service.get_first_post_slug().await.expect("first");
        assert_eq!(first.as_ref().map(Slug::as_str), Some("a"));

        store.remove("content/a.mdx");
        assert_eq!(
            service
                .get_first_post_slug()
                .await
                .expect("cached")
                .as_ref()
                .map(Slug::as_str),
            Some("a")
        );
        cache.invalidate(&CacheTag::PostsIndex).await;
        assert_eq!(
            service
                .get_first_post_slug()
                .await
                .expect("fresh")
                .as_ref()
                .map(Slug::as_str),
            Some("b")
        );
    }

    #[tokio::test]
    async fn disabled_cache_always_reads_through() {
        let (store, cache) = seeded();
        let service = service(&store, &cache).with_cache_enabled(false);

        service.get_all_slugs().await.expect("slugs");
        service.get_all_slugs().await.expect("slugs");
        assert_eq!(store.listing_count(), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn vanished_file_is_skipped_from_the_index() {
        let store = Arc::new(FakeStore::default());
        store.put("content/a.mdx", &doc("A", "2024-01-01", ""));
        let cache = Arc::new(MemoryTagCache::new());

        struct Vanishing(Arc<FakeStore>);

        #[async_trait]
        impl ContentStore for Vanishing {
            async fn list_content_files(&self) -> Result<Vec<ContentFile>, StoreError> {
                let mut files = self.0.list_content_files().await?;
                files.push(ContentFile {
                    name: "gone.mdx".into(),
                    path: "content/gone.mdx".into(),
                });
                Ok(files)
            }

            async fn fetch_file_content(&self, path: &str) -> Result<String, StoreError> {
                self.0.fetch_file_content(path).await
            }
        }

        let service = PostService::new(
            Arc::new(Vanishing(store)),
            cache,
            ContentLayout::default(),
        );
        let posts = service.get_all_posts().await.expect("posts");
        assert_eq!(slugs(&posts), vec!["a"]);
    }

    #[test]
    fn fetch_concurrency_is_at_least_one() {
        let (store, cache) = seeded();
        let service = service(&store, &cache).with_fetch_concurrency(0);
        assert_eq!(service.fetch_concurrency, 1);
    }
}
