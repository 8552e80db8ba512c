use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD};
use gitpress::application::posts::PostService;
use gitpress::application::revalidate::{RevalidateService, sign};
use gitpress::cache::{
    CacheConfig, CacheKey, CacheTag, CachedValue, CacheTrigger, MemoryTagCache, RefreshConsumer,
    RefreshKind, RefreshQueue, TagCache,
};
use gitpress::config::ContentSettings;
use gitpress::domain::slug::{ContentLayout, Slug};
use gitpress::infra::github::GitHubContentStore;
use httpmock::MockServer;
use metrics_util::debugging::DebuggingRecorder;
use serde_json::json;
use url::Url;

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET").path("/repos/octo/blog/contents/content");
            then.status(200).json_body(json!([
                {"name": "a.mdx", "path": "content/a.mdx", "type": "file"}
            ]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method("GET")
                .path("/repos/octo/blog/contents/content/a.mdx");
            then.status(200).json_body(json!({
                "type": "file",
                "encoding": "base64",
                "content": STANDARD.encode("---\ntitle: A\ntimestamp: 2024-01-01\n---\nbody\n"),
            }));
        })
        .await;

    let settings = ContentSettings {
        owner: "octo".into(),
        repo: "blog".into(),
        branch: "main".into(),
        token: None,
        layout: ContentLayout::default(),
        api_base_url: Url::parse(&server.base_url()).expect("url"),
        request_timeout: Duration::from_secs(5),
        fetch_concurrency: NonZeroUsize::MIN,
    };
    let store = Arc::new(GitHubContentStore::new(&settings).expect("store"));
    let cache = Arc::new(MemoryTagCache::new());
    let tag_cache: Arc<dyn TagCache> = cache.clone();
    let posts = Arc::new(PostService::new(
        store,
        tag_cache.clone(),
        ContentLayout::default(),
    ));

    // Miss, then hit.
    assert!(posts.get_post_by_slug("a").await.is_some());
    assert!(posts.get_post_by_slug("a").await.is_some());

    // A write stamped before an invalidation is refused.
    let slug = Slug::parse("a").expect("slug");
    let stamps = cache.stamp(&[CacheTag::Post(slug.clone())]).await;
    cache.invalidate(&CacheTag::Post(slug.clone())).await;
    let stored = cache
        .set(
            CacheKey::PostBySlug(slug),
            CachedValue::from(None::<Slug>),
            stamps,
        )
        .await;
    assert!(!stored);

    // Queue length and drops.
    let tiny = RefreshQueue::new(1);
    assert!(tiny.publish(RefreshKind::Index));
    assert!(!tiny.publish(RefreshKind::Index));
    let _ = tiny.drain(1);

    // Consumer latency.
    let config = CacheConfig {
        eager_refresh: false,
        ..Default::default()
    };
    let queue = Arc::new(RefreshQueue::new(16));
    let consumer = Arc::new(RefreshConsumer::new(
        CacheConfig::default(),
        queue.clone(),
        posts.clone(),
    ));
    queue.publish(RefreshKind::WarmupOnStartup);
    assert!(consumer.consume().await);

    // Webhook outcomes.
    let trigger = Arc::new(CacheTrigger::new(config, tag_cache, queue, consumer));
    let webhook = RevalidateService::new(
        Some("s3cret".to_string()),
        "main",
        ContentLayout::default(),
        trigger,
    );
    let body = br#"{"ref":"refs/heads/main","commits":[{"modified":["content/a.mdx"]}]}"#;
    let signature = sign("s3cret", body);
    webhook
        .handle(Some(&signature), Some("push"), body)
        .await
        .expect("processed");
    assert!(webhook.handle(None, Some("push"), body).await.is_err());

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "gitpress_cache_hit_total",
        "gitpress_cache_miss_total",
        "gitpress_cache_invalidate_total",
        "gitpress_cache_stale_write_total",
        "gitpress_refresh_queue_len",
        "gitpress_refresh_dropped_total",
        "gitpress_refresh_ms",
        "gitpress_content_fetch_ms",
        "gitpress_webhook_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
