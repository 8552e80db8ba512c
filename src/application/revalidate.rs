//! Push webhook processing: signature check, branch filter, tag derivation
//! and cache invalidation.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;
use gitpress_api_types::{RevalidateResponse, RevalidatedTags, WebhookPayload};
use hmac::{Hmac, KeyInit, Mac};
use metrics::counter;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheTag, CacheTrigger, RefreshKind};
use crate::domain::slug::{ContentLayout, Slug};

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_ALGORITHM: &str = "sha256";
const DIGEST_HEX_LEN: usize = 64;
const PUSH_EVENT: &str = "push";
const PING_EVENT: &str = "ping";
const BRANCH_REF_PREFIX: &str = "refs/heads/";
const METRIC_WEBHOOK_TOTAL: &str = "gitpress_webhook_total";

/// Full git ref (`refs/heads/<branch>`) a push to `branch` carries.
pub fn branch_ref(branch: &str) -> String {
    format!("{BRANCH_REF_PREFIX}{branch}")
}

/// Signature header value (`sha256=<hex>`) for `body`.
pub fn sign(secret: &str, body: &[u8]) -> String {
    format!("{SIGNATURE_ALGORITHM}={}", hex::encode(digest(secret, body)))
}

fn digest(secret: &str, body: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length.
    let mut mac = match <HmacSha256 as KeyInit>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return Vec::new(),
    };
    mac.update(body);
    mac.finalize().into_bytes().as_slice().to_vec()
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature header is missing")]
    Missing,
    #[error("signature header is malformed")]
    Malformed,
    #[error("unsupported signature algorithm `{0}`")]
    UnsupportedAlgorithm(String),
    #[error("signature digest has the wrong length")]
    LengthMismatch,
    #[error("signature does not match payload")]
    Mismatch,
}

/// Verify `header` against the HMAC-SHA256 of `body`.
///
/// The digest comparison runs in constant time.
pub fn check_signature(
    secret: &str,
    body: &[u8],
    header: Option<&str>,
) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::Missing)?.trim();
    let (algorithm, hex_digest) = header.split_once('=').ok_or(SignatureError::Malformed)?;
    if hex_digest.contains('=') {
        return Err(SignatureError::Malformed);
    }
    if algorithm != SIGNATURE_ALGORITHM {
        return Err(SignatureError::UnsupportedAlgorithm(algorithm.to_string()));
    }
    if hex_digest.len() != DIGEST_HEX_LEN {
        return Err(SignatureError::LengthMismatch);
    }
    let supplied = hex::decode(hex_digest).map_err(|_| SignatureError::Malformed)?;

    let expected = digest(secret, body);
    if expected.len() != supplied.len() {
        return Err(SignatureError::LengthMismatch);
    }
    if bool::from(expected.ct_eq(&supplied)) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

pub fn verify_signature(secret: &str, body: &[u8], header: Option<&str>) -> bool {
    check_signature(secret, body, header).is_ok()
}

/// Tags a push affects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevalidationPlan {
    /// A content file was added or removed.
    pub index: bool,
    /// Added or modified, so worth re-reading.
    pub refresh: BTreeSet<Slug>,
    /// Removed and not re-added in the same push.
    pub evict: BTreeSet<Slug>,
}

impl RevalidationPlan {
    /// Paths outside the content directory or without the content extension
    /// are ignored.
    pub fn from_payload(payload: &WebhookPayload, layout: &ContentLayout) -> Self {
        let mut plan = Self::default();
        let mut removed = BTreeSet::new();

        for commit in &payload.commits {
            for slug in commit.added.iter().filter_map(|p| layout.path_to_slug(p)) {
                plan.index = true;
                plan.refresh.insert(slug);
            }
            for slug in commit.modified.iter().filter_map(|p| layout.path_to_slug(p)) {
                plan.refresh.insert(slug);
            }
            for slug in commit.removed.iter().filter_map(|p| layout.path_to_slug(p)) {
                plan.index = true;
                removed.insert(slug);
            }
        }

        plan.evict = removed.difference(&plan.refresh).cloned().collect();
        plan
    }

    pub fn is_empty(&self) -> bool {
        !self.index && self.refresh.is_empty() && self.evict.is_empty()
    }

    /// Every tag to invalidate, index first.
    pub fn tags(&self) -> Vec<CacheTag> {
        let index = self.index.then_some(CacheTag::PostsIndex);
        index
            .into_iter()
            .chain(self.post_slugs().map(|slug| CacheTag::Post(slug.clone())))
            .collect()
    }

    /// Refresh work for the eager refresh queue. Evicted posts are left cold.
    pub fn refresh_kinds(&self) -> Vec<RefreshKind> {
        let index = self.index.then_some(RefreshKind::Index);
        index
            .into_iter()
            .chain(
                self.refresh
                    .iter()
                    .map(|slug| RefreshKind::Post { slug: slug.clone() }),
            )
            .collect()
    }

    pub fn revalidated_tags(&self) -> RevalidatedTags {
        RevalidatedTags {
            index: self.index,
            posts: self
                .post_slugs()
                .map(|slug| CacheTag::Post(slug.clone()).to_string())
                .collect(),
        }
    }

    fn post_slugs(&self) -> impl Iterator<Item = &Slug> {
        self.refresh.union(&self.evict)
    }
}

impl fmt::Display for RevalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<String> = self.tags().iter().map(ToString::to_string).collect();
        if tags.is_empty() {
            f.write_str("(no tags)")
        } else {
            f.write_str(&tags.join(", "))
        }
    }
}

#[derive(Debug, Error)]
pub enum RevalidateError {
    #[error("webhook secret is not configured")]
    NotConfigured,
    #[error("payload exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },
    #[error("request body could not be read")]
    UnreadableBody,
    #[error("webhook signature rejected: {0}")]
    Unauthorized(#[from] SignatureError),
    #[error("webhook payload is not a valid push event: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

impl RevalidateError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RevalidateError::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            RevalidateError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            RevalidateError::UnreadableBody => StatusCode::BAD_REQUEST,
            RevalidateError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            RevalidateError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn public_message(&self) -> &'static str {
        match self {
            RevalidateError::NotConfigured => "Webhook secret not configured",
            RevalidateError::PayloadTooLarge { .. } => "Payload too large",
            RevalidateError::UnreadableBody => "Unreadable body",
            RevalidateError::Unauthorized(_) => "Invalid signature",
            RevalidateError::InvalidPayload(_) => "Invalid payload",
        }
    }

    fn outcome(&self) -> &'static str {
        match self {
            RevalidateError::NotConfigured => "not_configured",
            RevalidateError::PayloadTooLarge { .. } => "too_large",
            RevalidateError::UnreadableBody => "unreadable_body",
            RevalidateError::Unauthorized(_) => "unauthorized",
            RevalidateError::InvalidPayload(_) => "invalid_payload",
        }
    }
}

/// Count a rejected delivery.
pub fn record_rejection(error: &RevalidateError) {
    counter!(METRIC_WEBHOOK_TOTAL, "outcome" => error.outcome()).increment(1);
}

fn record_outcome(outcome: &'static str) {
    counter!(METRIC_WEBHOOK_TOTAL, "outcome" => outcome).increment(1);
}

pub struct RevalidateService {
    secret: Option<String>,
    branch: String,
    layout: ContentLayout,
    trigger: Arc<CacheTrigger>,
}

impl RevalidateService {
    pub fn new(
        secret: Option<String>,
        branch: impl Into<String>,
        layout: ContentLayout,
        trigger: Arc<CacheTrigger>,
    ) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
            branch: branch.into(),
            layout,
            trigger,
        }
    }

    pub fn tracked_ref(&self) -> String {
        branch_ref(&self.branch)
    }

    /// Fails before any request data is read when no secret is configured.
    pub fn ensure_configured(&self) -> Result<&str, RevalidateError> {
        self.secret.as_deref().ok_or(RevalidateError::NotConfigured)
    }

    /// Process one delivery. `event` is the `X-GitHub-Event` header; a
    /// missing header is treated as a push.
    #[instrument(skip(self, signature, body), fields(body_len = body.len()))]
    pub async fn handle(
        &self,
        signature: Option<&str>,
        event: Option<&str>,
        body: &[u8],
    ) -> Result<RevalidateResponse, RevalidateError> {
        let result = self.process(signature, event, body).await;
        if let Err(err) = &result {
            record_rejection(err);
        }
        result
    }

    async fn process(
        &self,
        signature: Option<&str>,
        event: Option<&str>,
        body: &[u8],
    ) -> Result<RevalidateResponse, RevalidateError> {
        let secret = self.ensure_configured()?;
        check_signature(secret, body, signature)?;

        match event.map(str::trim).unwrap_or(PUSH_EVENT) {
            PUSH_EVENT => {}
            PING_EVENT => {
                record_outcome("ping");
                return Ok(RevalidateResponse::skipped("pong", None));
            }
            other => {
                debug!(target = "gitpress::webhook", event = other, "Ignoring non-push event");
                record_outcome("ignored_event");
                return Ok(RevalidateResponse::skipped(
                    format!("Ignored `{other}` event"),
                    None,
                ));
            }
        }

        let payload: WebhookPayload = serde_json::from_slice(body)?;

        if payload.git_ref != self.tracked_ref() {
            info!(
                target = "gitpress::webhook",
                git_ref = %payload.git_ref,
                tracked = %self.tracked_ref(),
                "Push to untracked branch ignored"
            );
            record_outcome("skipped_branch");
            return Ok(RevalidateResponse::skipped(
                format!("Not {} branch", self.branch),
                Some(payload.git_ref),
            ));
        }

        let plan = RevalidationPlan::from_payload(&payload, &self.layout);
        let tags = plan.tags();
        if !tags.is_empty() {
            self.trigger.invalidate(&tags).await;
        }
        let scheduled = self.trigger.schedule_refresh(plan.refresh_kinds());

        info!(
            target = "gitpress::webhook",
            commits = payload.commits.len(),
            plan = %plan,
            scheduled,
            "Push processed"
        );
        if plan.is_empty() {
            warn!(
                target = "gitpress::webhook",
                "Push touched no content files; nothing invalidated"
            );
        }
        record_outcome("processed");

        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        Ok(RevalidateResponse::processed(
            timestamp,
            plan.revalidated_tags(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use gitpress_api_types::Commit;

    use super::*;
    use crate::application::posts::PostService;
    use crate::application::repos::testing::FakeStore;
    use crate::cache::{
        CacheConfig, CacheKey, MemoryTagCache, RefreshConsumer, RefreshQueue, TagCache,
    };

    const SECRET: &str = "It's a Secret to Everybody";
    const BODY: &[u8] = b"Hello, World!";
    // Published reference vector for the GitHub webhook signature scheme.
    const BODY_SIGNATURE: &str =
        "sha256=757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17";

    fn slug(value: &str) -> Slug {
        Slug::parse(value).expect("slug")
    }

    fn payload(git_ref: &str, commits: Vec<Commit>) -> WebhookPayload {
        WebhookPayload {
            git_ref: git_ref.to_string(),
            commits,
        }
    }

    fn commit(added: &[&str], removed: &[&str], modified: &[&str]) -> Commit {
        let owned = |paths: &[&str]| paths.iter().map(|p| p.to_string()).collect();
        Commit {
            added: owned(added),
            removed: owned(removed),
            modified: owned(modified),
        }
    }

    #[test]
    fn sign_matches_reference_vector() {
        assert_eq!(sign(SECRET, BODY), BODY_SIGNATURE);
        assert!(verify_signature(SECRET, BODY, Some(BODY_SIGNATURE)));
    }

    #[test]
    fn any_flipped_character_fails_verification() {
        let signature = sign(SECRET, BODY);
        assert!(!verify_signature(SECRET, b"Hello, World?", Some(&signature)));

        let digest_start = signature.len() - DIGEST_HEX_LEN;
        for index in digest_start..signature.len() {
            let mut bytes = signature.clone().into_bytes();
            bytes[index] = if bytes[index] == b'0' { b'1' } else { b'0' };
            let tampered = String::from_utf8(bytes).expect("ascii");
            assert!(!verify_signature(SECRET, BODY, Some(&tampered)), "{tampered}");
        }
    }

    #[test]
    fn signature_errors_name_the_failing_check() {
        let valid = sign(SECRET, BODY);
        let digest = valid.trim_start_matches("sha256=");

        assert_eq!(check_signature(SECRET, BODY, None), Err(SignatureError::Missing));
        assert_eq!(
            check_signature(SECRET, BODY, Some(digest)),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            check_signature(SECRET, BODY, Some(&format!("sha256={digest}=x"))),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            check_signature(SECRET, BODY, Some(&format!("sha1={digest}"))),
            Err(SignatureError::UnsupportedAlgorithm("sha1".into()))
        );
        assert_eq!(
            check_signature(SECRET, BODY, Some(&format!("sha256={}", &digest[..40]))),
            Err(SignatureError::LengthMismatch)
        );
        assert_eq!(
            check_signature(SECRET, BODY, Some(&format!("sha256={}", "zz".repeat(32)))),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            check_signature("other", BODY, Some(&valid)),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn added_file_marks_index_and_post() {
        let plan = RevalidationPlan::from_payload(
            &payload("refs/heads/main", vec![commit(&["content/a.mdx"], &[], &[])]),
            &ContentLayout::default(),
        );
        assert!(plan.index);
        assert_eq!(
            plan.tags(),
            vec![CacheTag::PostsIndex, CacheTag::Post(slug("a"))]
        );
    }

    #[test]
    fn modified_file_marks_only_post() {
        let plan = RevalidationPlan::from_payload(
            &payload("refs/heads/main", vec![commit(&[], &[], &["content/a.mdx"])]),
            &ContentLayout::default(),
        );
        assert!(!plan.index);
        assert_eq!(plan.tags(), vec![CacheTag::Post(slug("a"))]);
        assert_eq!(plan.refresh_kinds(), vec![RefreshKind::Post { slug: slug("a") }]);
    }

    #[test]
    fn removed_file_is_evicted_but_not_refreshed() {
        let plan = RevalidationPlan::from_payload(
            &payload("refs/heads/main", vec![commit(&[], &["content/gone.mdx"], &[])]),
            &ContentLayout::default(),
        );
        assert!(plan.index);
        assert!(plan.refresh.is_empty());
        assert_eq!(plan.evict.iter().map(Slug::as_str).collect::<Vec<_>>(), vec!["gone"]);
        assert_eq!(plan.refresh_kinds(), vec![RefreshKind::Index]);
        assert_eq!(plan.revalidated_tags().posts, vec!["post-gone"]);
    }

    #[test]
    fn removed_then_readded_is_refreshed() {
        let plan = RevalidationPlan::from_payload(
            &payload(
                "refs/heads/main",
                vec![
                    commit(&[], &["content/a.mdx"], &[]),
                    commit(&["content/a.mdx"], &[], &[]),
                ],
            ),
            &ContentLayout::default(),
        );
        assert!(plan.evict.is_empty());
        assert!(plan.refresh.contains(&slug("a")));
    }

    #[test]
    fn unrelated_paths_are_ignored_and_duplicates_collapse() {
        let plan = RevalidationPlan::from_payload(
            &payload(
                "refs/heads/main",
                vec![
                    commit(&["README.md", "content/img.png"], &["lib/x.mdx"], &["content/a.mdx"]),
                    commit(&[], &[], &["content/a.mdx", "content/nested/b.mdx"]),
                ],
            ),
            &ContentLayout::default(),
        );
        assert!(!plan.index);
        assert_eq!(plan.revalidated_tags().posts, vec!["post-a"]);
        assert_eq!(plan.to_string(), "post-a");
    }

    #[test]
    fn branch_ref_prefixes_heads() {
        assert_eq!(branch_ref("main"), "refs/heads/main");
        let (service, _) = service(Some(SECRET));
        assert_eq!(service.tracked_ref(), branch_ref("main"));
    }

    #[test]
    fn empty_plan_displays_placeholder() {
        let plan = RevalidationPlan::from_payload(
            &payload("refs/heads/main", Vec::new()),
            &ContentLayout::default(),
        );
        assert!(plan.is_empty());
        assert_eq!(plan.to_string(), "(no tags)");
    }

    fn service(secret: Option<&str>) -> (RevalidateService, Arc<MemoryTagCache>) {
        let config = CacheConfig {
            eager_refresh: false,
            ..Default::default()
        };
        service_with(secret, config, Arc::new(FakeStore::default()))
    }

    fn service_with(
        secret: Option<&str>,
        config: CacheConfig,
        store: Arc<FakeStore>,
    ) -> (RevalidateService, Arc<MemoryTagCache>) {
        let cache = Arc::new(MemoryTagCache::new());
        let posts = Arc::new(PostService::new(
            store,
            cache.clone(),
            ContentLayout::default(),
        ));
        let queue = Arc::new(RefreshQueue::new(8));
        let consumer = Arc::new(RefreshConsumer::new(config.clone(), queue.clone(), posts));
        let trigger = Arc::new(CacheTrigger::new(config, cache.clone(), queue, consumer));
        (
            RevalidateService::new(
                secret.map(String::from),
                "main",
                ContentLayout::default(),
                trigger,
            ),
            cache,
        )
    }

    fn body(payload: &WebhookPayload) -> Vec<u8> {
        serde_json::to_vec(payload).expect("json")
    }

    #[tokio::test]
    async fn missing_secret_is_a_configuration_error() {
        let (unconfigured, _) = service(None);
        let err = unconfigured
            .handle(None, None, b"{}")
            .await
            .expect_err("500");
        assert!(matches!(err, RevalidateError::NotConfigured));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let (empty, _) = service(Some(""));
        assert!(empty.ensure_configured().is_err());
    }

    #[tokio::test]
    async fn bad_signature_invalidates_nothing() {
        let (service, cache) = service(Some(SECRET));
        let body = body(&payload(
            "refs/heads/main",
            vec![commit(&["content/a.mdx"], &[], &[])],
        ));

        let err = service
            .handle(Some("sha256=00"), None, &body)
            .await
            .expect_err("401");
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(cache.generation(&CacheTag::PostsIndex), 0);
    }

    #[tokio::test]
    async fn signed_push_invalidates_derived_tags() {
        let (service, cache) = service(Some(SECRET));
        let body = body(&payload(
            "refs/heads/main",
            vec![commit(&["content/a.mdx"], &[], &["content/b.mdx"])],
        ));
        let signature = sign(SECRET, &body);

        let response = service
            .handle(Some(&signature), Some("push"), &body)
            .await
            .expect("processed");

        assert!(response.revalidated);
        assert!(response.timestamp.is_some());
        let tags = response.tags.expect("tags");
        assert!(tags.index);
        assert_eq!(tags.posts, vec!["post-a", "post-b"]);
        assert_eq!(cache.generation(&CacheTag::PostsIndex), 1);
        assert_eq!(cache.generation(&CacheTag::Post(slug("b"))), 1);
    }

    #[tokio::test]
    async fn foreign_branch_is_a_no_op() {
        let (service, cache) = service(Some(SECRET));
        let body = body(&payload(
            "refs/heads/feature-x",
            vec![commit(&["content/a.mdx"], &[], &[])],
        ));
        let signature = sign(SECRET, &body);

        let response = service
            .handle(Some(&signature), None, &body)
            .await
            .expect("skipped");

        assert!(!response.revalidated);
        assert_eq!(response.branch.as_deref(), Some("refs/heads/feature-x"));
        assert_eq!(cache.generation(&CacheTag::PostsIndex), 0);
    }

    #[tokio::test]
    async fn ping_and_other_events_are_acknowledged() {
        let (service, _) = service(Some(SECRET));
        let body = br#"{"zen":"Keep it logically awesome."}"#;
        let signature = sign(SECRET, body);

        let ping = service
            .handle(Some(&signature), Some("ping"), body)
            .await
            .expect("ping");
        assert_eq!(ping.message.as_deref(), Some("pong"));

        let issues = service
            .handle(Some(&signature), Some("issues"), body)
            .await
            .expect("issues");
        assert!(!issues.revalidated);
    }

    #[tokio::test]
    async fn unparseable_push_is_rejected() {
        let (service, _) = service(Some(SECRET));
        let body = b"not json";
        let signature = sign(SECRET, body);

        let err = service
            .handle(Some(&signature), None, body)
            .await
            .expect_err("400");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    const DOC: &str = "---\ntitle: T\ntimestamp: 2024-01-01\n---\nbody\n";

    async fn wait_for(cache: &MemoryTagCache, keys: &[CacheKey]) -> bool {
        for _ in 0..200 {
            let mut all = true;
            for key in keys {
                all &= cache.get(key).await.is_some();
            }
            if all {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }

    #[tokio::test]
    async fn eager_refresh_warms_modified_posts_and_skips_removed_ones() {
        let store = Arc::new(FakeStore::default());
        store.put("content/a.mdx", DOC);
        store.put("content/c.mdx", DOC);
        let (service, cache) = service_with(Some(SECRET), CacheConfig::default(), store.clone());
        let body = body(&payload(
            "refs/heads/main",
            vec![commit(&[], &["content/b.mdx"], &["content/a.mdx"])],
        ));
        let signature = sign(SECRET, &body);

        let response = service
            .handle(Some(&signature), Some("push"), &body)
            .await
            .expect("processed");
        assert!(response.revalidated);
        assert_eq!(response.tags.expect("tags").posts, vec!["post-a", "post-b"]);

        assert!(
            wait_for(&cache, &[CacheKey::PostBySlug(slug("a")), CacheKey::AllPosts]).await,
            "background refresh never filled the cache"
        );
        assert!(cache.get(&CacheKey::PostBySlug(slug("b"))).await.is_none());
        assert!(!store.was_fetched("content/b.mdx"));
    }

    #[tokio::test]
    async fn failing_refresh_does_not_change_the_response() {
        let store = Arc::new(FakeStore::default());
        store.put("content/a.mdx", DOC);
        store.fail_on("content/a.mdx");
        let (service, cache) = service_with(Some(SECRET), CacheConfig::default(), store.clone());
        let body = body(&payload(
            "refs/heads/main",
            vec![commit(&[], &[], &["content/a.mdx"])],
        ));
        let signature = sign(SECRET, &body);

        let response = service
            .handle(Some(&signature), Some("push"), &body)
            .await
            .expect("processed");
        assert!(response.revalidated);
        assert!(response.tags.expect("tags").index);

        for _ in 0..200 {
            if store.was_fetched("content/a.mdx") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(store.was_fetched("content/a.mdx"));
        assert!(cache.get(&CacheKey::PostBySlug(slug("a"))).await.is_none());
    }
}
