//! GitHub contents API adapter for [`ContentStore`].

use std::time::Instant;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use metrics::histogram;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::application::repos::{ContentFile, ContentStore, StoreError};
use crate::config::ContentSettings;
use crate::domain::slug::{CONTENT_EXTENSION, ContentLayout};

use super::error::InfraError;

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION_HEADER: &str = "x-github-api-version";
const GITHUB_API_VERSION: &str = "2022-11-28";
const METRIC_CONTENT_FETCH_MS: &str = "gitpress_content_fetch_ms";

#[derive(Debug, Deserialize)]
struct DirectoryEntry {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

/// Reads posts straight from a GitHub repository at a fixed branch.
#[derive(Clone)]
pub struct GitHubContentStore {
    client: Client,
    api_base: Url,
    owner: String,
    repo: String,
    branch: String,
    token: Option<String>,
    layout: ContentLayout,
}

impl GitHubContentStore {
    pub fn new(settings: &ContentSettings) -> Result<Self, InfraError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        headers.insert(
            GITHUB_API_VERSION_HEADER,
            HeaderValue::from_static(GITHUB_API_VERSION),
        );

        let client = Client::builder()
            .user_agent(Self::user_agent())
            .default_headers(headers)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;

        if settings.api_base_url.cannot_be_a_base() {
            return Err(InfraError::configuration(format!(
                "GitHub API base `{}` cannot carry a path",
                settings.api_base_url
            )));
        }

        Ok(Self {
            client,
            api_base: settings.api_base_url.clone(),
            owner: settings.owner.clone(),
            repo: settings.repo.clone(),
            branch: settings.branch.clone(),
            token: settings.token.clone(),
            layout: settings.layout.clone(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("gitpress/", env!("CARGO_PKG_VERSION"))
    }

    /// `{api}/repos/{owner}/{repo}/contents/{path}?ref={branch}`
    fn contents_url(&self, path: &str) -> Result<Url, StoreError> {
        let mut url = self.api_base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StoreError::fetch(path, "API base cannot carry a path"))?;
            segments
                .pop_if_empty()
                .extend(["repos", self.owner.as_str(), self.repo.as_str(), "contents"])
                .extend(path.split('/').filter(|segment| !segment.is_empty()));
        }
        url.query_pairs_mut().append_pair("ref", &self.branch);
        Ok(url)
    }

    async fn get_json(&self, path: &str, op: &'static str) -> Result<Value, StoreError> {
        let started_at = Instant::now();
        let url = self.contents_url(path)?;

        let mut request = self.client.get(url);
        if let Some(token) = self.token.as_deref() {
            request = request.bearer_auth(token);
        }

        let result = Self::send(request, path).await;

        let elapsed_ms = started_at.elapsed().as_secs_f64() * 1000.0;
        histogram!(METRIC_CONTENT_FETCH_MS, "op" => op).record(elapsed_ms);
        debug!(
            target = "gitpress::infra::github",
            op,
            path,
            elapsed_ms,
            ok = result.is_ok(),
            "GitHub contents request finished"
        );

        result
    }

    async fn send(request: reqwest::RequestBuilder, path: &str) -> Result<Value, StoreError> {
        let response = request
            .send()
            .await
            .map_err(|err| StoreError::fetch(path, err))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::not_found(path));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|err| StoreError::fetch(path, err))?;
        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes);
            return Err(StoreError::fetch(
                path,
                format!("status {status} body {}", truncate(&text, 200)),
            ));
        }
        serde_json::from_slice::<Value>(&bytes)
            .map_err(|err| StoreError::fetch(path, format!("failed to parse body: {err}")))
    }
}

#[async_trait]
impl ContentStore for GitHubContentStore {
    async fn list_content_files(&self) -> Result<Vec<ContentFile>, StoreError> {
        let directory = self.layout.directory();
        let listing = self.get_json(directory, "list").await?;
        let Value::Array(entries) = listing else {
            return Ok(Vec::new());
        };

        let files = entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value::<DirectoryEntry>(entry).ok())
            .filter(|entry| entry.kind == "file" && entry.name.ends_with(CONTENT_EXTENSION))
            .map(|entry| ContentFile {
                name: entry.name,
                path: entry.path,
            })
            .collect();
        Ok(files)
    }

    async fn fetch_file_content(&self, path: &str) -> Result<String, StoreError> {
        let body = self.get_json(path, "fetch").await?;
        if body.is_array() {
            return Err(StoreError::fetch(path, "path is a directory"));
        }

        let entry: FileEntry = serde_json::from_value(body)
            .map_err(|err| StoreError::fetch(path, format!("unexpected response shape: {err}")))?;
        if entry.kind != "file" {
            return Err(StoreError::fetch(
                path,
                format!("expected a file, found `{}`", entry.kind),
            ));
        }

        match (entry.encoding.as_deref(), entry.content) {
            (Some("base64"), Some(content)) => decode_base64(path, &content),
            (Some(encoding), _) => Err(StoreError::fetch(
                path,
                format!("content is not inlined (encoding `{encoding}`)"),
            )),
            (None, _) => Err(StoreError::fetch(path, "response carries no content")),
        }
    }
}

/// GitHub wraps base64 payloads at 60 columns.
fn decode_base64(path: &str, content: &str) -> Result<String, StoreError> {
    let compact: String = content
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|err| StoreError::fetch(path, format!("invalid base64 content: {err}")))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
