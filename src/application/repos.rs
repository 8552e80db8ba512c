//! Content store traits describing the remote repository adapter.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("content file `{path}` not found")]
    NotFound { path: String },
    #[error("failed to fetch `{path}`: {message}")]
    Fetch { path: String, message: String },
}

impl StoreError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn fetch(path: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Fetch {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A content file as reported by the directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFile {
    pub name: String,
    pub path: String,
}

/// Read-only access to the posts directory of the source repository.
///
/// Implementations never cache and never retry.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Content files (`*.mdx`) in listing order.
    async fn list_content_files(&self) -> Result<Vec<ContentFile>, StoreError>;

    /// Decoded text of the file at `path`.
    async fn fetch_file_content(&self, path: &str) -> Result<String, StoreError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Store backed by an ordered list of `(path, content)` pairs.
    #[derive(Default)]
    pub(crate) struct FakeStore {
        files: Mutex<Vec<(String, String)>>,
        failing: Mutex<Option<String>>,
        pub(crate) listings: AtomicUsize,
        pub(crate) fetches: AtomicUsize,
        fetched: Mutex<Vec<String>>,
    }

    impl FakeStore {
        pub(crate) fn put(&self, path: &str, content: &str) {
            let mut files = self.files.lock().expect("files");
            if let Some(existing) = files.iter_mut().find(|(p, _)| p == path) {
                existing.1 = content.to_string();
            } else {
                files.push((path.to_string(), content.to_string()));
            }
        }

        pub(crate) fn remove(&self, path: &str) {
            self.files.lock().expect("files").retain(|(p, _)| p != path);
        }

        pub(crate) fn fail_on(&self, path: &str) {
            *self.failing.lock().expect("failing") = Some(path.to_string());
        }

        pub(crate) fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }

        pub(crate) fn listing_count(&self) -> usize {
            self.listings.load(Ordering::SeqCst)
        }

        pub(crate) fn was_fetched(&self, path: &str) -> bool {
            self.fetched.lock().expect("fetched").iter().any(|p| p == path)
        }
    }

    #[async_trait]
    impl ContentStore for FakeStore {
        async fn list_content_files(&self) -> Result<Vec<ContentFile>, StoreError> {
            self.listings.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .files
                .lock()
                .expect("files")
                .iter()
                .map(|(path, _)| ContentFile {
                    name: path.rsplit('/').next().unwrap_or_default().to_string(),
                    path: path.clone(),
                })
                .collect())
        }

        async fn fetch_file_content(&self, path: &str) -> Result<String, StoreError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.fetched.lock().expect("fetched").push(path.to_string());
            if self.failing.lock().expect("failing").as_deref() == Some(path) {
                return Err(StoreError::fetch(path, "connection reset"));
            }
            self.files
                .lock()
                .expect("files")
                .iter()
                .find(|(p, _)| p == path)
                .map(|(_, content)| content.clone())
                .ok_or_else(|| StoreError::not_found(path))
        }
    }
}
