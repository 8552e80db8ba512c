//! Post slugs and the content-file naming scheme.
//!
//! A slug is the file name of a post with the content directory and the
//! `.mdx` extension removed. [`ContentLayout`] owns both directions of that
//! mapping so the webhook and the repository can never disagree about which
//! file a slug names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Extension carried by every content file.
pub const CONTENT_EXTENSION: &str = ".mdx";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug is empty")]
    Empty,
    #[error("slug `{0}` is a relative path component")]
    RelativeComponent(String),
    #[error("slug `{0}` contains a path separator")]
    PathSeparator(String),
    #[error("slug `{0}` contains the content extension")]
    ContainsExtension(String),
    #[error("slug contains a control character")]
    ControlCharacter,
    #[error("content directory is empty")]
    EmptyDirectory,
    #[error("content directory `{0}` has an empty, `.`, `..` or backslash segment")]
    InvalidDirectory(String),
}

/// Identifier of a single post.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    pub fn parse(value: &str) -> Result<Self, SlugError> {
        if value.is_empty() {
            return Err(SlugError::Empty);
        }
        if value == "." || value == ".." {
            return Err(SlugError::RelativeComponent(value.to_string()));
        }
        if value.contains(['/', '\\']) {
            return Err(SlugError::PathSeparator(value.to_string()));
        }
        if value.contains(CONTENT_EXTENSION) {
            return Err(SlugError::ContainsExtension(value.to_string()));
        }
        if value.chars().any(char::is_control) {
            return Err(SlugError::ControlCharacter);
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Slug {
    type Err = SlugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Slug {
    type Error = SlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Location of posts inside the source repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLayout {
    directory: String,
}

impl ContentLayout {
    /// Surrounding slashes are ignored, so `content`, `/content/` and
    /// `content/` describe the same layout. Every segment must stay inside
    /// the repository.
    pub fn new(directory: &str) -> Result<Self, SlugError> {
        let trimmed = directory.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Err(SlugError::EmptyDirectory);
        }
        let bad_segment = |segment: &str| {
            segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\')
        };
        if trimmed.split('/').any(bad_segment) {
            return Err(SlugError::InvalidDirectory(trimmed.to_string()));
        }
        Ok(Self {
            directory: trimmed.to_string(),
        })
    }

    pub fn directory(&self) -> &str {
        &self.directory
    }

    /// Repository path of the file backing `slug`.
    pub fn slug_to_path(&self, slug: &Slug) -> String {
        format!("{}/{}{}", self.directory, slug.as_str(), CONTENT_EXTENSION)
    }

    /// Inverse of [`slug_to_path`](Self::slug_to_path). Paths outside the
    /// content directory, in nested directories, or with another extension
    /// yield `None`.
    pub fn path_to_slug(&self, path: &str) -> Option<Slug> {
        let file_name = path
            .strip_prefix(self.directory.as_str())
            .and_then(|rest| rest.strip_prefix('/'))?;
        Self::file_name_to_slug(file_name)
    }

    /// Slug for a bare file name taken from a directory listing.
    pub fn file_name_to_slug(file_name: &str) -> Option<Slug> {
        let stem = file_name.strip_suffix(CONTENT_EXTENSION)?;
        Slug::parse(stem).ok()
    }
}

impl Default for ContentLayout {
    fn default() -> Self {
        Self {
            directory: "content".to_string(),
        }
    }
}
