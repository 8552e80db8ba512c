//! Wire types shared by the gitpress server and its callers.
//!
//! The webhook payload mirrors the subset of a GitHub `push` delivery that
//! gitpress reads; every other field GitHub sends is ignored.

use serde::{Deserialize, Serialize};

/// Push notification body delivered by the source repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct WebhookPayload {
    #[serde(rename = "ref")]
    pub git_ref: String,
    #[serde(default)]
    pub commits: Vec<Commit>,
}

/// File changes carried by a single commit of a push.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Commit {
    #[serde(default)]
    pub added: Vec<String>,
    #[serde(default)]
    pub removed: Vec<String>,
    #[serde(default)]
    pub modified: Vec<String>,
}

/// Tags reported back to the webhook caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RevalidatedTags {
    pub index: bool,
    pub posts: Vec<String>,
}

/// Successful (2xx) webhook response.
///
/// A processed push carries `timestamp` and `tags`; a skipped delivery
/// (foreign branch, ping, non-push event) carries `message` and possibly
/// `branch`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RevalidateResponse {
    pub revalidated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<RevalidatedTags>,
}

impl RevalidateResponse {
    pub fn skipped(message: impl Into<String>, branch: Option<String>) -> Self {
        Self {
            revalidated: false,
            message: Some(message.into()),
            branch,
            ..Self::default()
        }
    }

    pub fn processed(timestamp: impl Into<String>, tags: RevalidatedTags) -> Self {
        Self {
            revalidated: true,
            timestamp: Some(timestamp.into()),
            tags: Some(tags),
            ..Self::default()
        }
    }
}

/// Error body used by every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FirstPostResponse {
    pub slug: String,
}
