//! Post metadata derived from front matter, plus listing order rules.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use thiserror::Error;
use time::{
    Date, OffsetDateTime, PrimitiveDateTime,
    format_description::{
        FormatItem,
        well_known::{Iso8601, Rfc3339},
    },
    macros::format_description,
};

use super::slug::Slug;

const DATE_ONLY_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("front matter is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("front matter field `{field}` is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl MetadataError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Typed view of a post's front matter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMetadata {
    pub title: String,
    pub timestamp: String,
    pub description: String,
    pub slug: Slug,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
}

/// A post with its raw (unrendered) body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    #[serde(flatten)]
    pub metadata: PostMetadata,
    pub content: String,
}

impl PostMetadata {
    /// Coerce loosely-typed front matter into metadata for `slug`.
    ///
    /// `title` is required. `timestamp` and `description` default to empty
    /// strings. Unknown keys are ignored.
    pub fn from_front_matter(
        slug: Slug,
        fields: &BTreeMap<String, Value>,
    ) -> Result<Self, MetadataError> {
        let title = scalar_field(fields, "title")?
            .filter(|title| !title.trim().is_empty())
            .ok_or(MetadataError::MissingField("title"))?;
        let timestamp = scalar_field(fields, "timestamp")?.unwrap_or_default();
        let description = scalar_field(fields, "description")?.unwrap_or_default();
        let tags = tags_field(fields)?;
        let published = published_field(fields)?;

        Ok(Self {
            title,
            timestamp,
            description,
            slug,
            tags,
            published,
        })
    }

    /// Only an explicit `published: false` hides a post from listings.
    pub fn is_published(&self) -> bool {
        self.published != Some(false)
    }

    /// Instant used for ordering. Missing or unparseable timestamps sort as
    /// the Unix epoch.
    pub fn sort_instant(&self) -> OffsetDateTime {
        parse_timestamp(&self.timestamp).unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }
}

/// Order posts newest first. Equal instants keep their input order.
pub fn sort_newest_first(posts: &mut [PostMetadata]) {
    posts.sort_by_key(|post| std::cmp::Reverse(post.sort_instant()));
}

/// Entry that follows `slug` in `posts`, if any.
pub fn next_after<'a>(posts: &'a [PostMetadata], slug: &str) -> Option<&'a PostMetadata> {
    let index = posts.iter().position(|post| post.slug.as_str() == slug)?;
    posts.get(index + 1)
}

fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(instant) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(instant);
    }
    if let Ok(instant) = OffsetDateTime::parse(raw, &Iso8601::DEFAULT) {
        return Some(instant);
    }
    if let Ok(naive) = PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT) {
        return Some(naive.assume_utc());
    }
    Date::parse(raw, DATE_ONLY_FORMAT)
        .ok()
        .map(|date| date.midnight().assume_utc())
}

fn scalar_field(
    fields: &BTreeMap<String, Value>,
    field: &'static str,
) -> Result<Option<String>, MetadataError> {
    match fields.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => scalar_to_string(value)
            .map(Some)
            .ok_or_else(|| MetadataError::invalid(field, "expected a scalar value")),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn tags_field(fields: &BTreeMap<String, Value>) -> Result<Option<String>, MetadataError> {
    match fields.get("tags") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Sequence(items)) => {
            let tags = items
                .iter()
                .map(|item| {
                    scalar_to_string(item)
                        .ok_or_else(|| MetadataError::invalid("tags", "expected scalar items"))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Some(tags.join(", ")))
        }
        Some(value) => scalar_to_string(value)
            .map(Some)
            .ok_or_else(|| MetadataError::invalid("tags", "expected a string or a list")),
    }
}

fn published_field(fields: &BTreeMap<String, Value>) -> Result<Option<bool>, MetadataError> {
    match fields.get("published") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(*flag)),
        Some(Value::String(text)) if text.eq_ignore_ascii_case("true") => Ok(Some(true)),
        Some(Value::String(text)) if text.eq_ignore_ascii_case("false") => Ok(Some(false)),
        Some(_) => Err(MetadataError::invalid("published", "expected a boolean")),
    }
}
