//! Application services: content repository and webhook processing.

pub mod error;
pub mod frontmatter;
pub mod posts;
pub mod repos;
pub mod revalidate;
