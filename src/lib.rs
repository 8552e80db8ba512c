//! Blog content served from a GitHub repository, cached per tag and
//! invalidated by push webhooks.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
