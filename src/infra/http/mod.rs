mod api;
mod error;
mod middleware;
mod webhook;

use std::sync::Arc;

use axum::{
    Router,
    http::StatusCode,
    middleware as axum_middleware,
    routing::{get, post},
};

use crate::application::{posts::PostService, revalidate::RevalidateService};

pub use error::ApiError;
pub use middleware::{GITHUB_DELIVERY_HEADER, RequestContext};
pub use webhook::{EVENT_HEADER, SIGNATURE_HEADER};

pub const WEBHOOK_PATH: &str = "/api/revalidate";

#[derive(Clone)]
pub struct AppState {
    pub posts: Arc<PostService>,
    pub revalidate: Arc<RevalidateService>,
    pub max_body_bytes: usize,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(WEBHOOK_PATH, post(webhook::revalidate))
        .route("/api/posts", get(api::list_posts))
        .route("/api/posts/{slug}", get(api::get_post))
        .route("/api/posts/{slug}/next", get(api::next_post))
        .route("/api/first-post", get(api::first_post))
        .route("/api/slugs", get(api::list_slugs))
        .route("/_health", get(health))
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}
