//! JSON read surface over the content repository.

use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use gitpress_api_types::FirstPostResponse;

use super::AppState;
use super::error::ApiError;

const SOURCE: &str = "infra::http::api";

pub async fn list_posts(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let posts = state
        .posts
        .get_all_posts()
        .await
        .map_err(|err| ApiError::content_unavailable(SOURCE, &err))?;
    Ok(Json(posts.as_ref().clone()))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .posts
        .get_post_by_slug(&slug)
        .await
        .ok_or_else(|| ApiError::not_found(SOURCE, format!("post `{slug}` not found")))?;
    Ok(Json(post.as_ref().clone()))
}

pub async fn next_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let next = state
        .posts
        .get_next_post(&slug)
        .await
        .map_err(|err| ApiError::content_unavailable(SOURCE, &err))?
        .ok_or_else(|| ApiError::not_found(SOURCE, format!("no post after `{slug}`")))?;
    Ok(Json(next))
}

pub async fn first_post(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let slug = state
        .posts
        .get_first_post_slug()
        .await
        .map_err(|err| ApiError::content_unavailable(SOURCE, &err))?
        .ok_or_else(|| ApiError::not_found(SOURCE, "content directory is empty"))?;
    Ok(Json(FirstPostResponse {
        slug: slug.to_string(),
    }))
}

pub async fn list_slugs(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let slugs = state
        .posts
        .get_all_slugs()
        .await
        .map_err(|err| ApiError::content_unavailable(SOURCE, &err))?;
    Ok(Json(slugs.as_ref().clone()))
}
