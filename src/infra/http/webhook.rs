//! `POST /api/revalidate`: GitHub push webhook.

use axum::Json;
use axum::body::{Body, to_bytes};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use gitpress_api_types::RevalidateResponse;
use http_body_util::LengthLimitError;

use crate::application::revalidate::{RevalidateError, record_rejection};

use super::AppState;
use super::error::ApiError;

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
pub const EVENT_HEADER: &str = "x-github-event";

pub async fn revalidate(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, ApiError> {
    // Configuration is checked before the body is touched.
    if let Err(err) = state.revalidate.ensure_configured() {
        record_rejection(&err);
        return Err(err.into());
    }

    let limit = state.max_body_bytes;
    let body = match to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(err) => {
            let err = if err.into_inner().is::<LengthLimitError>() {
                RevalidateError::PayloadTooLarge { limit }
            } else {
                RevalidateError::UnreadableBody
            };
            record_rejection(&err);
            return Err(err.into());
        }
    };

    let signature = header_str(&headers, SIGNATURE_HEADER);
    let event = header_str(&headers, EVENT_HEADER);

    let response: RevalidateResponse = state.revalidate.handle(signature, event, &body).await?;
    Ok(Json(response))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
