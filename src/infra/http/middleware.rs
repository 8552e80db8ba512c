use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::{Instrument, debug, error, info_span, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

pub const GITHUB_DELIVERY_HEADER: &str = "x-github-delivery";
const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
const MAX_INBOUND_REQUEST_ID_LEN: usize = 64;

#[derive(Clone, Debug)]
pub struct RequestContext {
    pub request_id: String,
    /// GitHub's id for a webhook delivery, when the request is one.
    pub delivery_id: Option<String>,
}

impl RequestContext {
    fn from_headers(headers: &HeaderMap) -> Self {
        let request_id = header_text(headers, REQUEST_ID_HEADER.as_str())
            .filter(|id| is_acceptable_request_id(id))
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let delivery_id = header_text(headers, GITHUB_DELIVERY_HEADER).map(str::to_string);
        Self {
            request_id,
            delivery_id,
        }
    }
}

/// Tag every request with an id, echoed back as `x-request-id`. A
/// well-formed inbound id is kept.
pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext::from_headers(request.headers());
    request.extensions_mut().insert(ctx.clone());

    let span = info_span!(
        "request",
        request_id = %ctx.request_id,
        delivery_id = ctx.delivery_id.as_deref().unwrap_or(""),
    );
    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&ctx.request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response.extensions_mut().insert(ctx);
    response
}

/// Log failed responses with the diagnostic chain handlers attached.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started_at = Instant::now();

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started_at.elapsed().as_millis() as u64;

    if !(status.is_client_error() || status.is_server_error()) {
        debug!(
            target = "gitpress::http::response",
            status = status.as_u16(),
            method = %method,
            path = %path,
            elapsed_ms,
            "request served"
        );
        return response;
    }

    let report = response.extensions_mut().remove::<ErrorReport>();
    let (source, chain) = match report {
        Some(report) => (report.source, report.messages),
        None => ("unknown", Vec::new()),
    };
    let detail = chain
        .first()
        .map(String::as_str)
        .unwrap_or("no diagnostic available");

    if status.is_client_error() {
        warn!(
            target = "gitpress::http::response",
            status = status.as_u16(),
            method = %method,
            path = %path,
            elapsed_ms,
            source,
            detail,
            chain = ?chain,
            "client request error"
        );
    } else {
        error!(
            target = "gitpress::http::response",
            status = status.as_u16(),
            method = %method,
            path = %path,
            elapsed_ms,
            source,
            detail,
            chain = ?chain,
            "request failed"
        );
    }

    response
}

fn header_text<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn is_acceptable_request_id(id: &str) -> bool {
    id.len() <= MAX_INBOUND_REQUEST_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}
