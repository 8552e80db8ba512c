use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gitpress_api_types::ErrorBody;

use crate::application::error::ErrorReport;
use crate::application::posts::ContentError;
use crate::application::revalidate::RevalidateError;

/// JSON error response (`{"error": ...}`) carrying an [`ErrorReport`] for the
/// logging middleware.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: &'static str,
    report: ErrorReport,
}

impl ApiError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            status,
            message,
            report: ErrorReport::from_message(source, status, detail),
        }
    }

    pub fn not_found(source: &'static str, detail: impl Into<String>) -> Self {
        Self::new(source, StatusCode::NOT_FOUND, "Not found", detail)
    }

    /// Index reads that failed upstream; the cause stays in the logs.
    pub fn content_unavailable(source: &'static str, error: &ContentError) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "Content unavailable",
            report: ErrorReport::from_error(source, StatusCode::NOT_FOUND, error),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<RevalidateError> for ApiError {
    fn from(error: RevalidateError) -> Self {
        let status = error.status_code();
        Self {
            status,
            message: error.public_message(),
            report: ErrorReport::from_error("infra::http::webhook", status, &error),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(ErrorBody::new(self.message))).into_response();
        self.report.attach(&mut response);
        response
    }
}
