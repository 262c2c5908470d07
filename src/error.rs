//! HTTP error conversion

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

/// Any failure inside a handler.
///
/// The cause is logged; the caller only sees a bare 500.
#[derive(Debug)]
pub struct ApiError(pub anyhow::Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %format!("{:#}", self.0), "Request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
