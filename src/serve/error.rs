use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::github;
use crate::prelude::*;

/// A handler error: an [`eyre::Report`](color_eyre::Report) plus the status it should be served with.
///
/// Rendered as `{ "success": false, "message": ... }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    report: Report,
}

impl ApiError {
    pub fn new(status: StatusCode, report: Report) -> Self {
        Self { status, report }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, eyre!(message.into()))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, eyre!(message.into()))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, eyre!(message.into()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.status.is_server_error() {
            true => error!("{:?}", self.report),
            false => warn!("{} ({})", self.report, self.status),
        }

        let body = json!({
            "success": false,
            "message": self.report.to_string(),
        });

        (self.status, Json(body)).into_response()
    }
}

// Lets handlers use `?` on anything that converts into a report.
// GitHub errors keep enough information to pick a better status than 500.
impl<E> From<E> for ApiError
where
    E: Into<Report>,
{
    fn from(err: E) -> Self {
        let report: Report = err.into();

        let status = match report.downcast_ref::<github::Error>() {
            Some(err @ github::Error::Api { .. }) => {
                debug!("GitHub answered {:?}", err.status());
                StatusCode::BAD_REQUEST
            }
            Some(github::Error::Transport(_) | github::Error::Malformed(_)) => StatusCode::BAD_GATEWAY,
            None => StatusCode::INTERNAL_SERVER_ERROR,
        };

        Self::new(status, report)
    }
}
