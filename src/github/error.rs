use reqwest::{Response, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use crate::prelude::*;

#[derive(Debug, Error)]
pub enum Error {
    /// The request never got a response: DNS, TLS, timeout and so on.
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),
    /// GitHub answered with an unexpected status.
    #[error("GitHub API error: {} - {message}", .status.as_u16())]
    Api { status: StatusCode, message: String },
    /// GitHub answered successfully, but not with what we expected.
    #[error("Malformed response from GitHub: {0}")]
    Malformed(String),
}

/// The error body GitHub attaches to non-2xx responses.
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

impl Error {
    pub(super) async fn from_response(response: Response) -> Self {
        let status = response.status();
        let body = response.json::<ErrorBody>().await.ok();

        let (message, errors) = match body {
            Some(ErrorBody { message, errors }) => (message, errors),
            None => (None, vec![]),
        };

        if !errors.is_empty() {
            debug!("GitHub error details: {errors:?}");
        }

        Self::Api {
            status,
            message: message.unwrap_or_else(|| "Unknown error".to_owned()),
        }
    }

    /// The upstream HTTP status, if GitHub responded at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(err) => err.status(),
            Self::Malformed(_) => None,
        }
    }
}
