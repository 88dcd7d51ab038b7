//! Proxy error taxonomy and its mapping onto assistant-shaped HTTP replies.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::messages::AssistantReply;

pub const MISSING_MESSAGE_REPLY: &str = "No message provided";
pub const TIMEOUT_REPLY: &str = "Sorry, the request timed out. Please try again.";
pub const UPSTREAM_STATUS_REPLY: &str = "Sorry, I encountered an error processing your request.";
pub const INTERNAL_REPLY: &str = "Sorry, something went wrong. Please try again.";

pub type ProxyResult<T> = Result<T, ProxyError>;

/// Every way a chat turn can fail inside the proxy.
///
/// The `Display` text is for logs only. Responses carry the fixed
/// [`ProxyError::reply_text`] so upstream detail never reaches the user.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("request has no message")]
    MissingMessage,

    #[error("upstream did not answer within {0:?}")]
    Timeout(Duration),

    #[error("upstream returned status {0}")]
    UpstreamStatus(StatusCode),

    #[error("upstream request failed: {0}")]
    Transport(String),

    #[error("upstream body is malformed: {0}")]
    Malformed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingMessage => StatusCode::BAD_REQUEST,
            ProxyError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            ProxyError::UpstreamStatus(status) => *status,
            ProxyError::Transport(_) | ProxyError::Malformed(_) | ProxyError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn reply_text(&self) -> &'static str {
        match self {
            ProxyError::MissingMessage => MISSING_MESSAGE_REPLY,
            ProxyError::Timeout(_) => TIMEOUT_REPLY,
            ProxyError::UpstreamStatus(_) => UPSTREAM_STATUS_REPLY,
            ProxyError::Transport(_) | ProxyError::Malformed(_) | ProxyError::Internal(_) => {
                INTERNAL_REPLY
            }
        }
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProxyError::Malformed(e.to_string())
        } else {
            ProxyError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(e: serde_json::Error) -> Self {
        ProxyError::Malformed(e.to_string())
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = Json(AssistantReply::new(self.reply_text()));
        (self.status(), body).into_response()
    }
}
