//! Outbound client for the assistant backend.

use std::time::Duration;

use axum::http::StatusCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::deadline::{Deadline, DeadlineError};
use crate::error::{ProxyError, ProxyResult};
use crate::messages::{AssistantReply, OutboundRequest, UpstreamBody};

/// Forwards one message per call to a fixed endpoint under a hard deadline.
///
/// Cloning is cheap and shares the underlying connection pool and the
/// shutdown token.
#[derive(Clone, Debug)]
pub struct UpstreamClient {
    http: reqwest::Client,
    url: String,
    deadline: Duration,
    shutdown: CancellationToken,
}

impl UpstreamClient {
    pub fn new(url: impl Into<String>, deadline: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            deadline,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Aborts every call in flight on this client or its clones. Calls
    /// started afterwards fail immediately.
    pub fn abort_all(&self) {
        self.shutdown.cancel();
    }

    /// Sends `message` upstream and normalises the answer.
    ///
    /// The in-flight request is dropped (and its connection closed) as soon
    /// as the deadline passes or this future is itself dropped.
    pub async fn ask(&self, message: &str) -> ProxyResult<AssistantReply> {
        let deadline = Deadline::start_within(&self.shutdown, self.deadline);
        match deadline.run(self.forward(message)).await {
            Ok(result) => result,
            Err(DeadlineError::Exceeded(limit)) => {
                warn!(url = %self.url, ?limit, "upstream call timed out");
                Err(ProxyError::Timeout(limit))
            }
            Err(DeadlineError::Cancelled) => {
                warn!(url = %self.url, "upstream call aborted by shutdown");
                Err(ProxyError::Transport("upstream call cancelled".into()))
            }
        }
    }

    async fn forward(&self, message: &str) -> ProxyResult<AssistantReply> {
        debug!(url = %self.url, len = message.len(), "forwarding message upstream");
        let response = self
            .http
            .post(&self.url)
            .json(&OutboundRequest { message })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %self.url, status = status.as_u16(), "upstream returned an error status");
            let status =
                StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return Err(ProxyError::UpstreamStatus(status));
        }

        let bytes = response.bytes().await?;
        let body: UpstreamBody = serde_json::from_slice(&bytes)?;
        Ok(body.into_reply())
    }
}
