//! HTTP client for the chat proxy: one POST per submitted message.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::messages::{ChatRequest, Reference, Reply};

/// Delivers one message and waits for the single full reply.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, message: &str) -> Result<Reply, ClientError>;
}

/// The proxy could not be reached or did not answer with an assistant-shaped body.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("proxy request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("proxy reply could not be decoded: {0}")]
    Decode(String),
}

/// Body returned by the proxy for every turn, including failed ones.
#[derive(Debug, serde::Deserialize)]
struct ReplyBody {
    content: String,
    #[serde(default)]
    urls: Option<serde_json::Value>,
}

impl ReplyBody {
    fn into_reply(self) -> Reply {
        let references = match self.urls {
            None => Vec::new(),
            Some(value) => serde_json::from_value::<Vec<Reference>>(value).unwrap_or_else(|e| {
                warn!("ignoring unreadable reference list: {e}");
                Vec::new()
            }),
        };
        Reply {
            content: self.content,
            references,
        }
    }
}

/// Talks to the proxy endpoint. No client-side timeout: the proxy's own
/// deadline bounds every call.
#[derive(Clone, Debug)]
pub struct ProxyClient {
    http: reqwest::Client,
    url: String,
}

impl ProxyClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl ChatTransport for ProxyClient {
    async fn send(&self, message: &str) -> Result<Reply, ClientError> {
        let response = self
            .http
            .post(&self.url)
            .json(&ChatRequest { message })
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        let body: ReplyBody =
            serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))?;
        if !status.is_success() {
            debug!(status = status.as_u16(), "proxy reported a failed turn");
        }
        Ok(body.into_reply())
    }
}
