//! JSON shapes exchanged with the browser client and the upstream assistant.

use serde::{Deserialize, Serialize};

/// Reply content used when the upstream body carries neither `response` nor `message`.
pub const NO_RESPONSE: &str = "No response received";

/// Client → proxy: a single chat message.
///
/// Fields are optional on the way in so that a missing `message` can be
/// reported as a validation failure instead of a decode error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

/// Proxy → upstream: the forwarded message.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundRequest<'a> {
    pub message: &'a str,
}

/// The only role the proxy ever answers with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Assistant,
}

/// Proxy → client: every response body, success or failure, has this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantReply {
    pub role: Role,
    pub content: String,
    /// Reference list copied verbatim from the upstream body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<serde_json::Value>,
}

impl AssistantReply {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            urls: None,
        }
    }

    pub fn with_urls(mut self, urls: Option<serde_json::Value>) -> Self {
        self.urls = urls;
        self
    }
}

/// Upstream → proxy: the assistant's answer.
///
/// A text field counts as present only when it holds a JSON string, so an
/// empty string is kept as a legitimate reply; `null` or a missing key is
/// treated as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamBody {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub urls: Option<serde_json::Value>,
}

impl UpstreamBody {
    /// Ordered lookup: `response`, then `message`, then [`NO_RESPONSE`].
    pub fn reply_text(&self) -> &str {
        self.response
            .as_deref()
            .or(self.message.as_deref())
            .unwrap_or(NO_RESPONSE)
    }

    pub fn into_reply(self) -> AssistantReply {
        let content = self.reply_text().to_string();
        AssistantReply::new(content).with_urls(self.urls)
    }
}
