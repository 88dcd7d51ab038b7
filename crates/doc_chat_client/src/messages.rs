//! Conversation data model and the JSON shapes exchanged with the proxy.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A document linked from an assistant reply. `content` is carried but not displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub url: String,
    #[serde(default)]
    pub content: String,
}

/// One transcript entry. Role and content are fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    urls: Option<Vec<Reference>>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            urls: None,
        }
    }

    /// Builds an assistant entry. References with an empty url are dropped and
    /// an empty list is stored as no list.
    pub fn assistant(content: impl Into<String>, references: Vec<Reference>) -> Self {
        let references: Vec<Reference> =
            references.into_iter().filter(|r| !r.url.is_empty()).collect();
        Self {
            role: Role::Assistant,
            content: content.into(),
            urls: (!references.is_empty()).then_some(references),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn references(&self) -> &[Reference] {
        self.urls.as_deref().unwrap_or_default()
    }

    pub fn has_references(&self) -> bool {
        self.urls.is_some()
    }
}

/// Client → proxy request body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
}

/// What a transport hands back for one submitted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub content: String,
    pub references: Vec<Reference>,
}

impl Reply {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            references: Vec::new(),
        }
    }

    pub fn into_message(self) -> Message {
        Message::assistant(self.content, self.references)
    }
}
