//! Conversation state and the submit lifecycle (compose → send → await → render/err).

use tracing::{debug, warn};

use crate::client::{ChatTransport, ClientError};
use crate::messages::{Message, Reply, Role};

/// Banner shown when the proxy itself cannot be reached.
pub const SEND_FAILED_BANNER: &str = "Failed to get a response. Please try again.";

/// Ordered, append-only transcript for one session.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    scroll_request: Option<usize>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// The single mutation entry point. Returns the index of the new entry
    /// and asks the view to scroll to it.
    pub fn append(&mut self, message: Message) -> usize {
        self.messages.push(message);
        let newest = self.messages.len() - 1;
        self.scroll_request = Some(newest);
        newest
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Index of the newest entry, once per mutation.
    pub fn take_scroll_request(&mut self) -> Option<usize> {
        self.scroll_request.take()
    }

    /// The most recent assistant reply, whether or not it links documents.
    pub fn last_reply(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role() == Role::Assistant)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitState {
    #[default]
    Idle,
    Sending,
}

/// Top-level chat state owned by the front end.
#[derive(Debug, Default)]
pub struct ChatSession {
    conversation: Conversation,
    input: String,
    state: SubmitState,
    error: Option<&'static str>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn take_scroll_request(&mut self) -> Option<usize> {
        self.conversation.take_scroll_request()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn state(&self) -> SubmitState {
        self.state
    }

    /// Whether the submit control is enabled.
    pub fn can_submit(&self) -> bool {
        self.state == SubmitState::Idle && !self.input.trim().is_empty()
    }

    pub fn error(&self) -> Option<&'static str> {
        self.error
    }

    /// Idle → Sending. Appends the user message, clears input and any banner,
    /// and returns the trimmed text to send. `None` means nothing happened.
    pub fn begin_submit(&mut self) -> Option<String> {
        if !self.can_submit() {
            return None;
        }
        let text = self.input.trim().to_string();
        self.conversation.append(Message::user(text.clone()));
        self.input.clear();
        self.error = None;
        self.state = SubmitState::Sending;
        Some(text)
    }

    /// Sending → Idle. A reply becomes an assistant entry; a transport failure
    /// only raises the banner.
    pub fn finish_submit(&mut self, result: Result<Reply, ClientError>) {
        if self.state != SubmitState::Sending {
            warn!("finish_submit called while idle");
        }
        self.state = SubmitState::Idle;
        match result {
            Ok(reply) => {
                self.conversation.append(reply.into_message());
            }
            Err(e) => {
                warn!("chat turn failed: {e}");
                self.error = Some(SEND_FAILED_BANNER);
            }
        }
    }

    /// Runs one full submit cycle. Returns `false` when the submit was a no-op.
    pub async fn submit<T>(&mut self, transport: &T) -> bool
    where
        T: ChatTransport + ?Sized,
    {
        let Some(text) = self.begin_submit() else {
            return false;
        };
        debug!(len = text.len(), "submitting message");
        let result = transport.send(&text).await;
        self.finish_submit(result);
        true
    }
}
