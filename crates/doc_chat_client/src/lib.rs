//! Document chat client library (config, proxy transport, conversation state,
//! reference actions, terminal rendering). Used by the `doc-chat` binary.

pub mod client;
pub mod config;
pub mod conversation;
pub mod input;
pub mod markdown;
pub mod messages;
pub mod references;
pub mod render;

pub use client::{ChatTransport, ClientError, ProxyClient};
pub use config::{default_config_path, Config, ConfigError};
pub use conversation::{ChatSession, Conversation, SubmitState, SEND_FAILED_BANNER};
pub use messages::{Message, Reference, Reply, Role};
pub use references::{document_title, DocumentKind, DownloadOutcome, Downloader};
