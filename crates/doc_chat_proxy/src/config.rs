//! Proxy configuration.

use std::time::Duration;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_UPSTREAM_URL: &str = "http://127.0.0.1:8000/chat";

pub const BIND_ADDR_ENV: &str = "DOC_CHAT_BIND_ADDR";
pub const UPSTREAM_URL_ENV: &str = "DOC_CHAT_UPSTREAM_URL";

/// Hard limit for one upstream call, measured from the moment it starts.
pub const UPSTREAM_DEADLINE: Duration = Duration::from_secs(290);

/// Configuration for the proxy server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3000").
    pub bind_addr: String,
    /// Assistant endpoint every chat message is forwarded to.
    pub upstream_url: String,
    /// Deadline applied to each upstream call.
    pub deadline: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.into(),
            upstream_url: DEFAULT_UPSTREAM_URL.into(),
            deadline: UPSTREAM_DEADLINE,
        }
    }
}

impl ProxyConfig {
    /// Reads configuration from environment variables with defaults.
    ///
    /// | Variable                | Default                       |
    /// |-------------------------|-------------------------------|
    /// | `DOC_CHAT_BIND_ADDR`    | `127.0.0.1:3000`              |
    /// | `DOC_CHAT_UPSTREAM_URL` | `http://127.0.0.1:8000/chat`  |
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var(BIND_ADDR_ENV).unwrap_or_else(|_| DEFAULT_BIND_ADDR.into()),
            upstream_url: std::env::var(UPSTREAM_URL_ENV)
                .unwrap_or_else(|_| DEFAULT_UPSTREAM_URL.into()),
            deadline: UPSTREAM_DEADLINE,
        }
    }

    /// Explicit endpoints with the fixed deadline.
    pub fn new(bind_addr: impl Into<String>, upstream_url: impl Into<String>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            upstream_url: upstream_url.into(),
            deadline: UPSTREAM_DEADLINE,
        }
    }
}
