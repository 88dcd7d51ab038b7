//! doc-chat-proxy: serves `POST /api/chat` in front of the assistant backend.

use clap::Parser;
use doc_chat_proxy::config::{
    BIND_ADDR_ENV, DEFAULT_BIND_ADDR, DEFAULT_UPSTREAM_URL, UPSTREAM_URL_ENV,
};
use doc_chat_proxy::ProxyConfig;
use tracing::info;

/// CLI arguments for the proxy server.
#[derive(Parser, Debug)]
#[command(name = "doc-chat-proxy", about = "Chat proxy for the document assistant")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = BIND_ADDR_ENV, default_value = DEFAULT_BIND_ADDR)]
    bind: String,

    /// Assistant endpoint messages are forwarded to.
    #[arg(long, env = UPSTREAM_URL_ENV, default_value = DEFAULT_UPSTREAM_URL)]
    upstream: String,
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,doc_chat_proxy=debug")),
        )
        .init();

    let args = Args::parse();
    let config = ProxyConfig::new(args.bind, args.upstream);

    info!(bind = %config.bind_addr, upstream = %config.upstream_url, deadline = ?config.deadline, "starting doc-chat-proxy");
    doc_chat_proxy::run_server_with_shutdown(config, shutdown_signal()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let args = Args::try_parse_from(["doc-chat-proxy", "--bind", "0.0.0.0:8080"]).unwrap();
        assert_eq!(args.bind, "0.0.0.0:8080");

        let args = Args::try_parse_from(["doc-chat-proxy", "--upstream", "http://a/chat"]).unwrap();
        assert_eq!(args.upstream, "http://a/chat");
    }
}
