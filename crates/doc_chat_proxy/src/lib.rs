//! # doc_chat_proxy
//!
//! HTTP endpoint that relays a single chat message to the document assistant
//! backend with a bounded deadline and normalises every outcome into an
//! assistant-shaped reply.

pub mod config;
pub mod deadline;
pub mod error;
pub mod handler;
pub mod messages;
pub mod upstream;

pub use config::ProxyConfig;
pub use error::{ProxyError, ProxyResult};
pub use messages::{AssistantReply, Role};
pub use upstream::UpstreamClient;

use std::any::Any;
use std::future::Future;

use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub const CHAT_ROUTE: &str = "/api/chat";
pub const HEALTH_ROUTE: &str = "/health";

/// Shared application state passed to all handlers. Immutable per request.
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: ProxyConfig,
    pub upstream: UpstreamClient,
}

impl AppState {
    pub fn new(config: ProxyConfig) -> Self {
        let upstream = UpstreamClient::new(config.upstream_url.clone(), config.deadline);
        Self { config, upstream }
    }
}

fn panic_reply(_panic: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("chat handler panicked");
    ProxyError::Internal("handler panicked".into()).into_response()
}

type PanicHandler = fn(Box<dyn Any + Send + 'static>) -> Response;

fn panic_layer() -> CatchPanicLayer<PanicHandler> {
    CatchPanicLayer::custom(panic_reply as PanicHandler)
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    Router::new()
        .route(HEALTH_ROUTE, get(handler::health_check))
        .route(CHAT_ROUTE, post(handler::chat_handler))
        .layer(panic_layer())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the proxy on an already bound listener until `shutdown` completes.
/// Upstream calls still in flight at that point are aborted.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(upstream = %state.upstream.url(), "doc-chat proxy listening on http://{addr}");
    }
    let upstream = state.upstream.clone();
    let shutdown = async move {
        shutdown.await;
        upstream.abort_all();
    };
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Binds `config.bind_addr` and serves until `shutdown` completes.
pub async fn run_server_with_shutdown<F>(config: ProxyConfig, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(&config.bind_addr).await?;
    serve(listener, AppState::new(config), shutdown).await
}
