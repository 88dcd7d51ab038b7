//! Integration tests for the chat proxy. The upstream assistant is a real
//! in-process HTTP server on an ephemeral port; the proxy router is driven
//! with `tower::ServiceExt::oneshot`. No mocks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use doc_chat_proxy::error::{
    INTERNAL_REPLY, MISSING_MESSAGE_REPLY, TIMEOUT_REPLY, UPSTREAM_STATUS_REPLY,
};
use doc_chat_proxy::{AppState, ProxyConfig};
use serde_json::{json, Value};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower::ServiceExt;

/// Serve `router` on 127.0.0.1:0 and return the chat URL.
async fn spawn_upstream(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/chat")
}

/// Upstream that counts calls and answers every message with `reply`.
async fn spawn_counting_upstream(status: StatusCode, reply: Value) -> (String, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .route(
            "/chat",
            post(
                move |State(calls): State<Arc<AtomicUsize>>, Json(_body): Json<Value>| {
                    let reply = reply.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        (status, Json(reply))
                    }
                },
            ),
        )
        .with_state(calls.clone());
    (spawn_upstream(router).await, calls)
}

/// Upstream that reads the request and never answers. The receivers fire
/// once the proxy connects and once it closes the connection.
async fn spawn_silent_upstream() -> (String, oneshot::Receiver<()>, oneshot::Receiver<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (accepted_tx, accepted_rx) = oneshot::channel();
    let (closed_tx, closed_rx) = oneshot::channel();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let _ = accepted_tx.send(());
        let mut buf = [0u8; 4096];
        loop {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => continue,
            }
        }
        let _ = closed_tx.send(());
    });
    (format!("http://{addr}/chat"), accepted_rx, closed_rx)
}

fn proxy_state(upstream_url: String, deadline: Duration) -> AppState {
    AppState::new(ProxyConfig {
        bind_addr: "127.0.0.1:0".into(),
        upstream_url,
        deadline,
    })
}

async fn post_chat(state: AppState, body: impl Into<Body>) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();
    let resp = doc_chat_proxy::router(state).oneshot(req).await.expect("request");
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    (status, serde_json::from_slice(&bytes).expect("parse JSON"))
}

#[tokio::test]
async fn successful_reply_is_returned_without_urls() {
    let (url, calls) = spawn_counting_upstream(StatusCode::OK, json!({"response": "hi there"})).await;
    let state = proxy_state(url, Duration::from_secs(5));

    let (status, body) = post_chat(state, r#"{"message":"hello"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"role": "assistant", "content": "hi there"}));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn message_field_is_the_fallback_and_urls_pass_through() {
    let urls = json!([{"url": "https://docs.example.com/user-guide.pdf", "content": "p. 4"}]);
    let (url, _calls) =
        spawn_counting_upstream(StatusCode::OK, json!({"message": "see guide", "urls": urls.clone()}))
            .await;
    let state = proxy_state(url, Duration::from_secs(5));

    let (status, body) = post_chat(state, r#"{"message":"where?"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "see guide");
    assert_eq!(body["urls"], urls);
}

#[tokio::test]
async fn empty_upstream_body_uses_default_text() {
    let (url, _calls) = spawn_counting_upstream(StatusCode::OK, json!({})).await;
    let (status, body) = post_chat(proxy_state(url, Duration::from_secs(5)), r#"{"message":"x"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "No response received");
}

#[tokio::test]
async fn missing_message_is_rejected_without_calling_upstream() {
    let (url, calls) = spawn_counting_upstream(StatusCode::OK, json!({"response": "nope"})).await;

    for body in [r#"{}"#, r#"{"message":""}"#, r#"{"message":null}"#, "not json"] {
        let (status, reply) = post_chat(proxy_state(url.clone(), Duration::from_secs(5)), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(reply["role"], "assistant");
        assert_eq!(reply["content"], MISSING_MESSAGE_REPLY);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn slow_upstream_times_out_and_call_is_aborted() {
    let (url, _accepted, closed) = spawn_silent_upstream().await;
    let state = proxy_state(url, Duration::from_millis(300));

    let (status, body) = post_chat(state, r#"{"message":"hello"}"#).await;

    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body["content"], TIMEOUT_REPLY);
    tokio::time::timeout(Duration::from_secs(5), closed)
        .await
        .expect("upstream connection should be closed after the deadline")
        .expect("upstream task ended");
}

#[tokio::test]
async fn upstream_error_status_is_propagated() {
    let (url, calls) =
        spawn_counting_upstream(StatusCode::SERVICE_UNAVAILABLE, json!({"detail": "overloaded"})).await;

    let (status, body) = post_chat(proxy_state(url, Duration::from_secs(5)), r#"{"message":"hello"}"#).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({"role": "assistant", "content": UPSTREAM_STATUS_REPLY}));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn malformed_upstream_json_is_a_server_error() {
    let router = Router::new().route("/chat", post(|| async { "this is not json" }));
    let url = spawn_upstream(router).await;

    let (status, body) = post_chat(proxy_state(url, Duration::from_secs(5)), r#"{"message":"hello"}"#).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["content"], INTERNAL_REPLY);
}

#[tokio::test]
async fn unreachable_upstream_is_a_server_error() {
    let port = {
        let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap().port()
    };
    let url = format!("http://127.0.0.1:{port}/chat");

    let (status, body) = post_chat(proxy_state(url, Duration::from_secs(5)), r#"{"message":"hello"}"#).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["content"], INTERNAL_REPLY);
}

#[tokio::test]
async fn concurrent_turns_are_independent() {
    let router = Router::new().route(
        "/chat",
        post(|Json(body): Json<Value>| async move {
            let message = body["message"].as_str().unwrap_or_default().to_string();
            tokio::time::sleep(Duration::from_millis(20)).await;
            Json(json!({"response": format!("echo: {message}")}))
        }),
    );
    let url = spawn_upstream(router).await;
    let state = proxy_state(url, Duration::from_secs(5));

    let mut tasks = Vec::new();
    for i in 0..8 {
        let state = state.clone();
        tasks.push(tokio::spawn(async move {
            let (status, body) = post_chat(state, json!({"message": format!("m{i}")}).to_string()).await;
            (i, status, body)
        }));
    }
    for task in tasks {
        let (i, status, body) = task.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["content"], format!("echo: m{i}"));
    }
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let state = proxy_state("http://127.0.0.1:9/chat".into(), Duration::from_secs(1));
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let resp = doc_chat_proxy::router(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "doc-chat-proxy");
}

#[tokio::test]
async fn served_over_a_real_socket() {
    let (url, _calls) = spawn_counting_upstream(StatusCode::OK, json!({"response": "pong"})).await;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(doc_chat_proxy::serve(
        listener,
        proxy_state(url, Duration::from_secs(5)),
        async move {
            let _ = stop_rx.await;
        },
    ));

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/api/chat"))
        .json(&json!({"message": "ping"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["content"], "pong");

    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn shutdown_aborts_calls_in_flight() {
    let (url, accepted, closed) = spawn_silent_upstream().await;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(doc_chat_proxy::serve(
        listener,
        proxy_state(url, Duration::from_secs(60)),
        async move {
            let _ = stop_rx.await;
        },
    ));

    let request = tokio::spawn(
        reqwest::Client::new()
            .post(format!("http://{addr}/api/chat"))
            .json(&json!({"message": "still there?"}))
            .send(),
    );
    accepted.await.expect("proxy reached the upstream");
    stop_tx.send(()).unwrap();

    let resp = tokio::time::timeout(Duration::from_secs(5), request)
        .await
        .expect("in-flight turn should end at shutdown")
        .unwrap()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["content"], INTERNAL_REPLY);

    tokio::time::timeout(Duration::from_secs(5), closed)
        .await
        .expect("upstream connection should be closed at shutdown")
        .expect("upstream task ended");
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server should stop")
        .unwrap()
        .unwrap();
}
