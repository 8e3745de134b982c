//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use edge_guard::config::GuardConfig;
use edge_guard::security::{FixedWindowLimiter, RequestGate};
use edge_guard::{HttpServer, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Start a mock upstream that answers every request with a 200 whose body
/// is the raw request head it received. It also sets `X-Frame-Options:
/// SAMEORIGIN` so tests can check the gate overrides upstream headers.
#[allow(dead_code)]
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut head = Vec::new();
                        let mut buf = [0u8; 1024];
                        loop {
                            match socket.read(&mut buf).await {
                                Ok(0) | Err(_) => break,
                                Ok(n) => {
                                    head.extend_from_slice(&buf[..n]);
                                    if head.windows(4).any(|w| w == b"\r\n\r\n") {
                                        break;
                                    }
                                }
                            }
                        }

                        let body = String::from_utf8_lossy(&head).to_string();
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nX-Frame-Options: SAMEORIGIN\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Config for tests: small limits, trusted app origin, no sweeper.
#[allow(dead_code)]
pub fn test_config(max_requests: u32) -> GuardConfig {
    let mut config = GuardConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.security.max_request_bytes = 1024;
    config.security.trusted_origins = vec!["https://app.example".into()];
    config.rate_limit.max_requests = max_requests;
    config.rate_limit.window_secs = 60;
    config.rate_limit.sweep_interval_secs = 0;
    config
}

/// Server plus a handle on its limiter table.
#[allow(dead_code)]
pub fn server_with_limiter(config: GuardConfig) -> (HttpServer, Arc<FixedWindowLimiter>) {
    let limiter = Arc::new(FixedWindowLimiter::from_config(&config.rate_limit));
    let gate = RequestGate::new(config.security.clone(), limiter.clone());
    let server = HttpServer::with_gate(config, gate).unwrap();
    (server, limiter)
}

/// Serve on an ephemeral port. Returns the address and the shutdown handle.
#[allow(dead_code)]
pub async fn spawn_server(server: HttpServer) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    // Listener is already bound; give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, shutdown)
}

/// GET request from a fixed forwarded client address.
#[allow(dead_code)]
pub fn get_from(client_ip: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-forwarded-for", client_ip)
        .body(Body::empty())
        .unwrap()
}
