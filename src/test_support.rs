// src/test_support.rs
// In-process stub backend for exercising the HTTP clients.

use axum::Router;

/// Serve `router` on an ephemeral localhost port and return its base URL.
pub async fn spawn_backend(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub backend");
    let addr = listener.local_addr().expect("stub backend address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("stub backend crashed");
    });
    format!("http://{}", addr)
}

/// A base URL nothing listens on.
pub const UNREACHABLE_BASE_URL: &str = "http://127.0.0.1:1";
