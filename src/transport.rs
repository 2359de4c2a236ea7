// src/transport.rs
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// Base URL plus a shared reqwest client. Every backend call goes through
/// [`ApiTransport::send`] so requests are logged the same way.
#[derive(Debug, Clone)]
pub struct ApiTransport {
    client: Client,
    base_url: String,
}

impl ApiTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve an endpoint path against the base URL. Absolute URLs pass through.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    pub async fn send(&self, request: RequestBuilder) -> Result<Response, reqwest::Error> {
        let request = request.build()?;
        let span = tracing::info_span!(
            "backend_call",
            request_id = %Uuid::new_v4(),
            method = %request.method(),
            url = %request.url()
        );

        let start = Instant::now();
        let result = self.client.execute(request).instrument(span.clone()).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        span.in_scope(|| match &result {
            Ok(response) => log_status(response.status(), duration_ms),
            Err(e) => tracing::warn!(duration_ms, error = %e, "backend unreachable"),
        });
        result
    }
}

/// 5xx logs at error, 4xx at warn, anything else at info.
fn log_status(status: StatusCode, duration_ms: u64) {
    let code = status.as_u16();
    if status.is_server_error() {
        tracing::error!(status = code, duration_ms, "backend answered with a server error");
    } else if status.is_client_error() {
        tracing::warn!(status = code, duration_ms, "backend rejected the call");
    } else {
        tracing::info!(status = code, duration_ms, "backend answered");
    }
}
