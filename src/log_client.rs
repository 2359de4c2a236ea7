// src/log_client.rs
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transport::ApiTransport;

pub const LOG_SEARCH_ENDPOINT: &str = "/logs/api/search";
pub const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Error, Debug)]
pub enum LogSearchError {
    #[error("Log search returned HTTP {status}")]
    Http { status: u16 },
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogQuery {
    pub q: Option<String>,
    pub level: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: usize,
    pub size: usize,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            q: None,
            level: None,
            from: None,
            to: None,
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl LogQuery {
    /// URL query string; empty filters are left out, paging is always present.
    pub fn to_query_string(&self) -> String {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(q) = self.q.as_deref().filter(|q| !q.is_empty()) {
            params.push(("q", q.to_string()));
        }
        if let Some(level) = self.level.as_deref().filter(|l| !l.is_empty()) {
            params.push(("level", level.to_string()));
        }
        if let Some(from) = self.from {
            params.push(("from", from.to_rfc3339_opts(SecondsFormat::Millis, true)));
        }
        if let Some(to) = self.to {
            params.push(("to", to.to_rfc3339_opts(SecondsFormat::Millis, true)));
        }
        params.push(("page", self.page.to_string()));
        params.push(("size", self.size.to_string()));

        params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub status_code: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct LogPage {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub hits: Vec<LogEntry>,
    /// Set when the backend has no log store configured.
    #[serde(default)]
    pub note: Option<String>,
}

#[async_trait]
pub trait LogSearch: Send + Sync {
    async fn search(&self, query: &LogQuery) -> Result<LogPage, LogSearchError>;
}

#[derive(Debug, Clone)]
pub struct LogClient {
    transport: ApiTransport,
}

impl LogClient {
    pub fn new(transport: ApiTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl LogSearch for LogClient {
    async fn search(&self, query: &LogQuery) -> Result<LogPage, LogSearchError> {
        let path = format!("{}?{}", LOG_SEARCH_ENDPOINT, query.to_query_string());
        tracing::debug!(page = query.page, size = query.size, "🔎 Searching logs");

        let response = self.transport.send(self.transport.get(&path)).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LogSearchError::Http {
                status: status.as_u16(),
            });
        }
        Ok(response.json::<LogPage>().await?)
    }
}
