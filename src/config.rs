// src/config.rs
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use crate::page::Page;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_REVERSE_URL: &str = "/map/reverse_geocode";
pub const DEFAULT_SESSION_FILE: &str = ".travel_session.json";

/// Settings a server-rendered page embeds as data attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageConfig {
    pub reverse_url: String,
    pub ai_configured: bool,
    pub authenticated: bool,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            reverse_url: DEFAULT_REVERSE_URL.to_string(),
            ai_configured: false,
            authenticated: false,
        }
    }
}

impl PageConfig {
    /// Read from a dataset map (`reverseUrl`, `aiConfigured`, `authenticated`).
    /// Flags are on only when the value is exactly `"true"`.
    pub fn from_dataset(dataset: &HashMap<String, String>) -> Self {
        let flag = |key: &str| dataset.get(key).map(String::as_str) == Some("true");
        Self {
            reverse_url: dataset
                .get("reverseUrl")
                .filter(|url| !url.is_empty())
                .cloned()
                .unwrap_or_else(|| DEFAULT_REVERSE_URL.to_string()),
            ai_configured: flag("aiConfigured"),
            authenticated: flag("authenticated"),
        }
    }

    /// Read from the `#page-config` element, falling back to defaults when absent.
    pub fn from_page(page: &Page) -> Self {
        match page.by_id("page-config") {
            Some(element) => Self::from_dataset(&element.dataset()),
            None => {
                tracing::debug!("No #page-config element; using default page config");
                Self::default()
            }
        }
    }
}

/// Process-level configuration for the console client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub page: PageConfig,
    pub session_file: PathBuf,
    pub markdown: bool,
    pub sanitize: bool,
}

impl ClientConfig {
    /// Load from the environment (after `.env` has been applied).
    pub fn from_env() -> Self {
        let base_url = env::var("TRAVEL_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let reverse_url =
            env::var("TRAVEL_REVERSE_URL").unwrap_or_else(|_| DEFAULT_REVERSE_URL.to_string());
        let ai_configured = env_flag("TRAVEL_AI_CONFIGURED", true);
        let authenticated = env_flag("TRAVEL_AUTHENTICATED", false);
        let session_file = env::var("TRAVEL_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SESSION_FILE));
        let markdown = env::var("TRAVEL_MARKDOWN").as_deref() != Ok("off");
        let sanitize = env::var("TRAVEL_SANITIZE").as_deref() != Ok("off");

        Self {
            base_url,
            page: PageConfig {
                reverse_url,
                ai_configured,
                authenticated,
            },
            session_file,
            markdown,
            sanitize,
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(value) => matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        Err(_) => default,
    }
}
