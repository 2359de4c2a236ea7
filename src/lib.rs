// lib.rs - Client glue for the travel map/chat web application
pub mod chat;
pub mod chat_client;
pub mod config;
pub mod coords;
pub mod html;
pub mod location_client;
pub mod log_client;
pub mod logs;
pub mod map;
pub mod markdown;
pub mod page;
pub mod session;
pub mod transport;

#[cfg(test)]
mod test_support;

// Re-export commonly used types for convenience
pub use chat::ChatWidget;
pub use chat_client::{ChatBackend, ChatClient, ChatMessage, Role};
pub use config::{ClientConfig, PageConfig};
pub use coords::{parse_coordinates, Coordinate};
pub use location_client::{LocationClient, LocationInfo, LocationLookup, LookupError};
pub use log_client::{LogClient, LogQuery, LogSearch};
pub use logs::{LogFilters, LogSearchController};
pub use map::{MapController, MapState};
pub use markdown::{renderer_for, MarkdownRenderer};
pub use session::{FileSessionStore, SessionContext, SessionStore};
pub use transport::ApiTransport;
