// src/chat_client.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::SessionContext;
use crate::transport::ApiTransport;

pub const CHAT_ENDPOINT: &str = "/api/chat";
pub const CHAT_CLEAR_ENDPOINT: &str = "/api/chat/clear";

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Invalid chat response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// What the chat endpoint answered with.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatReply {
    Answer(String),
    Error(String),
    /// Neither `answer` nor `error` was present.
    Empty,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    session_id: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Serialize)]
struct ClearRequest<'a> {
    session_id: &'a str,
}

#[derive(Deserialize, Default)]
struct ChatResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn ask(
        &self,
        session: &SessionContext,
        messages: &[ChatMessage],
    ) -> Result<ChatReply, ChatError>;

    /// Drop the server-side history of the session.
    async fn clear(&self, session: &SessionContext) -> Result<(), ChatError>;
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    transport: ApiTransport,
}

impl ChatClient {
    pub fn new(transport: ApiTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn ask(
        &self,
        session: &SessionContext,
        messages: &[ChatMessage],
    ) -> Result<ChatReply, ChatError> {
        tracing::info!(session_id = %session.id(), messages = messages.len(), "💬 Sending chat message");

        let request = self.transport.post(CHAT_ENDPOINT).json(&ChatRequest {
            session_id: session.id(),
            messages,
        });
        let response = self.transport.send(request).await?;
        // The body carries `error` on failures too, so the status is not checked.
        let text = response.text().await?;
        let body: ChatResponse = serde_json::from_str(&text)?;

        let reply = match (body.answer, body.error) {
            (Some(answer), _) if !answer.is_empty() => ChatReply::Answer(answer),
            (_, Some(error)) if !error.is_empty() => ChatReply::Error(error),
            _ => ChatReply::Empty,
        };
        Ok(reply)
    }

    async fn clear(&self, session: &SessionContext) -> Result<(), ChatError> {
        let request = self.transport.post(CHAT_CLEAR_ENDPOINT).json(&ClearRequest {
            session_id: session.id(),
        });
        self.transport.send(request).await?;
        tracing::info!(session_id = %session.id(), "🧹 Chat history cleared on server");
        Ok(())
    }
}
