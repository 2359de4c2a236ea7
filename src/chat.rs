// src/chat.rs
use std::sync::Arc;

use crate::chat_client::{ChatBackend, ChatMessage, ChatReply, Role};
use crate::coords::parse_coordinates;
use crate::html::html_escape;
use crate::location_client::{LocationLookup, LookupError};
use crate::markdown::MarkdownRenderer;
use crate::session::SessionContext;

pub const NETWORK_UNAVAILABLE: &str = "Network unavailable";

/// One bubble in the visible transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    pub message: ChatMessage,
    /// Assistant bubbles are sanitized Markdown; user bubbles, and assistant
    /// bubbles without a sanitizing renderer, are escaped text.
    pub html: String,
}

/// Chat widget state: the transcript plus the collaborators a send needs.
pub struct ChatWidget {
    session: SessionContext,
    backend: Arc<dyn ChatBackend>,
    lookup: Arc<dyn LocationLookup>,
    renderer: Arc<dyn MarkdownRenderer>,
    transcript: Vec<TranscriptEntry>,
}

impl ChatWidget {
    pub fn new(
        session: SessionContext,
        backend: Arc<dyn ChatBackend>,
        lookup: Arc<dyn LocationLookup>,
        renderer: Arc<dyn MarkdownRenderer>,
    ) -> Self {
        Self {
            session,
            backend,
            lookup,
            renderer,
            transcript: Vec::new(),
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    fn push(&mut self, message: ChatMessage) {
        let html = match message.role {
            Role::Assistant if self.renderer.is_sanitizing() => {
                self.renderer.to_safe_html(&message.content)
            }
            Role::Assistant | Role::User => html_escape(&message.content),
        };
        self.transcript.push(TranscriptEntry { message, html });
    }

    /// Send one user message. Coordinates go to the location lookup instead
    /// of the chat endpoint. Every failure ends up as an assistant bubble.
    pub async fn send(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.push(ChatMessage::user(text));

        if let Some(at) = parse_coordinates(text) {
            tracing::info!(latitude = at.latitude, longitude = at.longitude, "Chat message recognized as coordinates");
            let reply = match self.lookup.lookup(at).await {
                Ok(info) => format!(
                    "Address (OSM):\n{}\n\nDescription:\n{}",
                    info.address_or_placeholder(),
                    info.description_or_placeholder()
                ),
                Err(LookupError::Rejected(message)) => format!("Error: {}", message),
                Err(LookupError::Network(e)) => {
                    tracing::error!("Location lookup from chat failed: {}", e);
                    NETWORK_UNAVAILABLE.to_string()
                }
            };
            self.push(ChatMessage::assistant(reply));
            return;
        }

        let outgoing = [ChatMessage::user(text)];
        match self.backend.ask(&self.session, &outgoing).await {
            Ok(ChatReply::Answer(answer)) => self.push(ChatMessage::assistant(answer)),
            Ok(ChatReply::Error(error)) => self.push(ChatMessage::assistant(format!("Error: {}", error))),
            Ok(ChatReply::Empty) => {
                tracing::warn!(session_id = %self.session.id(), "Chat reply had neither answer nor error");
            }
            Err(e) => {
                tracing::error!(session_id = %self.session.id(), "Chat request failed: {}", e);
                self.push(ChatMessage::assistant(NETWORK_UNAVAILABLE));
            }
        }
    }

    /// Empty the transcript, then ask the backend to forget the session.
    /// A failed backend call leaves the transcript cleared.
    pub async fn clear(&mut self) {
        self.transcript.clear();
        if let Err(e) = self.backend.clear(&self.session).await {
            tracing::warn!(session_id = %self.session.id(), "Failed to clear server chat history: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat_client::ChatError;
    use crate::coords::Coordinate;
    use crate::location_client::LocationInfo;
    use crate::markdown::{CommonMarkRenderer, PlainRenderer};
    use crate::session::MemorySessionStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeChat {
        reply: Option<ChatReply>,
        fail_clear: bool,
        asked: Mutex<Vec<(String, Vec<ChatMessage>)>>,
        cleared: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatBackend for FakeChat {
        async fn ask(
            &self,
            session: &SessionContext,
            messages: &[ChatMessage],
        ) -> Result<ChatReply, ChatError> {
            self.asked
                .lock()
                .unwrap()
                .push((session.id().to_string(), messages.to_vec()));
            match &self.reply {
                Some(reply) => Ok(reply.clone()),
                None => Err(ChatError::Decode(
                    serde_json::from_str::<serde_json::Value>("not json").unwrap_err(),
                )),
            }
        }

        async fn clear(&self, session: &SessionContext) -> Result<(), ChatError> {
            self.cleared.lock().unwrap().push(session.id().to_string());
            if self.fail_clear {
                return Err(ChatError::Decode(
                    serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
                ));
            }
            Ok(())
        }
    }

    struct FakeLookup {
        result: Result<LocationInfo, LookupError>,
        calls: Mutex<Vec<Coordinate>>,
    }

    impl FakeLookup {
        fn new(result: Result<LocationInfo, LookupError>) -> Self {
            Self {
                result,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LocationLookup for FakeLookup {
        async fn lookup(&self, at: Coordinate) -> Result<LocationInfo, LookupError> {
            self.calls.lock().unwrap().push(at);
            self.result.clone()
        }
    }

    fn widget(chat: Arc<FakeChat>, lookup: Arc<FakeLookup>) -> ChatWidget {
        let session = SessionContext::establish(&MemorySessionStore::new()).unwrap();
        ChatWidget::new(session, chat, lookup, Arc::new(CommonMarkRenderer::new()))
    }

    fn contents(widget: &ChatWidget) -> Vec<(Role, String)> {
        widget
            .transcript()
            .iter()
            .map(|e| (e.message.role, e.message.content.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_answer_is_appended_after_user_message() {
        let chat = Arc::new(FakeChat {
            reply: Some(ChatReply::Answer("**Sochi** is warm".to_string())),
            ..Default::default()
        });
        let mut w = widget(chat.clone(), Arc::new(FakeLookup::new(Ok(LocationInfo::default()))));

        w.send("  Where is it warm?  ").await;

        assert_eq!(
            contents(&w),
            vec![
                (Role::User, "Where is it warm?".to_string()),
                (Role::Assistant, "**Sochi** is warm".to_string()),
            ]
        );
        assert!(w.transcript()[1].html.contains("<strong>Sochi</strong>"));
        let asked = chat.asked.lock().unwrap();
        assert_eq!(asked[0].1, vec![ChatMessage::user("Where is it warm?")]);
    }

    #[tokio::test]
    async fn test_user_text_is_escaped_not_rendered() {
        let chat = Arc::new(FakeChat {
            reply: Some(ChatReply::Answer("ok".to_string())),
            ..Default::default()
        });
        let mut w = widget(chat, Arc::new(FakeLookup::new(Ok(LocationInfo::default()))));

        w.send("<b>**hi**</b>").await;

        assert_eq!(w.transcript()[0].html, "&lt;b&gt;**hi**&lt;/b&gt;");
    }

    #[tokio::test]
    async fn test_empty_text_is_ignored() {
        let chat = Arc::new(FakeChat::default());
        let mut w = widget(chat.clone(), Arc::new(FakeLookup::new(Ok(LocationInfo::default()))));

        w.send("   ").await;

        assert!(w.transcript().is_empty());
        assert!(chat.asked.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_coordinates_skip_chat_endpoint() {
        let chat = Arc::new(FakeChat::default());
        let lookup = Arc::new(FakeLookup::new(Ok(LocationInfo {
            address: Some("Vladimir Oblast".to_string()),
            description: None,
        })));
        let mut w = widget(chat.clone(), lookup.clone());

        w.send("56.126917, 40.397011").await;

        assert!(chat.asked.lock().unwrap().is_empty());
        assert_eq!(
            lookup.calls.lock().unwrap().as_slice(),
            &[Coordinate::new(56.126917, 40.397011)]
        );
        assert_eq!(
            w.transcript()[1].message.content,
            "Address (OSM):\nVladimir Oblast\n\nDescription:\nDescription not received"
        );
    }

    #[tokio::test]
    async fn test_lookup_rejection_is_shown() {
        let chat = Arc::new(FakeChat::default());
        let lookup = Arc::new(FakeLookup::new(Err(LookupError::Rejected(
            "Geocoder not configured".to_string(),
        ))));
        let mut w = widget(chat, lookup);

        w.send("10.5 S, 20.25 W").await;

        assert_eq!(
            contents(&w)[1],
            (Role::Assistant, "Error: Geocoder not configured".to_string())
        );
    }

    #[tokio::test]
    async fn test_server_error_and_network_failure() {
        let chat = Arc::new(FakeChat {
            reply: Some(ChatReply::Error("Internal server error".to_string())),
            ..Default::default()
        });
        let mut w = widget(chat, Arc::new(FakeLookup::new(Ok(LocationInfo::default()))));
        w.send("hello").await;
        assert_eq!(contents(&w)[1].1, "Error: Internal server error");

        let broken = Arc::new(FakeChat::default());
        let mut w = widget(broken, Arc::new(FakeLookup::new(Ok(LocationInfo::default()))));
        w.send("hello").await;
        assert_eq!(contents(&w)[1].1, NETWORK_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_empty_reply_appends_nothing() {
        let chat = Arc::new(FakeChat {
            reply: Some(ChatReply::Empty),
            ..Default::default()
        });
        let mut w = widget(chat, Arc::new(FakeLookup::new(Ok(LocationInfo::default()))));

        w.send("hello").await;

        assert_eq!(w.transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_session_id_is_stable_across_sends() {
        let chat = Arc::new(FakeChat {
            reply: Some(ChatReply::Answer("ok".to_string())),
            ..Default::default()
        });
        let mut w = widget(chat.clone(), Arc::new(FakeLookup::new(Ok(LocationInfo::default()))));

        w.send("first").await;
        w.send("second").await;

        let asked = chat.asked.lock().unwrap();
        assert_eq!(asked.len(), 2);
        assert_eq!(asked[0].0, asked[1].0);
        assert_eq!(asked[0].0, w.session().id());
    }

    #[tokio::test]
    async fn test_clear_empties_transcript_even_when_backend_fails() {
        let chat = Arc::new(FakeChat {
            reply: Some(ChatReply::Answer("ok".to_string())),
            fail_clear: true,
            ..Default::default()
        });
        let mut w = widget(chat.clone(), Arc::new(FakeLookup::new(Ok(LocationInfo::default()))));
        w.send("hello").await;
        assert_eq!(w.transcript().len(), 2);

        w.clear().await;

        assert!(w.transcript().is_empty());
        assert_eq!(chat.cleared.lock().unwrap().as_slice(), &[w.session().id().to_string()]);
    }

    #[tokio::test]
    async fn test_answer_is_escaped_without_sanitizing_renderer() {
        let chat = Arc::new(FakeChat {
            reply: Some(ChatReply::Answer("<img src=x onerror=alert(1)> **hi**".to_string())),
            ..Default::default()
        });
        let lookup = Arc::new(FakeLookup::new(Ok(LocationInfo::default())));
        let session = SessionContext::establish(&MemorySessionStore::new()).unwrap();
        for renderer in [
            Arc::new(PlainRenderer) as Arc<dyn MarkdownRenderer>,
            Arc::new(CommonMarkRenderer::unsanitized()),
        ] {
            let mut w = ChatWidget::new(session.clone(), chat.clone(), lookup.clone(), renderer);

            w.send("hello").await;

            let reply = &w.transcript()[1];
            assert_eq!(reply.message.role, Role::Assistant);
            assert!(!reply.html.contains("<img"));
            assert_eq!(reply.html, "&lt;img src=x onerror=alert(1)&gt; **hi**");
        }
    }
}
