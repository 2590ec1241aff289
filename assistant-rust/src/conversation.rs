//! The visible chat log and the rules for filling a streamed reply into it.
use crate::session::ChatSession;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStream, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, fmt::Display};

pub const WELCOME_MESSAGE_ID: &str = "welcome";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    /// Grows while streaming, fixed once `is_streaming` is false.
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub is_streaming: bool,
}

impl ChatMessage {
    fn new(id: String, role: Role, text: String, is_streaming: bool) -> Self {
        Self {
            id,
            role,
            text,
            timestamp: Utc::now(),
            is_streaming,
        }
    }

    /// The greeting shown before the customer says anything.
    #[must_use]
    pub fn welcome(store_name: &str) -> Self {
        Self::new(
            WELCOME_MESSAGE_ID.to_string(),
            Role::Model,
            format!("Hello! Welcome to {store_name}. How can I help you today?"),
            false,
        )
    }
}

/// An append-only chat log.
///
/// Mutations of a model message are addressed by id and refused once the
/// message is finalized, so a result arriving after its turn was closed is
/// dropped instead of corrupting the log.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    next_id: u64,
}

impl Conversation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_welcome(store_name: &str) -> Self {
        Self {
            messages: vec![ChatMessage::welcome(store_name)],
            next_id: 0,
        }
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ChatMessage> {
        self.messages.iter().find(|message| message.id == id)
    }

    #[must_use]
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Whether a model reply is still being received.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.messages.iter().any(|message| message.is_streaming)
    }

    pub fn push_user(&mut self, text: impl Into<String>) -> String {
        self.push(Role::User, text.into(), false)
    }

    /// Appends a finalized model message.
    pub fn push_model(&mut self, text: impl Into<String>) -> String {
        self.push(Role::Model, text.into(), false)
    }

    /// Appends an empty model message that is still receiving fragments.
    pub fn push_model_placeholder(&mut self) -> String {
        self.push(Role::Model, String::new(), true)
    }

    pub fn append_fragment(&mut self, id: &str, fragment: &str) -> bool {
        match self.streaming_message(id) {
            Some(message) => {
                message.text.push_str(fragment);
                true
            }
            None => false,
        }
    }

    pub fn finish_streaming(&mut self, id: &str) -> bool {
        match self.streaming_message(id) {
            Some(message) => {
                message.is_streaming = false;
                true
            }
            None => false,
        }
    }

    /// Keeps the partial text, appends an interruption note and finalizes
    /// the message.
    pub fn fail_streaming(&mut self, id: &str, error: &dyn Display) -> bool {
        let Some(message) = self.streaming_message(id) else {
            return false;
        };
        if !message.text.is_empty() {
            message.text.push_str("\n\n");
        }
        message.text.push_str(&format!("[Response interrupted: {error}]"));
        message.is_streaming = false;
        true
    }

    /// Finalizes model messages left streaming by a turn whose caller stopped
    /// waiting for it. Returns how many were closed.
    pub fn finalize_abandoned(&mut self) -> usize {
        let mut closed = 0;
        for message in self.messages.iter_mut().filter(|m| m.is_streaming) {
            if !message.text.is_empty() {
                message.text.push_str("\n\n");
            }
            message.text.push_str("[Response interrupted: reply abandoned]");
            message.is_streaming = false;
            closed += 1;
        }
        closed
    }

    /// Fills the streaming message `id` from `fragments` until the stream
    /// ends or fails. Stops early, leaving the rest unread, if the message is
    /// no longer streaming.
    pub async fn consume_reply<S>(&mut self, id: &str, fragments: S)
    where
        S: TryStream<Ok = String>,
        S::Error: Display,
    {
        let mut fragments = std::pin::pin!(fragments.into_stream());

        loop {
            match fragments.try_next().await {
                Ok(Some(fragment)) => {
                    if !self.append_fragment(id, &fragment) {
                        tracing::debug!(id, "dropping fragment for finalized message");
                        return;
                    }
                }
                Ok(None) => {
                    self.finish_streaming(id);
                    return;
                }
                Err(error) => {
                    tracing::warn!(id, error = %error, "reply stream interrupted");
                    self.fail_streaming(id, &error);
                    return;
                }
            }
        }
    }

    /// Sends `text` and records both turns. Blank input is ignored and
    /// returns `None`; otherwise returns the id of the model message.
    pub async fn submit(&mut self, session: &mut ChatSession, text: &str) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }
        self.push_user(text);
        let reply = session.send(text).await;
        Some(self.push_model(reply))
    }

    /// Like [`Conversation::submit`] but fills the model message fragment by
    /// fragment.
    pub async fn submit_streaming(
        &mut self,
        session: &mut ChatSession,
        text: &str,
    ) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }
        self.push_user(text);
        let id = self.push_model_placeholder();
        let fragments = session.send_stream(text).map(Ok::<_, Infallible>);
        self.consume_reply(&id, fragments).await;
        Some(id)
    }

    fn push(&mut self, role: Role, text: String, is_streaming: bool) -> String {
        self.next_id += 1;
        let id = format!("msg-{}", self.next_id);
        self.messages
            .push(ChatMessage::new(id.clone(), role, text, is_streaming));
        id
    }

    fn streaming_message(&mut self, id: &str) -> Option<&mut ChatMessage> {
        self.messages
            .iter_mut()
            .find(|message| message.id == id && message.is_streaming)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[test]
    fn starts_with_welcome_message() {
        let conversation = Conversation::with_welcome("Tea House");

        let welcome = &conversation.messages()[0];
        assert_eq!(welcome.id, WELCOME_MESSAGE_ID);
        assert_eq!(welcome.role, Role::Model);
        assert_eq!(welcome.text, "Hello! Welcome to Tea House. How can I help you today?");
        assert!(!welcome.is_streaming);
    }

    #[test]
    fn ids_are_monotonic() {
        let mut conversation = Conversation::new();

        assert_eq!(conversation.push_user("a"), "msg-1");
        assert_eq!(conversation.push_model("b"), "msg-2");
        assert_eq!(conversation.push_model_placeholder(), "msg-3");
    }

    #[test]
    fn finalized_messages_reject_mutation() {
        let mut conversation = Conversation::new();
        let id = conversation.push_model_placeholder();

        assert!(conversation.append_fragment(&id, "Hi"));
        assert!(conversation.finish_streaming(&id));
        assert!(!conversation.append_fragment(&id, " there"));
        assert!(!conversation.finish_streaming(&id));
        assert!(!conversation.append_fragment("msg-99", "?"));
        assert_eq!(conversation.get(&id).map(|m| m.text.as_str()), Some("Hi"));
    }

    #[tokio::test]
    async fn consume_reply_appends_then_finishes() {
        let mut conversation = Conversation::new();
        let id = conversation.push_model_placeholder();

        let fragments = stream::iter(["Free ", "shipping."].map(|f| Ok::<_, Infallible>(f.to_string())));
        conversation.consume_reply(&id, fragments).await;

        let message = conversation.get(&id).unwrap();
        assert_eq!(message.text, "Free shipping.");
        assert!(!message.is_streaming);
        assert!(!conversation.is_streaming());
    }

    #[tokio::test]
    async fn consume_reply_keeps_partial_text_on_error() {
        let mut conversation = Conversation::new();
        let id = conversation.push_model_placeholder();

        let fragments = stream::iter(vec![
            Ok("The lamp ".to_string()),
            Err("connection reset"),
            Ok("never seen".to_string()),
        ]);
        conversation.consume_reply(&id, fragments).await;

        let message = conversation.get(&id).unwrap();
        assert_eq!(message.text, "The lamp \n\n[Response interrupted: connection reset]");
        assert!(!message.is_streaming);
    }

    #[tokio::test]
    async fn consume_reply_ignores_finalized_target() {
        let mut conversation = Conversation::new();
        let id = conversation.push_model_placeholder();
        conversation.finish_streaming(&id);

        let fragments = stream::iter(vec![Ok::<_, Infallible>("late".to_string())]);
        conversation.consume_reply(&id, fragments).await;

        assert_eq!(conversation.get(&id).unwrap().text, "");
    }

    #[test]
    fn finalizes_abandoned_placeholders() {
        let mut conversation = Conversation::new();
        let id = conversation.push_model_placeholder();
        conversation.append_fragment(&id, "Half an");

        assert_eq!(conversation.finalize_abandoned(), 1);
        assert_eq!(
            conversation.get(&id).unwrap().text,
            "Half an\n\n[Response interrupted: reply abandoned]"
        );
        assert_eq!(conversation.finalize_abandoned(), 0);
    }

    #[test]
    fn message_serializes_camel_case() {
        let message = ChatMessage::welcome("Tea House");
        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(value["role"], "model");
        assert_eq!(value["isStreaming"], false);
    }
}
