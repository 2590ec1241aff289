//! The embeddable chat surface. It is driven only by a
//! [`StoreConfiguration`] and needs nothing from the admin side at runtime.
use crate::{
    conversation::Conversation,
    session::{Assistant, ChatSession},
    store::StoreConfiguration,
    AssistantError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetStatus {
    Ready,
    /// Chat is blocked until a language model is configured.
    NotConfigured(String),
}

pub struct ChatWidget {
    assistant: Option<Assistant>,
    session: Option<ChatSession>,
    status: WidgetStatus,
    store_name: String,
    conversation: Conversation,
}

impl ChatWidget {
    /// Opens the widget. A configuration error does not fail here; it puts
    /// the widget in [`WidgetStatus::NotConfigured`].
    pub fn open(
        assistant: Result<Assistant, AssistantError>,
        config: &StoreConfiguration,
    ) -> Self {
        let conversation = Conversation::with_welcome(&config.store_name);

        match assistant {
            Ok(assistant) => {
                let session = assistant.initialize(config);
                Self {
                    assistant: Some(assistant),
                    session: Some(session),
                    status: WidgetStatus::Ready,
                    store_name: config.store_name.clone(),
                    conversation,
                }
            }
            Err(error) => {
                tracing::warn!(error = %error, "chat widget opened without a language model");
                Self {
                    assistant: None,
                    session: None,
                    status: WidgetStatus::NotConfigured(error.to_string()),
                    store_name: config.store_name.clone(),
                    conversation,
                }
            }
        }
    }

    #[must_use]
    pub fn status(&self) -> &WidgetStatus {
        &self.status
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status == WidgetStatus::Ready
    }

    #[must_use]
    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    #[must_use]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Sends a message and records the whole reply. Returns the id of the
    /// model message, or `None` for blank input.
    pub async fn send(&mut self, text: &str) -> Result<Option<String>, AssistantError> {
        self.ensure_ready()?;
        let session = self.session.as_mut().ok_or_else(uninitialized)?;
        Ok(self.conversation.submit(session, text).await)
    }

    /// Sends a message and fills the reply into the log as it streams.
    pub async fn send_streaming(&mut self, text: &str) -> Result<Option<String>, AssistantError> {
        self.ensure_ready()?;
        let session = self.session.as_mut().ok_or_else(uninitialized)?;
        Ok(self.conversation.submit_streaming(session, text).await)
    }

    /// Rebinds the widget to an updated configuration. The session starts
    /// over; the visible log is kept.
    pub fn reload(&mut self, config: &StoreConfiguration) {
        self.store_name.clone_from(&config.store_name);
        if let Some(session) = &self.session {
            self.session = Some(session.reset_with(config));
        } else if let Some(assistant) = &self.assistant {
            self.session = Some(assistant.initialize(config));
        }
    }

    fn ensure_ready(&mut self) -> Result<(), AssistantError> {
        if let WidgetStatus::NotConfigured(reason) = &self.status {
            return Err(AssistantError::Configuration(reason.clone()));
        }
        let closed = self.conversation.finalize_abandoned();
        if closed > 0 {
            tracing::debug!(closed, "closed abandoned replies");
        }
        Ok(())
    }
}

fn uninitialized() -> AssistantError {
    AssistantError::Configuration("chat session is not initialized".to_string())
}

/// An `<iframe>` snippet that embeds the hosted widget in another page.
#[must_use]
pub fn iframe_embed_code(deploy_url: &str) -> String {
    format!(
        r#"<iframe
  src="{}/?mode=embed"
  width="100%"
  height="600px"
  style="position: fixed; bottom: 20px; right: 20px; border: none; z-index: 9999; width: 400px; height: 600px;"
></iframe>"#,
        deploy_url.trim_end_matches('/')
    )
}

/// A `<script>` loader snippet carrying the store name.
#[must_use]
pub fn script_embed_code(store_name: &str) -> String {
    let store_name = serde_json::to_string(store_name)
        .unwrap_or_else(|_| "\"\"".to_string())
        .replace("</", "<\\/");
    format!(
        r#"<!-- WooGenie Embed Code -->
<script>
  window.wooGenieConfig = {{
    storeName: {store_name},
    theme: "light"
  }};
</script>
<div id="woogenie-widget-root"></div>
<script src="https://cdn.woogenie.ai/latest/widget.bundle.js" defer></script>"#
    )
}
