use crate::{
    AssistantMessage, Message, ModelResponse, ModelUsage, Part, PartDelta, TextPart,
    TextPartDelta, UserMessage,
};

impl TextPart {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl From<&str> for TextPart {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TextPart {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextPart::new(text))
    }

    #[must_use]
    pub fn as_text(&self) -> &str {
        match self {
            Self::Text(text_part) => &text_part.text,
        }
    }
}

impl From<TextPart> for Part {
    fn from(value: TextPart) -> Self {
        Self::Text(value)
    }
}

impl PartDelta {
    #[must_use]
    pub fn as_text(&self) -> &str {
        match self {
            Self::Text(delta) => &delta.text,
        }
    }
}

impl From<TextPartDelta> for PartDelta {
    fn from(value: TextPartDelta) -> Self {
        Self::Text(value)
    }
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self::User(UserMessage {
            content: vec![Part::text(text)],
        })
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::Assistant(AssistantMessage {
            content: vec![Part::text(text)],
        })
    }

    /// The concatenated text of every part of the message.
    #[must_use]
    pub fn text(&self) -> String {
        let content = match self {
            Self::User(message) => &message.content,
            Self::Assistant(message) => &message.content,
        };
        concat_parts(content)
    }
}

impl ModelResponse {
    /// The concatenated text of the reply, in part order.
    #[must_use]
    pub fn text(&self) -> String {
        concat_parts(&self.content)
    }
}

impl ModelUsage {
    pub fn add(&mut self, other: &Self) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

fn concat_parts(parts: &[Part]) -> String {
    parts.iter().map(Part::as_text).collect()
}
