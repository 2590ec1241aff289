use crate::{
    instruction::ContextCompiler, settings::AssistantSettings, store::StoreConfiguration,
    AssistantError,
};
use futures::{stream::StreamExt, Stream};
use genie_sdk::{
    google::{GeminiModel, GeminiModelOptions},
    LanguageModel, LanguageModelInput, Message, StreamAccumulator,
};
use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

/// Reply used when the language model cannot be reached or fails mid-reply.
pub const CONNECTION_FALLBACK: &str =
    "I'm having trouble connecting to the store's brain right now. Please try again later.";
/// Reply used when the language model answers with no text.
pub const EMPTY_REPLY_FALLBACK: &str = "I'm sorry, I couldn't generate a response.";

/// Sampling parameters applied to every turn.
/// # Default Values
/// - `temperature`: `Some(0.4)`
/// - `max_output_tokens`: `None`
#[derive(Debug, Clone, PartialEq)]
pub struct SessionParams {
    /// Amount of randomness injected into the response. Ranges from 0.0 to 1.0
    pub temperature: Option<f64>,
    /// Upper bound on the length of one reply, in tokens.
    pub max_output_tokens: Option<u32>,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            temperature: Some(crate::settings::DEFAULT_TEMPERATURE),
            max_output_tokens: None,
        }
    }
}

/// A configured shopping assistant. Creating one proves a language model is
/// available; each [`ChatSession`] it initializes is an independent
/// conversation.
pub struct Assistant {
    model: Arc<dyn LanguageModel + Send + Sync>,
    compiler: ContextCompiler,
    params: SessionParams,
}

impl Assistant {
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel + Send + Sync>) -> Self {
        Self {
            model,
            compiler: ContextCompiler::default(),
            params: SessionParams::default(),
        }
    }

    /// Builds a Gemini-backed assistant. Fails with
    /// [`AssistantError::Configuration`] when no API key is set.
    pub fn from_settings(settings: &AssistantSettings) -> Result<Self, AssistantError> {
        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                AssistantError::Configuration(
                    "no API key found in GEMINI_API_KEY, GOOGLE_API_KEY or API_KEY".to_string(),
                )
            })?;

        let model = GeminiModel::new(
            settings.model_id.clone(),
            GeminiModelOptions {
                api_key: api_key.to_string(),
                base_url: settings.base_url.clone(),
                ..Default::default()
            },
        );

        Ok(Self::new(Arc::new(model)).params(SessionParams {
            temperature: Some(settings.temperature),
            max_output_tokens: settings.max_output_tokens,
        }))
    }

    #[must_use]
    pub fn compiler(mut self, compiler: ContextCompiler) -> Self {
        self.compiler = compiler;
        self
    }

    #[must_use]
    pub fn params(mut self, params: SessionParams) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn model_id(&self) -> String {
        self.model.model_id()
    }

    /// Compiles the configuration and starts a session grounded on it.
    #[must_use]
    pub fn initialize(&self, config: &StoreConfiguration) -> ChatSession {
        self.initialize_with_instruction(self.compiler.compile(config))
    }

    #[must_use]
    pub fn initialize_with_instruction(&self, instruction: impl Into<String>) -> ChatSession {
        ChatSession::new(
            self.model.clone(),
            self.compiler.clone(),
            self.params.clone(),
            instruction.into(),
        )
    }
}

/// One conversation bound to a fixed grounding instruction.
///
/// Turns take `&mut self`, so a session never has two turns in flight. A turn
/// enters the session memory only once the model has answered completely.
pub struct ChatSession {
    model: Arc<dyn LanguageModel + Send + Sync>,
    compiler: ContextCompiler,
    params: SessionParams,
    instruction: String,
    history: Vec<Message>,
}

impl ChatSession {
    fn new(
        model: Arc<dyn LanguageModel + Send + Sync>,
        compiler: ContextCompiler,
        params: SessionParams,
        instruction: String,
    ) -> Self {
        tracing::info!(
            provider = model.provider(),
            model_id = %model.model_id(),
            instruction_len = instruction.len(),
            "chat session initialized"
        );
        Self {
            model,
            compiler,
            params,
            instruction,
            history: Vec::new(),
        }
    }

    #[must_use]
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// Completed turns, oldest first.
    #[must_use]
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Sends a message and waits for the whole reply. Failures come back as
    /// fallback text.
    pub async fn send(&mut self, text: impl Into<String>) -> String {
        let text = text.into();
        let input = self.turn_input(&text);

        match self.model.generate(input).await {
            Ok(response) => {
                let reply = response.text();
                if reply.trim().is_empty() {
                    tracing::warn!("language model returned an empty reply");
                    return EMPTY_REPLY_FALLBACK.to_string();
                }
                self.commit(text, reply.clone());
                reply
            }
            Err(error) => {
                tracing::error!(error = %error, "language model call failed");
                CONNECTION_FALLBACK.to_string()
            }
        }
    }

    /// Sends a message and yields the reply as it is generated.
    ///
    /// The fragments concatenate to the full reply. A failure, before or
    /// during the reply, ends the stream with a fallback fragment. Dropping
    /// the stream early abandons the turn.
    pub fn send_stream(&mut self, text: impl Into<String>) -> ReplyStream<'_> {
        let text = text.into();
        let session = self;

        ReplyStream::from_stream(async_stream::stream! {
            let input = session.turn_input(&text);

            let mut model_stream = match session.model.stream(input).await {
                Ok(model_stream) => model_stream,
                Err(error) => {
                    tracing::error!(error = %error, "language model stream failed to start");
                    yield CONNECTION_FALLBACK.to_string();
                    return;
                }
            };

            let mut accumulator = StreamAccumulator::new();
            while let Some(partial) = model_stream.next().await {
                match partial {
                    Ok(partial) => {
                        accumulator.add_partial(&partial);
                        if let Some(delta) = &partial.delta {
                            let fragment = delta.part.as_text();
                            if !fragment.is_empty() {
                                yield fragment.to_string();
                            }
                        }
                    }
                    Err(error) => {
                        tracing::error!(error = %error, "language model stream failed");
                        if accumulator.is_empty() {
                            yield CONNECTION_FALLBACK.to_string();
                        } else {
                            yield format!("\n\n{CONNECTION_FALLBACK}");
                        }
                        return;
                    }
                }
            }

            let reply = accumulator.compute_response().text();
            if reply.trim().is_empty() {
                tracing::warn!("language model streamed an empty reply");
                yield EMPTY_REPLY_FALLBACK.to_string();
                return;
            }
            session.commit(text, reply);
        })
    }

    /// Starts a fresh session on a new instruction with the same model.
    #[must_use]
    pub fn reset(&self, instruction: impl Into<String>) -> Self {
        Self::new(
            self.model.clone(),
            self.compiler.clone(),
            self.params.clone(),
            instruction.into(),
        )
    }

    /// Starts a fresh session grounded on a recompiled configuration.
    #[must_use]
    pub fn reset_with(&self, config: &StoreConfiguration) -> Self {
        self.reset(self.compiler.compile(config))
    }

    fn turn_input(&self, text: &str) -> LanguageModelInput {
        let mut messages = self.history.clone();
        messages.push(Message::user(text));

        LanguageModelInput {
            system_prompt: Some(self.instruction.clone()),
            messages,
            temperature: self.params.temperature,
            max_tokens: self.params.max_output_tokens,
            ..Default::default()
        }
    }

    fn commit(&mut self, user_text: String, reply: String) {
        self.history.push(Message::user(user_text));
        self.history.push(Message::assistant(reply));
        tracing::debug!(turns = self.history.len() / 2, "turn committed");
    }
}

/// Fragments of one streamed reply. Finite and not restartable.
pub struct ReplyStream<'a>(Pin<Box<dyn Stream<Item = String> + Send + 'a>>);

impl<'a> ReplyStream<'a> {
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = String> + Send + 'a,
    {
        Self(Box::pin(stream))
    }

    /// Drains the stream into the full reply text.
    pub async fn collect_text(self) -> String {
        self.collect::<String>().await
    }
}

impl Stream for ReplyStream<'_> {
    type Item = String;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.0.as_mut().poll_next(cx)
    }
}
