use std::{collections::VecDeque, sync::Mutex};

use futures::stream;

use crate::{
    errors::{LanguageModelError, LanguageModelResult},
    language_model::{LanguageModel, LanguageModelStream},
    ContentDelta, LanguageModelInput, ModelResponse, PartDelta, PartialModelResponse,
    TextPartDelta,
};

/// Result for a mocked `generate` call.
/// It can either be a full response or an error to return.
pub enum MockGenerateResult {
    Response(ModelResponse),
    Error(LanguageModelError),
}

impl MockGenerateResult {
    pub fn response(response: ModelResponse) -> Self {
        Self::Response(response)
    }

    /// A response made of a single text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Response(ModelResponse {
            content: vec![crate::Part::text(text)],
            usage: None,
        })
    }

    pub fn error(error: LanguageModelError) -> Self {
        Self::Error(error)
    }
}

impl From<ModelResponse> for MockGenerateResult {
    fn from(response: ModelResponse) -> Self {
        Self::response(response)
    }
}

impl From<LanguageModelResult<ModelResponse>> for MockGenerateResult {
    fn from(result: LanguageModelResult<ModelResponse>) -> Self {
        match result {
            Ok(response) => Self::Response(response),
            Err(error) => Self::Error(error),
        }
    }
}

/// Result for a mocked `stream` call.
pub enum MockStreamResult {
    /// The stream yields every partial then ends.
    Partials(Vec<PartialModelResponse>),
    /// Opening the stream fails.
    Error(LanguageModelError),
    /// The stream yields the partials, then fails with the error.
    Interrupted(Vec<PartialModelResponse>, LanguageModelError),
}

impl MockStreamResult {
    pub fn partials(partials: Vec<PartialModelResponse>) -> Self {
        Self::Partials(partials)
    }

    /// A stream yielding one text delta per fragment.
    pub fn fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Partials(fragments.into_iter().map(text_partial).collect())
    }

    pub fn error(error: LanguageModelError) -> Self {
        Self::Error(error)
    }

    /// A stream yielding one text delta per fragment before failing.
    pub fn interrupted<I, S>(fragments: I, error: LanguageModelError) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Interrupted(fragments.into_iter().map(text_partial).collect(), error)
    }
}

impl From<Vec<PartialModelResponse>> for MockStreamResult {
    fn from(partials: Vec<PartialModelResponse>) -> Self {
        Self::partials(partials)
    }
}

impl From<LanguageModelResult<Vec<PartialModelResponse>>> for MockStreamResult {
    fn from(result: LanguageModelResult<Vec<PartialModelResponse>>) -> Self {
        match result {
            Ok(partials) => Self::Partials(partials),
            Err(error) => Self::Error(error),
        }
    }
}

/// A text delta at index 0.
pub fn text_partial(text: impl Into<String>) -> PartialModelResponse {
    PartialModelResponse {
        delta: Some(ContentDelta {
            index: 0,
            part: PartDelta::Text(TextPartDelta { text: text.into() }),
        }),
        usage: None,
    }
}

#[derive(Default)]
struct MockLanguageModelState {
    mocked_generate_results: VecDeque<MockGenerateResult>,
    mocked_stream_results: VecDeque<MockStreamResult>,
    tracked_generate_inputs: Vec<LanguageModelInput>,
    tracked_stream_inputs: Vec<LanguageModelInput>,
}

impl MockLanguageModelState {
    fn reset(&mut self) {
        self.tracked_generate_inputs.clear();
        self.tracked_stream_inputs.clear();
    }

    fn restore(&mut self) {
        self.mocked_generate_results.clear();
        self.mocked_stream_results.clear();
        self.reset();
    }
}

/// A mock language model for testing that tracks inputs and yields predefined
/// outputs in FIFO order.
pub struct MockLanguageModel {
    provider: &'static str,
    model_id: String,
    state: Mutex<MockLanguageModelState>,
}

impl Default for MockLanguageModel {
    fn default() -> Self {
        Self {
            provider: "mock",
            model_id: "mock-model".to_string(),
            state: Mutex::new(MockLanguageModelState::default()),
        }
    }
}

impl MockLanguageModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_model_id<S: Into<String>>(&mut self, model_id: S) {
        self.model_id = model_id.into();
    }

    /// Enqueue a mocked generate result.
    pub fn enqueue_generate<R>(&self, result: R) -> &Self
    where
        R: Into<MockGenerateResult>,
    {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.mocked_generate_results.push_back(result.into());
        drop(state);
        self
    }

    /// Enqueue a mocked stream result.
    pub fn enqueue_stream<R>(&self, result: R) -> &Self
    where
        R: Into<MockStreamResult>,
    {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.mocked_stream_results.push_back(result.into());
        drop(state);
        self
    }

    /// Retrieve the tracked generate inputs accumulated so far.
    pub fn tracked_generate_inputs(&self) -> Vec<LanguageModelInput> {
        let state = self.state.lock().expect("mock state poisoned");
        state.tracked_generate_inputs.clone()
    }

    /// Retrieve the tracked stream inputs accumulated so far.
    pub fn tracked_stream_inputs(&self) -> Vec<LanguageModelInput> {
        let state = self.state.lock().expect("mock state poisoned");
        state.tracked_stream_inputs.clone()
    }

    /// Reset tracked inputs without touching enqueued results.
    pub fn reset(&self) {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.reset();
    }

    /// Clear both tracked inputs and enqueued results.
    pub fn restore(&self) {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.restore();
    }
}

#[async_trait::async_trait]
impl LanguageModel for MockLanguageModel {
    fn provider(&self) -> &'static str {
        self.provider
    }

    fn model_id(&self) -> String {
        self.model_id.clone()
    }

    async fn generate(&self, input: LanguageModelInput) -> LanguageModelResult<ModelResponse> {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.tracked_generate_inputs.push(input);

        let result = state.mocked_generate_results.pop_front().ok_or_else(|| {
            LanguageModelError::Invariant(
                self.provider,
                "no mocked generate results available".into(),
            )
        })?;

        match result {
            MockGenerateResult::Response(response) => Ok(response),
            MockGenerateResult::Error(error) => Err(error),
        }
    }

    async fn stream(&self, input: LanguageModelInput) -> LanguageModelResult<LanguageModelStream> {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.tracked_stream_inputs.push(input);

        let result = state.mocked_stream_results.pop_front().ok_or_else(|| {
            LanguageModelError::Invariant(self.provider, "no mocked stream results available".into())
        })?;

        match result {
            MockStreamResult::Error(error) => Err(error),
            MockStreamResult::Partials(partials) => Ok(LanguageModelStream::from_stream(
                stream::iter(partials.into_iter().map(Ok)),
            )),
            MockStreamResult::Interrupted(partials, error) => {
                let items = partials
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(error)));
                Ok(LanguageModelStream::from_stream(stream::iter(items)))
            }
        }
    }
}
