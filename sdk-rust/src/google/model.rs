use super::api::{
    Candidate, Content, GenerateContentConfig, GenerateContentParameters,
    GenerateContentResponse, Part as GeminiPart, UsageMetadata,
};
use crate::{
    client_utils, telemetry, ContentDelta, LanguageModel, LanguageModelError, LanguageModelInput,
    LanguageModelResult, LanguageModelStream, Message, ModelResponse, ModelUsage, Part, PartDelta,
    PartialModelResponse, TextPartDelta,
};
use async_stream::try_stream;
use futures::StreamExt;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client,
};
use std::collections::HashMap;

const PROVIDER: &str = "google";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// A Gemini model served by the Generative Language API.
pub struct GeminiModel {
    model_id: String,
    api_key: String,
    base_url: String,
    client: Client,
    headers: HashMap<String, String>,
}

#[derive(Clone, Default)]
pub struct GeminiModelOptions {
    pub api_key: String,
    pub base_url: Option<String>,
    pub headers: Option<HashMap<String, String>>,
    pub client: Option<Client>,
}

impl GeminiModel {
    #[must_use]
    pub fn new(model_id: impl Into<String>, options: GeminiModelOptions) -> Self {
        let GeminiModelOptions {
            api_key,
            base_url,
            headers,
            client,
        } = options;

        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Self {
            model_id: model_id.into(),
            api_key,
            base_url,
            client: client.unwrap_or_default(),
            headers: headers.unwrap_or_default(),
        }
    }

    fn request_headers(&self) -> LanguageModelResult<HeaderMap> {
        let mut headers = HeaderMap::new();

        let api_key = HeaderValue::from_str(&self.api_key).map_err(|error| {
            LanguageModelError::InvalidInput(format!("Invalid Gemini API key: {error}"))
        })?;
        headers.insert(HeaderName::from_static(API_KEY_HEADER), api_key);

        for (key, value) in &self.headers {
            let header_name = HeaderName::from_bytes(key.as_bytes()).map_err(|error| {
                LanguageModelError::InvalidInput(format!(
                    "Invalid Gemini header name '{key}': {error}"
                ))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|error| {
                LanguageModelError::InvalidInput(format!(
                    "Invalid Gemini header value for '{key}': {error}"
                ))
            })?;
            headers.insert(header_name, header_value);
        }

        Ok(headers)
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/models/{}:{method}", self.base_url, self.model_id)
    }
}

#[async_trait::async_trait]
impl LanguageModel for GeminiModel {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn model_id(&self) -> String {
        self.model_id.clone()
    }

    async fn generate(&self, input: LanguageModelInput) -> LanguageModelResult<ModelResponse> {
        telemetry::trace_generate(PROVIDER, &self.model_id, input, |input| async move {
            let params = convert_to_generate_content_parameters(input);
            let headers = self.request_headers()?;
            let response: GenerateContentResponse = client_utils::send_json(
                &self.client,
                &self.method_url("generateContent"),
                &params,
                headers,
            )
            .await?;

            check_prompt_feedback(&response)?;

            let candidate = response
                .candidates
                .and_then(|candidates| candidates.into_iter().next())
                .ok_or_else(|| {
                    LanguageModelError::Invariant(PROVIDER, "No candidate in response".to_string())
                })?;

            let content = map_candidate_text(candidate)?
                .map(|text| vec![Part::text(text)])
                .unwrap_or_default();

            Ok(ModelResponse {
                content,
                usage: response.usage_metadata.as_ref().map(map_usage_metadata),
            })
        })
        .await
    }

    async fn stream(&self, input: LanguageModelInput) -> LanguageModelResult<LanguageModelStream> {
        telemetry::trace_stream(PROVIDER, &self.model_id, input, |input| async move {
            let params = convert_to_generate_content_parameters(input);
            let headers = self.request_headers()?;
            let mut chunk_stream = client_utils::send_sse_stream::<_, GenerateContentResponse>(
                &self.client,
                &format!("{}?alt=sse", self.method_url("streamGenerateContent")),
                &params,
                headers,
                PROVIDER,
            )
            .await?;

            let stream = try_stream! {
                while let Some(chunk) = chunk_stream.next().await {
                    let response = chunk?;
                    check_prompt_feedback(&response)?;

                    let candidate = response
                        .candidates
                        .and_then(|candidates| candidates.into_iter().next());

                    if let Some(text) = candidate.map(map_candidate_text).transpose()?.flatten() {
                        // Gemini streams a single logical text part per candidate.
                        yield PartialModelResponse {
                            delta: Some(ContentDelta {
                                index: 0,
                                part: PartDelta::Text(TextPartDelta { text }),
                            }),
                            usage: None,
                        };
                    }

                    if let Some(usage_metadata) = &response.usage_metadata {
                        yield PartialModelResponse {
                            delta: None,
                            usage: Some(map_usage_metadata(usage_metadata)),
                        };
                    }
                }
            };

            Ok(LanguageModelStream::from_stream(stream))
        })
        .await
    }
}

fn convert_to_generate_content_parameters(input: LanguageModelInput) -> GenerateContentParameters {
    let LanguageModelInput {
        system_prompt,
        messages,
        max_tokens,
        temperature,
        top_p,
        top_k,
        seed,
        extra,
    } = input;

    GenerateContentParameters {
        contents: messages.into_iter().map(convert_to_gemini_content).collect(),
        system_instruction: system_prompt.map(|system_prompt| Content {
            role: None,
            parts: Some(vec![GeminiPart {
                text: Some(system_prompt),
                ..Default::default()
            }]),
        }),
        generation_config: Some(GenerateContentConfig {
            temperature,
            top_p,
            top_k,
            max_output_tokens: max_tokens,
            seed,
        }),
        extra,
    }
}

fn convert_to_gemini_content(message: Message) -> Content {
    let (role, content) = match message {
        Message::User(user_message) => ("user", user_message.content),
        Message::Assistant(assistant_message) => ("model", assistant_message.content),
    };

    Content {
        role: Some(role.to_string()),
        parts: Some(
            content
                .into_iter()
                .map(|part| match part {
                    Part::Text(text_part) => GeminiPart {
                        text: Some(text_part.text),
                        ..Default::default()
                    },
                })
                .collect(),
        ),
    }
}

fn check_prompt_feedback(response: &GenerateContentResponse) -> LanguageModelResult<()> {
    let Some(block_reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_ref())
    else {
        return Ok(());
    };

    let message = response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason_message.clone())
        .unwrap_or_else(|| format!("Prompt blocked: {block_reason}"));

    Err(LanguageModelError::Refusal(message))
}

/// Joins the non-thought text of a candidate. Returns `None` when the
/// candidate carries no text (e.g. the final chunk of a stream).
fn map_candidate_text(candidate: Candidate) -> LanguageModelResult<Option<String>> {
    let text: String = candidate
        .content
        .and_then(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .filter(|part| !part.thought.unwrap_or(false))
        .filter_map(|part| part.text)
        .collect();

    if text.is_empty() {
        if let Some(reason) = candidate.finish_reason.filter(|reason| reason.is_refusal()) {
            return Err(LanguageModelError::Refusal(format!(
                "Candidate withheld by provider: {reason:?}"
            )));
        }
        return Ok(None);
    }

    Ok(Some(text))
}

fn map_usage_metadata(usage: &UsageMetadata) -> ModelUsage {
    ModelUsage {
        input_tokens: usage.prompt_token_count.unwrap_or(0),
        output_tokens: usage.candidates_token_count.unwrap_or(0),
    }
}
