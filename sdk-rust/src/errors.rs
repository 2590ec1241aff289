use thiserror::Error;

#[derive(Error, Debug)]
pub enum LanguageModelError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// The request to the provider failed or the parsing of the response
    /// failed.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The request returns a non-OK status code
    #[error("Status error: {1} (Status {0})")]
    StatusCode(reqwest::StatusCode, String),
    /// The response from the provider was unexpected (e.g. no candidate in a
    /// Gemini response, or a stream chunk that is not valid JSON).
    #[error("Invariant from {0}: {1}")]
    Invariant(&'static str, String),
    /// The provider refused to answer the prompt (e.g. Gemini blocked it for
    /// safety reasons).
    #[error("Refusal: {0}")]
    Refusal(String),
}

impl LanguageModelError {
    /// Whether the failure happened before the provider produced anything,
    /// i.e. retrying the same request could plausibly succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::StatusCode(status, _) => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

pub type LanguageModelResult<T> = Result<T, LanguageModelError>;
