use std::{io, path::PathBuf, str::Utf8Error};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssistantError {
    /// No language model is available, so no session can become ready.
    #[error("Assistant is not configured: {0}")]
    Configuration(String),
    #[error("Language model error: {0}")]
    LanguageModel(#[from] genie_sdk::LanguageModelError),
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),
    #[error("Persistence error: {0}")]
    Persistence(String),
}

/// An uploaded file could not be turned into text.
///
/// A file that reads fine but yields no valid rows is not an error.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} is not valid UTF-8 text: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: Utf8Error,
    },
}
