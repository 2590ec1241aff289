use crate::errors::IngestError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{
    path::Path,
    sync::atomic::{AtomicU64, Ordering},
};

/// A policy or reference text uploaded by the store owner. `content` is kept
/// exactly as uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    pub id: String,
    pub name: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: DocumentKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Text,
    Markdown,
}

impl DocumentKind {
    /// `.md` files are markdown, everything else is plain text.
    #[must_use]
    pub fn from_filename(filename: &str) -> Self {
        if filename.ends_with(".md") {
            Self::Markdown
        } else {
            Self::Text
        }
    }
}

static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Wraps uploaded text files into [`KnowledgeDocument`]s.
pub struct DocumentIngestor;

impl DocumentIngestor {
    #[must_use]
    pub fn ingest(filename: &str, text: impl Into<String>) -> KnowledgeDocument {
        let document = KnowledgeDocument {
            id: next_document_id(),
            name: filename.to_string(),
            content: text.into(),
            kind: DocumentKind::from_filename(filename),
        };
        tracing::debug!(
            id = %document.id,
            name = %document.name,
            bytes = document.content.len(),
            "ingested knowledge document"
        );
        document
    }

    /// Reads a UTF-8 text file. The document is named after the file name.
    pub async fn read(path: impl AsRef<Path>) -> Result<KnowledgeDocument, IngestError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| IngestError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let text = String::from_utf8(bytes).map_err(|error| IngestError::Decode {
            path: path.to_path_buf(),
            source: error.utf8_error(),
        })?;

        let filename = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());

        Ok(Self::ingest(&filename, text))
    }
}

/// `doc-<unix millis>-<sequence>`; the sequence makes ids unique within the
/// process even when the clock does not advance.
fn next_document_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let sequence = NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("doc-{millis}-{sequence}")
}
