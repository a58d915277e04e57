//! Shared types for the retrieval pipeline: the error taxonomy and the
//! outcome/result values exchanged between the pipeline and its callers.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by the retrieval pipeline.
///
/// The taxonomy mirrors the failure boundaries of the pipeline: per-file
/// extraction problems (`Parse`, `UnrecognizedDocumentType`) are recovered
/// at the directory level by skipping the file, while `Embedding` and
/// `Index` abort the whole operation.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// A source file is not syntactically valid YAML.
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Neither the file content nor the file name identifies a known
    /// document variant.
    #[error("unrecognized document type for {path}")]
    UnrecognizedDocumentType { path: PathBuf },

    /// The embedding model failed to load or encode.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The vector index rejected an operation.
    #[error("vector index failure: {0}")]
    Index(String),

    /// Invalid settings detected at startup.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Document variant a stored entry originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Product,
    Page,
}

impl DocumentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Product => "product",
            DocumentKind::Page => "page",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "product" => Ok(DocumentKind::Product),
            "page" => Ok(DocumentKind::Page),
            other => Err(format!("unknown document kind '{other}'")),
        }
    }
}

/// Result of an index run.
///
/// `NoDocuments` is a distinct signal, not an error: the source directory
/// contained nothing to index. `Indexed` carries how many source files were
/// processed and how many entries landed in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOutcome {
    NoDocuments,
    Indexed { documents: usize, entries: usize },
}

impl IndexOutcome {
    /// Number of source files that contributed records.
    pub fn documents(&self) -> usize {
        match self {
            IndexOutcome::NoDocuments => 0,
            IndexOutcome::Indexed { documents, .. } => *documents,
        }
    }

    /// Number of entries written to the vector store.
    pub fn entries(&self) -> usize {
        match self {
            IndexOutcome::NoDocuments => 0,
            IndexOutcome::Indexed { entries, .. } => *entries,
        }
    }

    /// Human-readable status line for callers that surface the outcome.
    pub fn status_message(&self) -> String {
        match self {
            IndexOutcome::NoDocuments => "no documents found in the source directory".to_string(),
            IndexOutcome::Indexed { documents, entries } => {
                format!("indexed {entries} entries from {documents} documents")
            }
        }
    }
}

/// A ranked query match returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// Source file the entry came from.
    pub source: String,
    /// Similarity score in `[0, 1]`, higher is closer.
    pub score: f32,
    /// Document variant.
    pub kind: DocumentKind,
    /// Title, present for product entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
    pub link: String,
    /// The text that was embedded and matched.
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_kind_round_trips_through_str() {
        for kind in [DocumentKind::Product, DocumentKind::Page] {
            assert_eq!(kind.as_str().parse::<DocumentKind>().unwrap(), kind);
        }
        assert!("catalog".parse::<DocumentKind>().is_err());
    }

    #[test]
    fn index_outcome_reports_counts() {
        let outcome = IndexOutcome::Indexed {
            documents: 2,
            entries: 7,
        };
        assert_eq!(outcome.documents(), 2);
        assert_eq!(outcome.entries(), 7);
        assert!(outcome.status_message().contains("7 entries"));

        let empty = IndexOutcome::NoDocuments;
        assert_eq!(empty.documents(), 0);
        assert!(empty.status_message().contains("no documents"));
    }
}
