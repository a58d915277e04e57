//! Storage backends for embedded catalog entries.
//!
//! The [`VectorStore`] trait abstracts over the persistent sqlite-vec
//! backend and the in-memory backend so the pipeline and its tests can use
//! either without caring which:
//!
//! ```text
//!                  ┌───────────────────┐
//!                  │ VectorStore trait │
//!                  │  (reset/insert/   │
//!                  │   search/count)   │
//!                  └─────────┬─────────┘
//!                            │
//!                 ┌──────────┴──────────┐
//!                 ▼                     ▼
//!          ┌────────────┐       ┌─────────────┐
//!          │   SQLite   │       │  In-memory  │
//!          │ sqlite-vec │       │ brute force │
//!          └────────────┘       └─────────────┘
//! ```

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{DocumentKind, RetrievalError};

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

/// One persisted retrieval unit: metadata plus (optionally) its vector.
///
/// `id` is `"{source}#{index}"` where `index` is the 0-based position of
/// the unit within its source file. Ids are unique within one indexing run;
/// a reset invalidates all of them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntryRecord {
    pub id: String,
    /// Source file the entry came from.
    pub source: String,
    pub kind: DocumentKind,
    /// Present for product entries only.
    pub title: Option<String>,
    pub description: String,
    pub link: String,
    /// The text that was embedded.
    pub content: String,
    /// 0-based sequence index within the source file.
    pub chunk_index: usize,
    /// The embedding vector, when computed.
    pub embedding: Option<Vec<f32>>,
}

impl EntryRecord {
    pub fn new(
        source: impl Into<String>,
        kind: DocumentKind,
        chunk_index: usize,
        content: impl Into<String>,
    ) -> Self {
        let source = source.into();
        Self {
            id: format!("{source}#{chunk_index}"),
            source,
            kind,
            title: None,
            description: String::new(),
            link: String::new(),
            content: content.into(),
            chunk_index,
            embedding: None,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = link.into();
        self
    }

    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// A nearest-neighbour candidate: the stored entry and its raw cosine
/// distance from the query vector (lower is closer).
pub type RawMatch = (EntryRecord, f32);

/// Unified interface over entry storage backends.
///
/// Backends return raw distances; score shaping and filtering live in the
/// retrieval layer so they can be tested against synthetic distance lists.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Empties the store. Idempotent; resetting an empty store is a no-op.
    async fn reset(&self) -> Result<(), RetrievalError>;

    /// Appends entries. Id collisions with existing rows are surfaced as
    /// [`RetrievalError::Index`]; callers reset between full re-index runs.
    async fn insert(&self, entries: Vec<EntryRecord>) -> Result<(), RetrievalError>;

    /// Returns up to `top_k` candidates ordered by ascending distance,
    /// ties broken by insertion order.
    async fn search(&self, embedding: &[f32], top_k: usize)
        -> Result<Vec<RawMatch>, RetrievalError>;

    /// Total number of stored entries.
    async fn count(&self) -> Result<usize, RetrievalError>;
}
