//! ```text
//! YAML sources ──► ingestion::extract ─┬─► typed catalog records
//!                                      └─► flattened key:value text
//!                                                │
//!                       ingestion::chunk ◄───────┘ (flattened mode)
//!                                │
//! Retrievable units ──► embedding::Embedder ──► normalized vectors
//!                                │
//!                                ▼
//!                  store::VectorStore (sqlite-vec | memory)
//!                                │
//! Query text ──► retrieval::RetrievalPipeline ──► ranked SearchHits
//!                                │
//!                                └──► server (axum: /process, /query)
//! ```

pub mod config;
pub mod embedding;
pub mod ingestion;
pub mod retrieval;
pub mod server;
pub mod store;
pub mod types;

pub use config::Settings;
pub use embedding::{Embedder, FastEmbedder, HashEmbedder};
pub use ingestion::{IngestionMode, Record, TextSplitter};
pub use retrieval::{rank_matches, score_from_distance, PipelineOptions, RetrievalPipeline};
pub use store::{EntryRecord, MemoryVectorStore, SqliteVectorStore, VectorStore};
pub use types::{DocumentKind, IndexOutcome, RetrievalError, SearchHit};
