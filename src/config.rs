//! Process-level settings.
//!
//! Everything is read once at startup from `SHELFMATCH_*` environment
//! variables (a `.env` file is honored via `dotenvy`), with compiled
//! defaults matching a small single-host deployment. Changing any value
//! requires a restart.

use std::path::PathBuf;

use crate::ingestion::IngestionMode;
use crate::types::RetrievalError;

/// Upper bound accepted for a caller-supplied query limit.
pub const MAX_QUERY_LIMIT: usize = 20;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory scanned for YAML source files.
    pub documents_dir: PathBuf,
    /// Maximum chunk length in characters (flattened mode).
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    pub chunk_overlap: usize,
    /// Embedding model identifier, resolved by the embedder.
    pub embedding_model: String,
    /// Location of the persistent vector index.
    pub index_path: PathBuf,
    /// Default number of results when a query omits `limit`.
    pub max_results: usize,
    /// Adaptive relevance floor applied when the best match clears it.
    pub score_floor: f32,
    /// Nearest-neighbour oversampling factor applied before filtering.
    pub oversample: usize,
    /// How source files are turned into retrievable units.
    pub ingestion_mode: IngestionMode,
    pub host: String,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            documents_dir: PathBuf::from("documents"),
            chunk_size: 1000,
            chunk_overlap: 200,
            embedding_model: "all-minilm-l6-v2".to_string(),
            index_path: PathBuf::from(".shelfmatch/index.sqlite"),
            max_results: 5,
            score_floor: 0.4,
            oversample: 2,
            ingestion_mode: IngestionMode::Catalog,
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Settings {
    /// Loads settings from the environment, falling back to defaults, and
    /// validates the combination before anything downstream consumes it.
    pub fn from_env() -> Result<Self, RetrievalError> {
        dotenvy::dotenv().ok();

        let defaults = Settings::default();
        let settings = Settings {
            documents_dir: env_var("SHELFMATCH_DOCUMENTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.documents_dir),
            chunk_size: parse_env("SHELFMATCH_CHUNK_SIZE", defaults.chunk_size)?,
            chunk_overlap: parse_env("SHELFMATCH_CHUNK_OVERLAP", defaults.chunk_overlap)?,
            embedding_model: env_var("SHELFMATCH_EMBEDDING_MODEL")
                .unwrap_or(defaults.embedding_model),
            index_path: env_var("SHELFMATCH_INDEX_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.index_path),
            max_results: parse_env("SHELFMATCH_MAX_RESULTS", defaults.max_results)?,
            score_floor: parse_env("SHELFMATCH_SCORE_FLOOR", defaults.score_floor)?,
            oversample: parse_env("SHELFMATCH_OVERSAMPLE", defaults.oversample)?,
            ingestion_mode: match env_var("SHELFMATCH_INGESTION_MODE") {
                Some(raw) => raw
                    .parse()
                    .map_err(|message: String| RetrievalError::Config(message))?,
                None => defaults.ingestion_mode,
            },
            host: env_var("SHELFMATCH_HOST").unwrap_or(defaults.host),
            port: parse_env("SHELFMATCH_PORT", defaults.port)?,
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Rejects combinations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), RetrievalError> {
        if self.chunk_size == 0 {
            return Err(RetrievalError::Config(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RetrievalError::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.max_results == 0 || self.max_results > MAX_QUERY_LIMIT {
            return Err(RetrievalError::Config(format!(
                "max results must be in 1..={MAX_QUERY_LIMIT}, got {}",
                self.max_results
            )));
        }
        if self.oversample == 0 {
            return Err(RetrievalError::Config(
                "oversampling factor must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.score_floor) {
            return Err(RetrievalError::Config(format!(
                "score floor must be within [0, 1], got {}",
                self.score_floor
            )));
        }
        Ok(())
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T, RetrievalError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(key) {
        Some(raw) => raw
            .parse()
            .map_err(|err| RetrievalError::Config(format!("cannot parse {key}='{raw}': {err}"))),
        None => Ok(default),
    }
}
