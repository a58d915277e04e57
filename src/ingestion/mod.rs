//! Ingestion: turning a directory of YAML sources into retrievable units.
//!
//! * [`extract`] — source discovery, variant detection, and typed record
//!   extraction (plus the flattened `key: value` rendering).
//! * [`chunk`] — fixed-size overlapping splitting for flattened documents.

pub mod chunk;
pub mod extract;

pub use chunk::TextSplitter;
pub use extract::{
    collapse_whitespace, discover_sources, extract_directory, extract_source, flatten_directory,
    flatten_value, item_to_record, ItemOutcome, Record, SourceDocument,
};

/// How source files become retrievable units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IngestionMode {
    /// Typed extraction: one unit per catalog record, never chunked.
    #[default]
    Catalog,
    /// Whole-file flattening: one `key: value` listing per file, chunked.
    Flattened,
}

impl std::str::FromStr for IngestionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "catalog" => Ok(IngestionMode::Catalog),
            "flattened" => Ok(IngestionMode::Flattened),
            other => Err(format!(
                "unknown ingestion mode '{other}' (expected 'catalog' or 'flattened')"
            )),
        }
    }
}
