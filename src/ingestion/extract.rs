//! YAML source discovery and record extraction.
//!
//! A source directory holds one YAML file per logical document group. Each
//! file carries exactly one record variant, declared either by a top-level
//! tag key (`products:` / `pages:`) or, for bare sequences, by the file
//! stem. Malformed files and unrecognizable variants are skipped with a
//! warning at the directory level; malformed items are skipped with a
//! warning at the file level. Neither aborts the run.

use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tokio::fs;
use tracing::{debug, warn};

use crate::types::{DocumentKind, RetrievalError};

/// A typed record extracted from a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Product {
        title: String,
        description: String,
        link: String,
    },
    Page {
        description: String,
        link: String,
    },
}

impl Record {
    pub fn kind(&self) -> DocumentKind {
        match self {
            Record::Product { .. } => DocumentKind::Product,
            Record::Page { .. } => DocumentKind::Page,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            Record::Product { title, .. } => Some(title),
            Record::Page { .. } => None,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Record::Product { description, .. } | Record::Page { description, .. } => description,
        }
    }

    pub fn link(&self) -> &str {
        match self {
            Record::Product { link, .. } | Record::Page { link, .. } => link,
        }
    }

    /// Text handed to the embedder for this record.
    ///
    /// Product titles are repeated three times ahead of the description so
    /// title tokens dominate the vector; pages embed the description alone.
    pub fn embedding_text(&self) -> String {
        match self {
            Record::Product {
                title, description, ..
            } => format!("{title} {title} {title} {description}")
                .trim()
                .to_string(),
            Record::Page { description, .. } => description.trim().to_string(),
        }
    }
}

/// Ordered records extracted from one source file.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// File name of the source, used as the entry id prefix.
    pub source: String,
    pub kind: DocumentKind,
    pub records: Vec<Record>,
}

/// Per-item extraction result: the skip-vs-abort decision made explicit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Parsed(Record),
    Skipped(String),
}

/// Extracts every recognizable source file under `dir`.
///
/// Files are visited in lexicographic order; after extraction, product
/// sources are stably promoted to the front so the authoritative catalog
/// lands first in dependent orderings. Files that fail to parse or carry
/// no recognizable variant are logged and skipped.
pub async fn extract_directory(dir: &Path) -> Result<Vec<SourceDocument>, RetrievalError> {
    let mut documents = Vec::new();
    for path in discover_sources(dir).await? {
        let content = fs::read_to_string(&path).await?;
        match extract_source(&path, &content) {
            Ok(document) => {
                debug!(
                    source = %document.source,
                    kind = %document.kind,
                    records = document.records.len(),
                    "extracted source file"
                );
                documents.push(document);
            }
            Err(err @ RetrievalError::Parse { .. })
            | Err(err @ RetrievalError::UnrecognizedDocumentType { .. }) => {
                warn!(error = %err, "skipping source file");
            }
            Err(err) => return Err(err),
        }
    }

    let mut ordered: Vec<SourceDocument> = Vec::with_capacity(documents.len());
    ordered.extend(
        documents
            .iter()
            .filter(|d| d.kind == DocumentKind::Product)
            .cloned(),
    );
    ordered.extend(
        documents
            .into_iter()
            .filter(|d| d.kind != DocumentKind::Product),
    );
    Ok(ordered)
}

/// Flattened ingestion: renders every parseable YAML file under `dir` to a
/// `dotted.path: value` line listing, one entry per file.
pub async fn flatten_directory(dir: &Path) -> Result<Vec<(String, String)>, RetrievalError> {
    let mut flattened = Vec::new();
    for path in discover_sources(dir).await? {
        let content = fs::read_to_string(&path).await?;
        let value: Value = match serde_yaml::from_str(&content) {
            Ok(value) => value,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unparseable source file");
                continue;
            }
        };
        let mut lines = Vec::new();
        flatten_value(&value, "", &mut lines);
        flattened.push((source_name(&path), lines.join("\n")));
    }
    Ok(flattened)
}

/// Lists `*.yml`/`*.yaml` files under `dir` in lexicographic name order.
///
/// A missing directory yields an empty list rather than an error; the
/// caller reports it as the distinct no-documents outcome.
pub async fn discover_sources(dir: &Path) -> Result<Vec<PathBuf>, RetrievalError> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!(dir = %dir.display(), "source directory does not exist");
            return Ok(Vec::new());
        }
        Err(err) => return Err(err.into()),
    };

    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"))
            .unwrap_or(false);
        if is_yaml && entry.file_type().await?.is_file() {
            paths.push(path);
        }
    }
    paths.sort_by_key(|path| path.file_name().map(|name| name.to_os_string()));
    Ok(paths)
}

/// Parses one source file into typed records.
pub fn extract_source(path: &Path, content: &str) -> Result<SourceDocument, RetrievalError> {
    let value: Value = serde_yaml::from_str(content).map_err(|err| RetrievalError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;

    let source = source_name(path);
    let (kind, items) = locate_items(path, &value)?;

    let mut records = Vec::new();
    for (index, item) in items.iter().enumerate() {
        match item_to_record(kind, item) {
            ItemOutcome::Parsed(record) => records.push(record),
            ItemOutcome::Skipped(reason) => {
                warn!(source = %source, item = index, %reason, "skipping item");
            }
        }
    }

    Ok(SourceDocument {
        source,
        kind,
        records,
    })
}

/// Decides the record variant and finds the item sequence for one file.
fn locate_items<'a>(
    path: &Path,
    value: &'a Value,
) -> Result<(DocumentKind, &'a [Value]), RetrievalError> {
    for (tag, kind) in [
        ("products", DocumentKind::Product),
        ("pages", DocumentKind::Page),
    ] {
        if let Some(tagged) = value.get(tag) {
            return match tagged {
                Value::Sequence(items) => Ok((kind, items.as_slice())),
                _ => Err(RetrievalError::Parse {
                    path: path.to_path_buf(),
                    message: format!("'{tag}' is not a sequence"),
                }),
            };
        }
    }

    if let Some(kind) = kind_from_file_name(path) {
        return match value {
            Value::Sequence(items) => Ok((kind, items.as_slice())),
            _ => Err(RetrievalError::Parse {
                path: path.to_path_buf(),
                message: "expected a top-level sequence of items".to_string(),
            }),
        };
    }

    Err(RetrievalError::UnrecognizedDocumentType {
        path: path.to_path_buf(),
    })
}

fn kind_from_file_name(path: &Path) -> Option<DocumentKind> {
    let stem = path.file_stem()?.to_str()?.to_ascii_lowercase();
    if stem.starts_with("product") {
        Some(DocumentKind::Product)
    } else if stem.starts_with("page") {
        Some(DocumentKind::Page)
    } else {
        None
    }
}

/// Turns one raw item into a record, or a skip with its reason.
pub fn item_to_record(kind: DocumentKind, item: &Value) -> ItemOutcome {
    let Value::Mapping(_) = item else {
        return ItemOutcome::Skipped("item is not a mapping".to_string());
    };

    let title = scalar_field(item, "title");
    let description = scalar_field(item, "description");
    let link = scalar_field(item, "link").unwrap_or_default();

    match kind {
        DocumentKind::Product => {
            let Some(title) = title else {
                return ItemOutcome::Skipped("product item has no title".to_string());
            };
            ItemOutcome::Parsed(Record::Product {
                title: title.trim().to_string(),
                description: collapse_whitespace(description.as_deref().unwrap_or_default()),
                link: link.trim().to_string(),
            })
        }
        DocumentKind::Page => {
            let Some(description) = description else {
                return ItemOutcome::Skipped("page item has no description".to_string());
            };
            ItemOutcome::Parsed(Record::Page {
                description: collapse_whitespace(&description),
                link: link.trim().to_string(),
            })
        }
    }
}

fn scalar_field(item: &Value, key: &str) -> Option<String> {
    item.get(key).and_then(scalar_to_string)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Collapses whitespace runs, including newlines, to single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Depth-first `dotted.path: value` rendering of an arbitrary YAML tree.
pub fn flatten_value(value: &Value, prefix: &str, out: &mut Vec<String>) {
    match value {
        Value::Mapping(mapping) => {
            for (key, child) in mapping {
                let key = scalar_to_string(key).unwrap_or_else(|| "?".to_string());
                let path = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_value(child, &path, out);
            }
        }
        Value::Sequence(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_value(item, &format!("{prefix}[{index}]"), out);
            }
        }
        Value::Null => out.push(format!("{prefix}: null")),
        scalar => {
            let rendered = scalar_to_string(scalar).unwrap_or_default();
            out.push(format!("{prefix}: {rendered}"));
        }
    }
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
