//! Pipeline orchestration: the index and query operations, plus the
//! scoring policy that turns raw vector distances into a ranked,
//! thresholded result set.
//!
//! Both operations are synchronous single-flight pipelines over two shared
//! handles — the embedder and the vector store — injected at construction.
//! Neither operation holds state of its own, so queries against a stable
//! index may run concurrently; mutating runs must be serialized by the
//! caller.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Settings;
use crate::embedding::Embedder;
use crate::ingestion::{extract_directory, flatten_directory, IngestionMode, TextSplitter};
use crate::store::{EntryRecord, RawMatch, VectorStore};
use crate::types::{DocumentKind, IndexOutcome, RetrievalError, SearchHit};

/// Pipeline knobs, read once from [`Settings`].
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub documents_dir: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub ingestion_mode: IngestionMode,
    /// Adaptive relevance floor, applied only when the best candidate
    /// clears it.
    pub score_floor: f32,
    /// Nearest-neighbour oversampling factor applied before filtering.
    pub oversample: usize,
    pub default_limit: usize,
}

impl From<&Settings> for PipelineOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            documents_dir: settings.documents_dir.clone(),
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
            ingestion_mode: settings.ingestion_mode,
            score_floor: settings.score_floor,
            oversample: settings.oversample,
            default_limit: settings.max_results,
        }
    }
}

/// Composes extraction, chunking, embedding, and the vector store into the
/// two pipeline operations.
pub struct RetrievalPipeline {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    options: PipelineOptions,
}

impl RetrievalPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            embedder,
            store,
            options,
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Full re-index: reset the store, extract sources, embed every unit,
    /// insert.
    ///
    /// A stage failure aborts the run and surfaces the failing stage; the
    /// store keeps whatever the last successful insert left behind (there
    /// is no rollback).
    pub async fn index_documents(&self) -> Result<IndexOutcome, RetrievalError> {
        self.store.reset().await?;

        let sources = match self.options.ingestion_mode {
            IngestionMode::Catalog => self.collect_catalog_entries().await?,
            IngestionMode::Flattened => self.collect_flattened_entries().await?,
        };
        if sources.is_empty() {
            info!(dir = %self.options.documents_dir.display(), "no documents found");
            return Ok(IndexOutcome::NoDocuments);
        }

        let documents = sources.len();
        let mut total_entries = 0usize;
        for (source, mut entries) in sources {
            if entries.is_empty() {
                debug!(%source, "source produced no retrievable units");
                continue;
            }

            let texts: Vec<String> = entries.iter().map(|e| e.content.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;
            if vectors.len() != entries.len() {
                return Err(RetrievalError::Embedding(format!(
                    "expected {} vectors, got {}",
                    entries.len(),
                    vectors.len()
                )));
            }
            for (entry, vector) in entries.iter_mut().zip(vectors) {
                entry.embedding = Some(vector);
            }

            total_entries += entries.len();
            let inserted = entries.len();
            self.store.insert(entries).await?;
            info!(%source, entries = inserted, "source indexed");
        }

        Ok(IndexOutcome::Indexed {
            documents,
            entries: total_entries,
        })
    }

    /// Ranked retrieval: embed the query, oversample the nearest
    /// neighbours, then score, filter, and truncate (see [`rank_matches`]).
    pub async fn query(&self, text: &str, limit: usize) -> Result<Vec<SearchHit>, RetrievalError> {
        let vector = self.embedder.embed_query(text).await?;
        let fetch = self.options.oversample.saturating_mul(limit);
        let candidates = self.store.search(&vector, fetch).await?;
        debug!(
            candidates = candidates.len(),
            limit, "ranking oversampled candidates"
        );
        Ok(rank_matches(candidates, self.options.score_floor, limit))
    }

    /// One entry per catalog record; blank units are dropped.
    async fn collect_catalog_entries(
        &self,
    ) -> Result<Vec<(String, Vec<EntryRecord>)>, RetrievalError> {
        let documents = extract_directory(&self.options.documents_dir).await?;
        let mut sources = Vec::with_capacity(documents.len());
        for document in documents {
            let mut entries = Vec::new();
            for record in &document.records {
                let content = record.embedding_text();
                if content.is_empty() {
                    debug!(source = %document.source, "dropping blank record");
                    continue;
                }
                let index = entries.len();
                entries.push(
                    EntryRecord::new(&document.source, record.kind(), index, content)
                        .with_title(record.title().map(str::to_string))
                        .with_description(record.description())
                        .with_link(record.link()),
                );
            }
            sources.push((document.source, entries));
        }
        Ok(sources)
    }

    /// One entry per chunk of each file's flattened rendering.
    async fn collect_flattened_entries(
        &self,
    ) -> Result<Vec<(String, Vec<EntryRecord>)>, RetrievalError> {
        let splitter = TextSplitter::new(self.options.chunk_size, self.options.chunk_overlap)?;
        let flattened = flatten_directory(&self.options.documents_dir).await?;
        let mut sources = Vec::with_capacity(flattened.len());
        for (source, text) in flattened {
            if text.trim().is_empty() {
                sources.push((source, Vec::new()));
                continue;
            }
            let entries = splitter
                .split(&text)
                .into_iter()
                .enumerate()
                .map(|(index, chunk)| {
                    EntryRecord::new(&source, DocumentKind::Page, index, chunk.clone())
                        .with_description(chunk)
                })
                .collect();
            sources.push((source, entries));
        }
        Ok(sources)
    }
}

/// Maps a raw cosine distance to a similarity score in `[0, 1]`.
///
/// The clamp is defensive: the store does not enforce the metric's range,
/// and float error can push a distance slightly outside `[0, 2]`.
pub fn score_from_distance(distance: f32) -> f32 {
    (1.0 - distance / 2.0).clamp(0.0, 1.0)
}

/// Scoring and filtering policy applied to oversampled candidates:
///
/// 1. convert each distance to a score via [`score_from_distance`];
/// 2. stable-sort by score descending (ties keep store order);
/// 3. when the best score clears `floor`, drop every candidate below it —
///    a uniformly weak candidate set is returned as-is rather than
///    filtered to nothing;
/// 4. truncate to `limit`.
pub fn rank_matches(candidates: Vec<RawMatch>, floor: f32, limit: usize) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = candidates
        .into_iter()
        .map(|(entry, distance)| SearchHit {
            source: entry.source,
            score: score_from_distance(distance),
            kind: entry.kind,
            title: entry.title,
            description: entry.description,
            link: entry.link,
            content: entry.content,
        })
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    if hits.first().map(|hit| hit.score >= floor).unwrap_or(false) {
        hits.retain(|hit| hit.score >= floor);
    }

    hits.truncate(limit);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: usize, distance: f32) -> RawMatch {
        (
            EntryRecord::new("catalog.yml", DocumentKind::Product, id, format!("c{id}")),
            distance,
        )
    }

    #[test]
    fn scores_map_distance_range_into_unit_interval() {
        assert_eq!(score_from_distance(0.0), 1.0);
        assert_eq!(score_from_distance(1.0), 0.5);
        assert_eq!(score_from_distance(2.0), 0.0);
        // Out-of-range distances clamp instead of escaping [0, 1].
        assert_eq!(score_from_distance(-0.3), 1.0);
        assert_eq!(score_from_distance(2.7), 0.0);
    }

    #[test]
    fn smaller_distance_always_scores_higher() {
        let pairs = [(0.0, 0.1), (0.4, 0.6), (1.2, 1.9)];
        for (d1, d2) in pairs {
            assert!(score_from_distance(d1) > score_from_distance(d2));
        }
    }

    #[test]
    fn results_are_sorted_by_descending_score() {
        let hits = rank_matches(
            vec![candidate(0, 1.0), candidate(1, 0.2), candidate(2, 0.6)],
            0.4,
            10,
        );
        assert_eq!(hits.len(), 3);
        assert!(hits[0].score >= hits[1].score && hits[1].score >= hits[2].score);
        assert_eq!(hits[0].content, "c1");
    }

    #[test]
    fn floor_applies_when_best_candidate_clears_it() {
        let hits = rank_matches(
            vec![candidate(0, 0.4), candidate(1, 1.6), candidate(2, 1.9)],
            0.4,
            10,
        );
        // Top score is 0.8; 0.2 and 0.05 fall below the floor.
        assert_eq!(hits.len(), 1);
        assert!(hits[0].score >= 0.4);
    }

    #[test]
    fn floor_is_waived_when_everything_is_weak() {
        let hits = rank_matches(
            vec![candidate(0, 1.7), candidate(1, 1.8), candidate(2, 1.9)],
            0.4,
            10,
        );
        assert_eq!(hits.len(), 3, "weak matches must not be filtered away");
        assert!(hits.iter().all(|hit| hit.score < 0.4));
    }

    #[test]
    fn boundary_score_exactly_at_floor_survives() {
        let hits = rank_matches(vec![candidate(0, 1.2), candidate(1, 0.2)], 0.4, 10);
        // 1.2 → 0.4 exactly: kept, not dropped.
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].score, 0.4);
    }

    #[test]
    fn results_truncate_to_limit() {
        for limit in 1..=5usize {
            let candidates = (0..10).map(|i| candidate(i, 0.1 * i as f32)).collect();
            let hits = rank_matches(candidates, 0.4, limit);
            assert_eq!(hits.len(), limit);
        }
    }

    #[test]
    fn equal_scores_keep_store_order() {
        let hits = rank_matches(
            vec![candidate(0, 0.5), candidate(1, 0.5), candidate(2, 0.5)],
            0.0,
            10,
        );
        let order: Vec<&str> = hits.iter().map(|hit| hit.content.as_str()).collect();
        assert_eq!(order, vec!["c0", "c1", "c2"]);
    }

    #[test]
    fn empty_candidate_list_yields_no_hits() {
        assert!(rank_matches(Vec::new(), 0.4, 5).is_empty());
    }
}
