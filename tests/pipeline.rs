//! End-to-end pipeline tests with the deterministic hash embedder.
//!
//! These cover the index and query operations against real YAML fixtures
//! on disk, using the in-memory store so they run without the ONNX model
//! or a sqlite file.

use std::path::Path;
use std::sync::Arc;

use shelfmatch::config::Settings;
use shelfmatch::embedding::HashEmbedder;
use shelfmatch::ingestion::IngestionMode;
use shelfmatch::retrieval::{PipelineOptions, RetrievalPipeline};
use shelfmatch::store::{MemoryVectorStore, VectorStore};
use shelfmatch::types::{DocumentKind, IndexOutcome};

fn write_fixture(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

fn build_pipeline(settings: &Settings) -> (RetrievalPipeline, Arc<MemoryVectorStore>) {
    let store = Arc::new(MemoryVectorStore::new());
    let pipeline = RetrievalPipeline::new(
        Arc::new(HashEmbedder::new(128)),
        store.clone(),
        PipelineOptions::from(settings),
    );
    (pipeline, store)
}

fn catalog_settings(dir: &Path) -> Settings {
    Settings {
        documents_dir: dir.to_path_buf(),
        ..Settings::default()
    }
}

const CATALOG: &str = r#"
products:
  - title: "Peaceful Cat"
    description: A calm, quiet companion that naps in sunbeams.
    link: https://example.com/peaceful-cat
  - title: "Loud Dog"
    description: An energetic guard that barks at every visitor.
    link: https://example.com/loud-dog
"#;

#[tokio::test]
async fn peaceful_cat_outranks_loud_dog() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), "products.yml", CATALOG);

    let (pipeline, _) = build_pipeline(&catalog_settings(dir.path()));
    let outcome = pipeline.index_documents().await.unwrap();
    assert_eq!(
        outcome,
        IndexOutcome::Indexed {
            documents: 1,
            entries: 2
        }
    );

    let hits = pipeline.query("peaceful cat", 5).await.unwrap();
    assert!(!hits.is_empty());
    assert_eq!(hits[0].title.as_deref(), Some("Peaceful Cat"));

    let dog = hits
        .iter()
        .find(|hit| hit.title.as_deref() == Some("Loud Dog"));
    if let Some(dog) = dog {
        assert!(hits[0].score > dog.score, "cat must strictly outrank dog");
    }
    for hit in &hits {
        assert!((0.0..=1.0).contains(&hit.score));
    }
}

#[tokio::test]
async fn empty_directory_reports_no_documents() {
    let dir = tempfile::tempdir().unwrap();
    let (pipeline, store) = build_pipeline(&catalog_settings(dir.path()));

    let outcome = pipeline.index_documents().await.unwrap();
    assert_eq!(outcome, IndexOutcome::NoDocuments);
    assert_eq!(outcome.documents(), 0);
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn missing_directory_reports_no_documents() {
    let dir = tempfile::tempdir().unwrap();
    let settings = catalog_settings(&dir.path().join("does-not-exist"));
    let (pipeline, _) = build_pipeline(&settings);
    assert_eq!(
        pipeline.index_documents().await.unwrap(),
        IndexOutcome::NoDocuments
    );
}

#[tokio::test]
async fn blank_records_are_dropped_but_the_run_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(
        dir.path(),
        "products.yml",
        r#"
products:
  - title: ""
    description: "   "
    link: /blank
  - title: Kettle
    description: Boils water fast.
    link: /kettle
"#,
    );

    let (pipeline, store) = build_pipeline(&catalog_settings(dir.path()));
    let outcome = pipeline.index_documents().await.unwrap();
    assert_eq!(
        outcome,
        IndexOutcome::Indexed {
            documents: 1,
            entries: 1
        }
    );
    assert_eq!(store.count().await.unwrap(), 1);

    let hits = pipeline.query("kettle", 5).await.unwrap();
    assert_eq!(hits[0].title.as_deref(), Some("Kettle"));
}

#[tokio::test]
async fn query_limit_is_respected_across_the_full_range() {
    let dir = tempfile::tempdir().unwrap();
    let items: String = (0..25)
        .map(|i| {
            format!(
                "  - title: Gadget {i}\n    description: A gadget for task number {i}.\n    link: /g{i}\n"
            )
        })
        .collect();
    write_fixture(dir.path(), "products.yml", &format!("products:\n{items}"));

    let (pipeline, _) = build_pipeline(&catalog_settings(dir.path()));
    pipeline.index_documents().await.unwrap();

    for limit in 1..=20usize {
        let hits = pipeline.query("gadget task", limit).await.unwrap();
        assert!(hits.len() <= limit, "limit {limit} returned {}", hits.len());
    }
}

#[tokio::test]
async fn reindex_is_full_replace() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), "products.yml", CATALOG);

    let (pipeline, store) = build_pipeline(&catalog_settings(dir.path()));
    pipeline.index_documents().await.unwrap();
    pipeline.index_documents().await.unwrap();
    assert_eq!(store.count().await.unwrap(), 2);
}

#[tokio::test]
async fn product_sources_are_indexed_ahead_of_pages() {
    let dir = tempfile::tempdir().unwrap();
    // Lexicographically "about.yml" sorts first; the product source must
    // still land first in the store.
    write_fixture(
        dir.path(),
        "about.yml",
        "pages:\n  - description: About our quiet little shop.\n    link: /about\n",
    );
    write_fixture(dir.path(), "products.yml", CATALOG);

    let (pipeline, store) = build_pipeline(&catalog_settings(dir.path()));
    let outcome = pipeline.index_documents().await.unwrap();
    assert_eq!(outcome.documents(), 2);
    assert_eq!(outcome.entries(), 3);

    // Identical query vector: ties resolve by insertion order, so a
    // zero-vector query surfaces rows in stored order.
    let matches = store.search(&vec![0.0f32; 128], 10).await.unwrap();
    assert_eq!(matches.len(), 3);
    assert_eq!(matches[0].0.id, "products.yml#0");
    assert_eq!(matches[0].0.kind, DocumentKind::Product);
    assert_eq!(matches[2].0.id, "about.yml#0");
}

#[tokio::test]
async fn malformed_files_are_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), "broken.yml", "products: [unclosed");
    write_fixture(dir.path(), "notes.yml", "- not: recognizable");
    write_fixture(dir.path(), "products.yml", CATALOG);

    let (pipeline, _) = build_pipeline(&catalog_settings(dir.path()));
    let outcome = pipeline.index_documents().await.unwrap();
    assert_eq!(outcome.documents(), 1);
    assert_eq!(outcome.entries(), 2);
}

#[tokio::test]
async fn page_hits_carry_no_title() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(
        dir.path(),
        "pages.yml",
        "pages:\n  - description: Shipping takes three days within the region.\n    link: /shipping\n",
    );

    let (pipeline, _) = build_pipeline(&catalog_settings(dir.path()));
    pipeline.index_documents().await.unwrap();

    let hits = pipeline.query("shipping days", 5).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].kind, DocumentKind::Page);
    assert_eq!(hits[0].title, None);
    assert_eq!(hits[0].link, "/shipping");
    assert_eq!(hits[0].source, "pages.yml");
}

#[tokio::test]
async fn flattened_mode_chunks_whole_documents() {
    let dir = tempfile::tempdir().unwrap();
    let body: String = (0..30)
        .map(|i| format!("  note{i}: a longer value describing observation number {i}\n"))
        .collect();
    write_fixture(dir.path(), "journal.yml", &format!("entries:\n{body}"));

    let settings = Settings {
        documents_dir: dir.path().to_path_buf(),
        ingestion_mode: IngestionMode::Flattened,
        chunk_size: 120,
        chunk_overlap: 24,
        ..Settings::default()
    };
    let (pipeline, store) = build_pipeline(&settings);

    let outcome = pipeline.index_documents().await.unwrap();
    assert_eq!(outcome.documents(), 1);
    assert!(outcome.entries() > 1, "long document must chunk");
    assert_eq!(store.count().await.unwrap(), outcome.entries());

    let matches = store.search(&vec![0.0f32; 128], 100).await.unwrap();
    for (i, (entry, _)) in matches.iter().enumerate() {
        assert!(entry.content.chars().count() <= 120);
        assert_eq!(entry.id, format!("journal.yml#{}", entry.chunk_index));
        assert!(i < outcome.entries());
    }

    let hits = pipeline.query("observation number 7", 3).await.unwrap();
    assert!(!hits.is_empty());
    assert!(hits.len() <= 3);
}
