use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use shelfmatch::config::Settings;
use shelfmatch::embedding::FastEmbedder;
use shelfmatch::retrieval::{PipelineOptions, RetrievalPipeline};
use shelfmatch::server;
use shelfmatch::store::SqliteVectorStore;
use shelfmatch::types::RetrievalError;

#[tokio::main]
async fn main() -> Result<(), RetrievalError> {
    init_tracing();

    let settings = Settings::from_env()?;
    info!(
        documents_dir = %settings.documents_dir.display(),
        index_path = %settings.index_path.display(),
        model = %settings.embedding_model,
        "starting shelfmatch"
    );

    if let Some(parent) = settings.index_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    // Model load failure is fatal: there is no per-call retry.
    let embedder = Arc::new(FastEmbedder::load(&settings.embedding_model)?);
    let store = Arc::new(SqliteVectorStore::open(&settings.index_path).await?);
    let pipeline = Arc::new(RetrievalPipeline::new(
        embedder,
        store,
        PipelineOptions::from(&settings),
    ));

    let app = server::router(pipeline);
    let addr = format!("{}:{}", settings.host, settings.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
