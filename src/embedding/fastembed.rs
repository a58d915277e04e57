//! Local ONNX embedding via `fastembed`.
//!
//! The model is loaded once at startup and owned by a dedicated actor
//! task; callers talk to it over a channel, which keeps the handle
//! `Clone + Send + Sync` without locking around the inference session.
//! Model output is mean-pooled and L2-normalized by the model pipeline, so
//! cosine distance downstream is well defined.

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tokio::sync::{mpsc, oneshot};
use tracing::info;

use super::Embedder;
use crate::types::RetrievalError;

enum EmbedRequest {
    Batch {
        texts: Vec<String>,
        reply: oneshot::Sender<Result<Vec<Vec<f32>>, RetrievalError>>,
    },
}

/// Handle to the embedding actor.
pub struct FastEmbedder {
    sender: mpsc::Sender<EmbedRequest>,
    model_name: String,
    dimensions: usize,
}

impl FastEmbedder {
    /// Loads the configured model and spawns the inference actor.
    ///
    /// Loading downloads model weights on first use and is the only
    /// fallible step; a failure here is fatal to startup by design.
    pub fn load(model_name: &str) -> Result<Self, RetrievalError> {
        let model = resolve_model(model_name);
        let dimensions = model_dimensions(&model);
        let init_options = InitOptions::new(model).with_show_download_progress(false);

        let text_embedding = TextEmbedding::try_new(init_options).map_err(|err| {
            RetrievalError::Embedding(format!("failed to load embedding model: {err}"))
        })?;
        info!(model = model_name, dimensions, "embedding model loaded");

        let (sender, receiver) = mpsc::channel(64);
        let mut actor = EmbedActor {
            receiver,
            model: text_embedding,
        };
        tokio::spawn(async move { actor.run().await });

        Ok(Self {
            sender,
            model_name: model_name.to_string(),
            dimensions,
        })
    }
}

impl Clone for FastEmbedder {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            model_name: self.model_name.clone(),
            dimensions: self.dimensions,
        }
    }
}

#[async_trait::async_trait]
impl Embedder for FastEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let (reply, response) = oneshot::channel();
        self.sender
            .send(EmbedRequest::Batch {
                texts: texts.to_vec(),
                reply,
            })
            .await
            .map_err(|_| RetrievalError::Embedding("embedding actor is gone".to_string()))?;

        response
            .await
            .unwrap_or_else(|_| Err(RetrievalError::Embedding("embedding actor closed".into())))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

struct EmbedActor {
    receiver: mpsc::Receiver<EmbedRequest>,
    model: TextEmbedding,
}

impl EmbedActor {
    async fn run(&mut self) {
        while let Some(request) = self.receiver.recv().await {
            match request {
                EmbedRequest::Batch { texts, reply } => {
                    let refs: Vec<&str> = texts.iter().map(|t| t.as_str()).collect();
                    let result = self
                        .model
                        .embed(refs, None)
                        .map_err(|err| RetrievalError::Embedding(format!("encode failed: {err}")));
                    let _ = reply.send(result);
                }
            }
        }
    }
}

/// Maps a configured model identifier to a fastembed model. Unrecognized
/// names fall back to the MiniLM default.
fn resolve_model(name: &str) -> EmbeddingModel {
    match name.to_ascii_lowercase().as_str() {
        "bge-small-en" | "bgesmallen" => EmbeddingModel::BGESmallENV15,
        "bge-base-en" | "bgebaseen" => EmbeddingModel::BGEBaseENV15,
        "multilingual-e5-small" => EmbeddingModel::MultilingualE5Small,
        _ => EmbeddingModel::AllMiniLML6V2,
    }
}

fn model_dimensions(model: &EmbeddingModel) -> usize {
    match model {
        EmbeddingModel::BGEBaseENV15 => 768,
        // AllMiniLML6V2, BGESmallENV15, MultilingualE5Small
        _ => 384,
    }
}
