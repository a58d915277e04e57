//! HTTP surface: a thin axum layer over the retrieval pipeline.
//!
//! Two operations are exposed — `POST /process` re-indexes the source
//! directory and `POST /query` runs a ranked search — plus a liveness
//! probe. No retrieval logic lives here; handlers validate input, call the
//! pipeline, and map outcomes to status codes.

pub mod schemas;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::{error, warn};

use crate::config::MAX_QUERY_LIMIT;
use crate::retrieval::RetrievalPipeline;
use crate::types::{IndexOutcome, RetrievalError};
use self::schemas::{ProcessResponse, QueryRequest, QueryResponse};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RetrievalPipeline>,
}

/// Builds the application router.
pub fn router(pipeline: Arc<RetrievalPipeline>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/process", post(process_documents))
        .route("/query", post(query_documents))
        .with_state(AppState { pipeline })
}

async fn health() -> &'static str {
    "ok"
}

/// Re-indexes the configured source directory.
async fn process_documents(
    State(state): State<AppState>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let outcome = state.pipeline.index_documents().await?;
    match outcome {
        IndexOutcome::NoDocuments => Err(ApiError::NotFound(outcome.status_message())),
        IndexOutcome::Indexed { .. } => Ok(Json(ProcessResponse {
            total_documents: outcome.documents(),
            total_entries: outcome.entries(),
            status: outcome.status_message(),
        })),
    }
}

/// Runs a ranked query against the index.
async fn query_documents(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::Validation("query must not be empty".to_string()));
    }
    let limit = request
        .limit
        .unwrap_or(state.pipeline.options().default_limit);
    if !(1..=MAX_QUERY_LIMIT).contains(&limit) {
        return Err(ApiError::Validation(format!(
            "limit must be in 1..={MAX_QUERY_LIMIT}, got {limit}"
        )));
    }

    let results = state.pipeline.query(&request.query, limit).await?;
    Ok(Json(QueryResponse {
        query: request.query,
        total_results: results.len(),
        results,
    }))
}

/// Error body for every non-2xx response: `{"detail": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    NotFound(String),
    Internal(String),
}

impl From<RetrievalError> for ApiError {
    fn from(err: RetrievalError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Validation(detail) => {
                warn!(%detail, "rejected request");
                (StatusCode::UNPROCESSABLE_ENTITY, detail)
            }
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, detail),
            ApiError::Internal(detail) => {
                error!(%detail, "operation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, detail)
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
