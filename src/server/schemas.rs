//! Request/response bodies for the HTTP surface.

use serde::{Deserialize, Serialize};

use crate::types::SearchHit;

#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    /// Free-text search query. Must not be blank.
    pub query: String,
    /// Maximum number of results, `1..=20`. Defaults to the configured
    /// result limit when omitted.
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    /// Echo of the query that produced these results.
    pub query: String,
    pub results: Vec<SearchHit>,
    pub total_results: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessResponse {
    pub total_documents: usize,
    pub total_entries: usize,
    pub status: String,
}
