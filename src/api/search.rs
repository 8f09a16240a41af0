use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::llm::ollama::TextGenerator;
use crate::models::{SearchRequest, SearchResponse};
use crate::search::hybrid;
use crate::state::AppState;

/// Largest number of results a single search may request.
const MAX_NUM_RESULTS: usize = 50;

/// POST /api/search - Hybrid search over the indexed summaries:
///   1. Dense nearest-neighbor query over the whole corpus
///   2. Simplified BM25 scoring of every summary against the query
///   3. Weighted fusion, optional LLM re-ranking of the top pool
pub async fn search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let query = req.query.trim().to_string();
    if query.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Query is required".to_string()));
    }
    if req.num_results == 0 || req.num_results > MAX_NUM_RESULTS {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("num_results must be between 1 and {MAX_NUM_RESULTS}"),
        ));
    }

    let rerank = req.rerank.unwrap_or(state.config.search.rerank);
    let reranker = rerank.then(|| state.ollama.as_ref() as &dyn TextGenerator);

    let results = hybrid::search_repositories(
        &state.store,
        reranker,
        &query,
        req.num_results,
        &state.config.search,
    )
    .await
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Search failed: {e:#}"),
        )
    })?;

    Ok(Json(SearchResponse { query, results }))
}
