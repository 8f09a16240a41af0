use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::index;
use crate::models::{
    BuildOutcome, BuildRequest, BuildResponse, BuildStatus, PullModelRequest, SummaryRecord,
};
use crate::state::AppState;

/// GET /health - Liveness probe with the current corpus size.
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "indexed_repos": state.store.count(),
    }))
}

/// GET /api/config - Effective configuration (fetcher token redacted).
pub async fn get_config(State(state): State<AppState>) -> Json<crate::config::Config> {
    let mut config = state.config.clone();
    config.fetcher.github_token = None;
    Json(config)
}

/// POST /api/build - Index the requested repositories (or the configured list
/// when the request names none). Runs inline; the response carries per-repo
/// outcomes.
pub async fn build(
    State(state): State<AppState>,
    Json(req): Json<BuildRequest>,
) -> Result<Json<BuildResponse>, (StatusCode, String)> {
    let repos = if req.repositories.is_empty() {
        state.config.repositories.clone()
    } else {
        req.repositories
    };
    if repos.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "No repositories given and none configured".to_string(),
        ));
    }

    let results = index::build_index(&state, &repos).await;
    Ok(Json(summarize_outcomes(results)))
}

fn summarize_outcomes(results: Vec<BuildOutcome>) -> BuildResponse {
    let stored = results
        .iter()
        .filter(|r| r.status == BuildStatus::Stored)
        .count();
    let skipped = results
        .iter()
        .filter(|r| r.status == BuildStatus::Skipped)
        .count();
    let errored = results
        .iter()
        .filter(|r| r.status == BuildStatus::Error)
        .count();
    BuildResponse {
        count: results.len(),
        stored,
        skipped,
        errored,
        results,
    }
}

/// GET /api/summaries - Every stored summary, in insertion order.
pub async fn list_summaries(State(state): State<AppState>) -> Json<Vec<SummaryRecord>> {
    let records = state
        .store
        .get_all()
        .into_iter()
        .map(|doc| SummaryRecord {
            repo_id: doc.id,
            repo_name: doc.metadata.repo_name,
            repo_url: doc.metadata.repo_url,
            summary_length: doc.metadata.summary_length,
            summary: doc.document,
        })
        .collect();
    Json(records)
}

/// GET /api/summaries/{repo_name} - One stored summary by repository name.
pub async fn get_summary(
    State(state): State<AppState>,
    Path(repo_name): Path<String>,
) -> Result<Json<SummaryRecord>, (StatusCode, String)> {
    let doc = state.store.get(&repo_name).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            format!("No summary stored for '{repo_name}'"),
        )
    })?;

    Ok(Json(SummaryRecord {
        repo_id: doc.id,
        repo_name: doc.metadata.repo_name,
        repo_url: doc.metadata.repo_url,
        summary_length: doc.metadata.summary_length,
        summary: doc.document,
    }))
}

/// POST /api/clear - Drop the whole corpus, including the persistence file.
pub async fn clear(
    State(state): State<AppState>,
) -> Result<StatusCode, (StatusCode, String)> {
    state.store.clear().map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to clear corpus: {e:#}"),
        )
    })?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/ollama/pull - Pull a model so it is ready before a build.
pub async fn pull_model(
    State(state): State<AppState>,
    Json(req): Json<PullModelRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .ollama
        .pull(req.model.as_deref())
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, format!("Pull failed: {e}")))?;
    Ok(StatusCode::OK)
}
