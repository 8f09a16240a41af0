use serde::{Deserialize, Serialize};

/// A repository to index: name (stable corpus id) and source URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoSpec {
    pub name: String,
    pub url: String,
}

/// A ranked search result. `rerank_score` is present only when LLM reranking
/// ran and the candidate was placed by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedRepo {
    pub repo_name: String,
    pub repo_url: String,
    pub hybrid_score: f64,
    pub dense_score: f64,
    pub bm25_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f64>,
    pub summary: String,
}

/// Per-repository outcome of an index build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildOutcome {
    pub repo_name: String,
    pub status: BuildStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_length: Option<usize>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Stored,
    Skipped,
    Error,
}

/// Search request
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_num_results")]
    pub num_results: usize,
    /// Override the configured rerank default for this request
    #[serde(default)]
    pub rerank: Option<bool>,
}

fn default_num_results() -> usize {
    5
}

/// Search response
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<RankedRepo>,
}

/// Build request
#[derive(Debug, Clone, Deserialize)]
pub struct BuildRequest {
    pub repositories: Vec<RepoSpec>,
}

/// Build response with per-item outcomes and aggregate counts.
#[derive(Debug, Clone, Serialize)]
pub struct BuildResponse {
    pub count: usize,
    pub stored: usize,
    pub skipped: usize,
    pub errored: usize,
    pub results: Vec<BuildOutcome>,
}

/// Model pull request
#[derive(Debug, Clone, Deserialize)]
pub struct PullModelRequest {
    pub model: Option<String>,
}

/// A stored summary as returned by the viewer endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRecord {
    pub repo_id: String,
    pub repo_name: String,
    pub repo_url: String,
    pub summary_length: usize,
    pub summary: String,
}

/// Round to 3 decimals for display, matching the precision of the scores in
/// search responses.
pub(crate) fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
