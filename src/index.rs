//! Index building: summarize and store each configured repository.

use chrono::Utc;

use crate::llm::summarize;
use crate::models::{BuildOutcome, BuildStatus, RepoSpec};
use crate::state::AppState;
use crate::store::RepoMetadata;

/// Build (or rebuild) the index for `repos`, one repository at a time. Each
/// summarization waits on the generation model, so running them sequentially
/// keeps the model from thrashing between prompts. A failed repository never
/// aborts the run; its outcome records the failure.
pub async fn build_index(state: &AppState, repos: &[RepoSpec]) -> Vec<BuildOutcome> {
    let total = repos.len();
    let mut outcomes = Vec::with_capacity(total);

    for (i, repo) in repos.iter().enumerate() {
        tracing::info!("[{}/{}] Indexing {}", i + 1, total, repo.name);

        let summary = summarize::generate_summary(
            state.fetcher.as_ref(),
            state.ollama.as_ref(),
            &state.config,
            &repo.name,
            &repo.url,
        )
        .await;

        let Some(summary) = summary else {
            outcomes.push(BuildOutcome {
                repo_name: repo.name.clone(),
                status: BuildStatus::Skipped,
                detail: Some("no usable content".to_string()),
                summary_length: None,
            });
            continue;
        };

        let summary_length = summary.chars().count();
        let metadata = RepoMetadata {
            repo_name: repo.name.clone(),
            repo_url: repo.url.clone(),
            summary_length,
            indexed_at: Utc::now(),
        };

        match state.store.upsert(&repo.name, &summary, metadata).await {
            Ok(()) => {
                tracing::info!("Stored {} ({summary_length} chars)", repo.name);
                outcomes.push(BuildOutcome {
                    repo_name: repo.name.clone(),
                    status: BuildStatus::Stored,
                    detail: None,
                    summary_length: Some(summary_length),
                });
            }
            Err(e) => {
                tracing::error!("Failed to store {}: {e:#}", repo.name);
                outcomes.push(BuildOutcome {
                    repo_name: repo.name.clone(),
                    status: BuildStatus::Error,
                    detail: Some(format!("{e:#}")),
                    summary_length: None,
                });
            }
        }
    }

    outcomes
}
