//! LLM reranking of hybrid search candidates.
//!
//! Reranking is strictly best-effort: any failure, from a connection error to
//! a reply that names no known repository, returns the candidates unchanged.
//! Search quality degrades to the hybrid ordering instead of the request
//! failing.

use crate::extract::truncate_chars;
use crate::llm::ollama::TextGenerator;
use crate::models::{round3, RankedRepo};

/// Summary characters shown to the reranking model per candidate.
const SUMMARY_SNIPPET_CHARS: usize = 300;

/// Rerank `candidates` by asking the generator to order them by relevance to
/// `query`. On success each result carries a `rerank_score` in [0, 1], highest
/// first; on any failure the input is returned untouched.
pub async fn rerank(
    generator: &dyn TextGenerator,
    query: &str,
    candidates: Vec<RankedRepo>,
) -> Vec<RankedRepo> {
    if candidates.is_empty() {
        return candidates;
    }

    let prompt = build_rerank_prompt(query, &candidates);
    let reply = match generator.generate(&prompt).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("Reranking failed, keeping hybrid order: {e}");
            return candidates;
        }
    };

    let ranked_names = parse_ranked_names(&reply);
    if ranked_names.is_empty() {
        tracing::warn!("Reranker returned no usable names, keeping hybrid order");
        return candidates;
    }

    apply_ranking(candidates, &ranked_names)
}

fn build_rerank_prompt(query: &str, candidates: &[RankedRepo]) -> String {
    let mut listing = String::new();
    for (i, repo) in candidates.iter().enumerate() {
        let snippet = truncate_chars(&repo.summary, SUMMARY_SNIPPET_CHARS);
        listing.push_str(&format!(
            "{}. {}\nSummary: {}\n\n",
            i + 1,
            repo.repo_name,
            snippet
        ));
    }

    format!(
        "You are ranking repositories by relevance to a developer's question.\n\
         \n\
         Question: {query}\n\
         \n\
         Repositories:\n\
         {listing}\
         Reply with ONLY the repository names, comma-separated, most relevant \
         first. Do not add numbering, explanations, or any other text."
    )
}

fn parse_ranked_names(reply: &str) -> Vec<String> {
    reply
        .split(',')
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Reorder `candidates` by the model's name list. Matching is
/// case-insensitive; names the model invented are skipped, and candidates the
/// model omitted are appended with a rerank score of 0, keeping their
/// relative order.
fn apply_ranking(candidates: Vec<RankedRepo>, ranked_names: &[String]) -> Vec<RankedRepo> {
    let total = ranked_names.len();
    let mut remaining: Vec<Option<RankedRepo>> = candidates.into_iter().map(Some).collect();
    let mut ordered = Vec::with_capacity(remaining.len());

    for (pos, name) in ranked_names.iter().enumerate() {
        let wanted = name.to_lowercase();
        let slot = remaining.iter_mut().find(|slot| {
            slot.as_ref()
                .is_some_and(|repo| repo.repo_name.to_lowercase() == wanted)
        });
        if let Some(slot) = slot {
            let mut repo = slot.take().unwrap();
            repo.rerank_score = Some(round3(1.0 - pos as f64 / total as f64));
            ordered.push(repo);
        }
    }

    for slot in remaining {
        if let Some(mut repo) = slot {
            repo.rerank_score = Some(0.0);
            ordered.push(repo);
        }
    }

    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, summary: &str) -> RankedRepo {
        RankedRepo {
            repo_name: name.to_string(),
            repo_url: format!("https://example.com/{name}"),
            hybrid_score: 0.5,
            dense_score: 0.5,
            bm25_score: 0.5,
            rerank_score: None,
            summary: summary.to_string(),
        }
    }

    #[test]
    fn test_parse_ranked_names_trims_and_drops_empties() {
        let names = parse_ranked_names(" repo-b , repo-a ,, repo-c ,");
        assert_eq!(names, vec!["repo-b", "repo-a", "repo-c"]);
    }

    #[test]
    fn test_apply_ranking_reorders_case_insensitively() {
        let candidates = vec![
            candidate("Repo-A", "first"),
            candidate("Repo-B", "second"),
            candidate("Repo-C", "third"),
        ];
        let names = vec![
            "repo-c".to_string(),
            "REPO-A".to_string(),
            "repo-b".to_string(),
        ];

        let ranked = apply_ranking(candidates, &names);
        assert_eq!(ranked[0].repo_name, "Repo-C");
        assert_eq!(ranked[1].repo_name, "Repo-A");
        assert_eq!(ranked[2].repo_name, "Repo-B");
        assert_eq!(ranked[0].rerank_score, Some(1.0));
        assert_eq!(ranked[1].rerank_score, Some(round3(1.0 - 1.0 / 3.0)));
        assert_eq!(ranked[2].rerank_score, Some(round3(1.0 - 2.0 / 3.0)));
    }

    #[test]
    fn test_apply_ranking_appends_unmatched_with_zero_score() {
        let candidates = vec![
            candidate("repo-a", "first"),
            candidate("repo-b", "second"),
            candidate("repo-c", "third"),
        ];
        // The model named one candidate and hallucinated another.
        let names = vec!["repo-b".to_string(), "repo-made-up".to_string()];

        let ranked = apply_ranking(candidates, &names);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].repo_name, "repo-b");
        assert_eq!(ranked[0].rerank_score, Some(0.5));
        // Omitted candidates keep their relative order, scored 0.
        assert_eq!(ranked[1].repo_name, "repo-a");
        assert_eq!(ranked[1].rerank_score, Some(0.0));
        assert_eq!(ranked[2].repo_name, "repo-c");
        assert_eq!(ranked[2].rerank_score, Some(0.0));
    }

    #[test]
    fn test_apply_ranking_is_idempotent() {
        let candidates = vec![
            candidate("repo-a", "first"),
            candidate("repo-b", "second"),
            candidate("repo-c", "third"),
        ];
        let names = vec![
            "repo-b".to_string(),
            "repo-c".to_string(),
            "repo-a".to_string(),
        ];

        let once = apply_ranking(candidates, &names);
        let twice = apply_ranking(once.clone(), &names);
        let order_once: Vec<&str> = once.iter().map(|r| r.repo_name.as_str()).collect();
        let order_twice: Vec<&str> = twice.iter().map(|r| r.repo_name.as_str()).collect();
        assert_eq!(order_once, order_twice);
        for (a, b) in once.iter().zip(&twice) {
            assert_eq!(a.rerank_score, b.rerank_score);
        }
        // Scores strictly decrease down the ranking.
        for pair in once.windows(2) {
            assert!(pair[0].rerank_score > pair[1].rerank_score);
        }
    }

    #[test]
    fn test_prompt_enumerates_candidates_with_snippets() {
        let long_summary = "x".repeat(SUMMARY_SNIPPET_CHARS + 100);
        let candidates = vec![candidate("repo-a", "does things"), candidate("repo-b", &long_summary)];
        let prompt = build_rerank_prompt("cache eviction", &candidates);

        assert!(prompt.contains("Question: cache eviction"));
        assert!(prompt.contains("1. repo-a\nSummary: does things"));
        assert!(prompt.contains("2. repo-b\nSummary: "));
        assert!(!prompt.contains(&long_summary));
    }
}
