//! Hybrid ranking: fuse dense vector similarity with simplified BM25 over the
//! stored summaries, then optionally hand the top pool to the LLM reranker.

use anyhow::Result;
use std::cmp::Ordering;

use crate::config::SearchConfig;
use crate::llm::ollama::TextGenerator;
use crate::llm::rerank;
use crate::models::{round3, RankedRepo};
use crate::search::bm25;
use crate::store::VectorStore;

/// Summaries in returned results are cut to this many characters, after
/// ranking. Full-length text is always used for scoring.
pub const DISPLAY_SUMMARY_CHARS: usize = 200;

/// Convert a cosine distance in [0, 2] into a similarity in [0, 1].
///
/// Boundary assumption: the store reports cosine distance. A different
/// distance metric (e.g. Euclidean) silently produces out-of-range values
/// here; no reclamping is applied on purpose.
pub fn normalize_distance(distance: f64) -> f64 {
    1.0 - distance / 2.0
}

/// Weighted fusion of the two normalized scores.
pub fn fuse(dense: f64, bm25_normalized: f64, dense_weight: f64, bm25_weight: f64) -> f64 {
    dense_weight * dense + bm25_weight * bm25_normalized
}

/// Search the corpus for repositories matching `query`.
///
/// The full corpus is loaded to compute the mean document token count, and
/// the nearest-neighbor query is sized to the whole corpus so every candidate
/// receives both a dense and a lexical score. When `reranker` is given, a
/// pool of `2 * num_results` candidates is reranked before the final cut.
///
/// An empty corpus returns an empty list; `num_results` larger than the
/// corpus returns everything available. A store failure propagates — with
/// the corpus unreachable there is nothing to degrade to.
pub async fn search_repositories(
    store: &VectorStore,
    reranker: Option<&dyn TextGenerator>,
    query: &str,
    num_results: usize,
    opts: &SearchConfig,
) -> Result<Vec<RankedRepo>> {
    let all_docs = store.get_all();
    if all_docs.is_empty() {
        return Ok(Vec::new());
    }

    let query_tokens = bm25::tokenize(query);
    let total_tokens: usize = all_docs
        .iter()
        .map(|doc| bm25::tokenize(&doc.document).len())
        .sum();
    let avg_doc_length = total_tokens as f64 / all_docs.len() as f64;

    let hits = store.query(query, all_docs.len()).await?;

    let mut candidates: Vec<RankedRepo> = Vec::with_capacity(hits.len());
    for hit in hits {
        let dense_score = normalize_distance(hit.distance);
        let doc_tokens = bm25::tokenize(&hit.doc.document);
        let raw = bm25::bm25_score(
            &query_tokens,
            &doc_tokens,
            avg_doc_length,
            bm25::DEFAULT_K1,
            bm25::DEFAULT_B,
        );
        let bm25_normalized = bm25::normalize_bm25(raw);
        let hybrid = fuse(dense_score, bm25_normalized, opts.dense_weight, opts.bm25_weight);

        candidates.push(RankedRepo {
            repo_name: hit.doc.metadata.repo_name,
            repo_url: hit.doc.metadata.repo_url,
            hybrid_score: round3(hybrid),
            dense_score: round3(dense_score),
            bm25_score: round3(bm25_normalized),
            rerank_score: None,
            summary: hit.doc.document,
        });
    }

    // Stable sort: ties keep the dense-query order.
    candidates.sort_by(|a, b| {
        b.hybrid_score
            .partial_cmp(&a.hybrid_score)
            .unwrap_or(Ordering::Equal)
    });

    let mut results = candidates;
    if let Some(generator) = reranker {
        results.truncate(num_results * 2);
        results = rerank::rerank(generator, query, results).await;
    }
    results.truncate(num_results);

    for repo in &mut results {
        repo.summary = display_summary(&repo.summary);
    }

    Ok(results)
}

fn display_summary(summary: &str) -> String {
    let cut = crate::extract::truncate_chars(summary, DISPLAY_SUMMARY_CHARS);
    if cut.len() < summary.len() {
        format!("{cut}...")
    } else {
        summary.to_string()
    }
}
