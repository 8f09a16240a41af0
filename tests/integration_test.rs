//! Integration tests for the repo-scout search pipeline.
//!
//! These tests exercise the full store + hybrid ranking flow with fixture
//! embeddings, so no Ollama instance is required. Reranking is exercised
//! through stub generators.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

use repo_scout::config::SearchConfig;
use repo_scout::llm::ollama::{GenerateError, TextGenerator};
use repo_scout::search::hybrid::search_repositories;
use repo_scout::store::{Embedder, RepoMetadata, VectorStore};

const QUERY: &str = "cache eviction policy";

/// Embedder that returns pre-chosen unit vectors keyed by exact text, so the
/// cosine distances in the tests are known in advance.
struct FixedEmbedder {
    map: HashMap<String, Vec<f32>>,
}

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.map
            .get(text)
            .cloned()
            .ok_or_else(|| anyhow!("no fixture embedding for {text:?}"))
    }
}

struct StubGenerator {
    reply: Result<String, ()>,
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerateError> {
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(()) => Err(GenerateError::Connection("refused".to_string())),
        }
    }
}

fn metadata(name: &str) -> RepoMetadata {
    RepoMetadata {
        repo_name: name.to_string(),
        repo_url: format!("https://example.com/{name}"),
        summary_length: 0,
        indexed_at: Utc::now(),
    }
}

/// Three summaries, four tokens each (so the corpus mean token count is 4 and
/// the BM25 length normalization collapses), with unit embeddings chosen for
/// cosine similarities of 0.9, 0.2, and -0.5 against the query vector:
///
/// - cache-impl: distance 0.1, dense 0.95; three query tokens hit, raw BM25
///   3.0, normalized 0.3; hybrid 0.4*0.95 + 0.6*0.3 = 0.56
/// - db-pool: distance 0.8, dense 0.6; no hits; hybrid 0.24
/// - cache-sched: distance 1.5, dense 0.25; one hit, raw 1.0, normalized
///   0.1; hybrid 0.16
async fn seeded_store(dir: &std::path::Path) -> VectorStore {
    let docs = [
        ("cache-impl", "cache eviction policy implementation", vec![0.9_f32, 0.19_f32.sqrt()]),
        ("db-pool", "database connection pool manager", vec![0.2_f32, 0.96_f32.sqrt()]),
        ("cache-sched", "cache aware scheduling system", vec![-0.5_f32, 0.866_025_4]),
    ];

    let mut map: HashMap<String, Vec<f32>> = docs
        .iter()
        .map(|(_, summary, vector)| (summary.to_string(), vector.clone()))
        .collect();
    map.insert(QUERY.to_string(), vec![1.0, 0.0]);

    let store = VectorStore::open_or_create(dir, Arc::new(FixedEmbedder { map })).unwrap();
    for (name, summary, _) in &docs {
        store.upsert(name, summary, metadata(name)).await.unwrap();
    }
    store
}

fn default_opts() -> SearchConfig {
    SearchConfig::default()
}

#[tokio::test]
async fn test_hybrid_ranking_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(dir.path()).await;

    let results = search_repositories(&store, None, QUERY, 5, &default_opts())
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].repo_name, "cache-impl");
    assert_eq!(results[1].repo_name, "db-pool");
    assert_eq!(results[2].repo_name, "cache-sched");

    assert!((results[0].hybrid_score - 0.56).abs() < 0.001);
    assert!((results[0].dense_score - 0.95).abs() < 0.001);
    assert!((results[0].bm25_score - 0.3).abs() < 0.001);

    assert!((results[1].hybrid_score - 0.24).abs() < 0.001);
    assert_eq!(results[1].bm25_score, 0.0);

    assert!((results[2].hybrid_score - 0.16).abs() < 0.001);
    assert!((results[2].bm25_score - 0.1).abs() < 0.001);

    assert!(results.iter().all(|r| r.rerank_score.is_none()));
}

#[tokio::test]
async fn test_num_results_larger_than_corpus_returns_everything() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(dir.path()).await;

    let results = search_repositories(&store, None, QUERY, 100, &default_opts())
        .await
        .unwrap();
    assert_eq!(results.len(), 3);

    let top_two = search_repositories(&store, None, QUERY, 2, &default_opts())
        .await
        .unwrap();
    assert_eq!(top_two.len(), 2);
    assert_eq!(top_two[0].repo_name, "cache-impl");
    assert_eq!(top_two[1].repo_name, "db-pool");
}

#[tokio::test]
async fn test_empty_corpus_returns_empty_results() {
    let dir = tempfile::tempdir().unwrap();
    let mut map = HashMap::new();
    map.insert(QUERY.to_string(), vec![1.0, 0.0]);
    let store = VectorStore::open_or_create(dir.path(), Arc::new(FixedEmbedder { map })).unwrap();

    let results = search_repositories(&store, None, QUERY, 5, &default_opts())
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_reindexing_replaces_the_stored_summary() {
    let dir = tempfile::tempdir().unwrap();
    let mut map = HashMap::new();
    map.insert("old summary text here".to_string(), vec![1.0, 0.0]);
    map.insert("new summary text here".to_string(), vec![0.0, 1.0]);
    let store = VectorStore::open_or_create(dir.path(), Arc::new(FixedEmbedder { map })).unwrap();

    store
        .upsert("repo-a", "old summary text here", metadata("repo-a"))
        .await
        .unwrap();
    store
        .upsert("repo-a", "new summary text here", metadata("repo-a"))
        .await
        .unwrap();

    assert_eq!(store.count(), 1);
    assert_eq!(store.get("repo-a").unwrap().document, "new summary text here");
}

#[tokio::test]
async fn test_fused_ties_keep_dense_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(dir.path()).await;

    // Zero weights fuse every candidate to 0; the stable sort must then keep
    // the ascending-distance order from the dense query.
    let opts = SearchConfig {
        dense_weight: 0.0,
        bm25_weight: 0.0,
        rerank: false,
    };
    let results = search_repositories(&store, None, QUERY, 5, &opts)
        .await
        .unwrap();

    assert!(results.iter().all(|r| r.hybrid_score == 0.0));
    let names: Vec<&str> = results.iter().map(|r| r.repo_name.as_str()).collect();
    assert_eq!(names, vec!["cache-impl", "db-pool", "cache-sched"]);
}

#[tokio::test]
async fn test_rerank_reorders_and_scores_results() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(dir.path()).await;

    // The model promotes cache-sched above cache-impl and omits db-pool.
    let generator = StubGenerator {
        reply: Ok("CACHE-SCHED, cache-impl".to_string()),
    };
    let results = search_repositories(&store, Some(&generator), QUERY, 5, &default_opts())
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].repo_name, "cache-sched");
    assert_eq!(results[0].rerank_score, Some(1.0));
    assert_eq!(results[1].repo_name, "cache-impl");
    assert_eq!(results[1].rerank_score, Some(0.5));
    // The omitted candidate lands last with a zero rerank score.
    assert_eq!(results[2].repo_name, "db-pool");
    assert_eq!(results[2].rerank_score, Some(0.0));
}

#[tokio::test]
async fn test_rerank_failure_keeps_hybrid_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(dir.path()).await;

    let generator = StubGenerator { reply: Err(()) };
    let results = search_repositories(&store, Some(&generator), QUERY, 5, &default_opts())
        .await
        .unwrap();

    let names: Vec<&str> = results.iter().map(|r| r.repo_name.as_str()).collect();
    assert_eq!(names, vec!["cache-impl", "db-pool", "cache-sched"]);
    assert!(results.iter().all(|r| r.rerank_score.is_none()));
}
