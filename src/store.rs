//! Corpus store: one summary document per repository, embedded on upsert,
//! queried by text with cosine distance. In-memory with JSON persistence.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Embedding function invoked by the store for documents and query text.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Metadata stored alongside each summary document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoMetadata {
    pub repo_name: String,
    pub repo_url: String,
    /// Character count of the summary at index time
    pub summary_length: usize,
    pub indexed_at: DateTime<Utc>,
}

/// A stored corpus document. `id` is the repository name and is unique within
/// the store; re-indexing the same id replaces the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDoc {
    pub id: String,
    pub document: String,
    pub metadata: RepoMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    doc: StoredDoc,
    embedding: Vec<f32>,
}

/// A nearest-neighbor hit: the stored document plus its cosine distance,
/// reported in [0, 2] (`1 - cosine_similarity`).
#[derive(Debug, Clone)]
pub struct QueryHit {
    pub doc: StoredDoc,
    pub distance: f64,
}

/// In-memory vector store with disk persistence.
pub struct VectorStore {
    entries: RwLock<Vec<Entry>>,
    persist_path: PathBuf,
    embedder: Arc<dyn Embedder>,
}

impl VectorStore {
    /// Open the store at `data_dir/corpus.json`, creating the directory and
    /// an empty store when nothing is persisted yet.
    pub fn open_or_create(data_dir: &Path, embedder: Arc<dyn Embedder>) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data dir {}", data_dir.display()))?;
        let persist_path = data_dir.join("corpus.json");

        let entries = if persist_path.exists() {
            let data = std::fs::read_to_string(&persist_path)
                .context("Failed to read corpus store")?;
            serde_json::from_str(&data).unwrap_or_default()
        } else {
            Vec::new()
        };

        Ok(Self {
            entries: RwLock::new(entries),
            persist_path,
            embedder,
        })
    }

    /// Insert or replace the document stored under `id`.
    pub async fn upsert(&self, id: &str, document: &str, metadata: RepoMetadata) -> Result<()> {
        let embedding = self
            .embedder
            .embed(document)
            .await
            .context("Failed to embed document")?;

        let entry = Entry {
            doc: StoredDoc {
                id: id.to_string(),
                document: document.to_string(),
                metadata,
            },
            embedding,
        };

        let mut entries = self.entries.write();
        if let Some(existing) = entries.iter_mut().find(|e| e.doc.id == id) {
            *existing = entry;
        } else {
            entries.push(entry);
        }
        self.persist(&entries)
    }

    /// The full corpus, in insertion order.
    pub fn get_all(&self) -> Vec<StoredDoc> {
        self.entries.read().iter().map(|e| e.doc.clone()).collect()
    }

    /// A single document by id.
    pub fn get(&self, id: &str) -> Option<StoredDoc> {
        self.entries
            .read()
            .iter()
            .find(|e| e.doc.id == id)
            .map(|e| e.doc.clone())
    }

    pub fn count(&self) -> usize {
        self.entries.read().len()
    }

    /// Nearest neighbors of `query_text`, closest first. Equal distances keep
    /// insertion order (stable sort).
    pub async fn query(&self, query_text: &str, n_results: usize) -> Result<Vec<QueryHit>> {
        let query_embedding = self
            .embedder
            .embed(query_text)
            .await
            .context("Failed to embed query")?;

        let entries = self.entries.read();
        let mut hits: Vec<QueryHit> = entries
            .iter()
            .map(|e| QueryHit {
                doc: e.doc.clone(),
                distance: 1.0 - f64::from(cosine_similarity(&query_embedding, &e.embedding)),
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(n_results);
        Ok(hits)
    }

    /// Drop the entire collection, including the persistence file.
    pub fn clear(&self) -> Result<()> {
        let mut entries = self.entries.write();
        entries.clear();
        if self.persist_path.exists() {
            std::fs::remove_file(&self.persist_path).context("Failed to remove corpus store")?;
        }
        Ok(())
    }

    fn persist(&self, entries: &[Entry]) -> Result<()> {
        let data = serde_json::to_string(entries).context("Failed to serialize corpus store")?;
        std::fs::write(&self.persist_path, data).context("Failed to write corpus store")?;
        Ok(())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for i in 0..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::collections::HashMap;

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

    fn metadata(name: &str) -> RepoMetadata {
        RepoMetadata {
            repo_name: name.to_string(),
            repo_url: format!("https://example.com/{name}"),
            summary_length: 0,
            indexed_at: Utc::now(),
        }
    }

    fn embedder(pairs: &[(&str, Vec<f32>)]) -> Arc<dyn Embedder> {
        Arc::new(FixedEmbedder {
            map: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        })
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open_or_create(
            dir.path(),
            embedder(&[("first", vec![1.0, 0.0]), ("second", vec![0.0, 1.0])]),
        )
        .unwrap();

        store.upsert("repo-a", "first", metadata("repo-a")).await.unwrap();
        store.upsert("repo-a", "second", metadata("repo-a")).await.unwrap();

        assert_eq!(store.count(), 1);
        assert_eq!(store.get("repo-a").unwrap().document, "second");
    }

    #[tokio::test]
    async fn test_query_orders_by_distance() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open_or_create(
            dir.path(),
            embedder(&[
                ("near", vec![1.0, 0.0]),
                ("far", vec![-1.0, 0.0]),
                ("the query", vec![1.0, 0.0]),
            ]),
        )
        .unwrap();

        store.upsert("far", "far", metadata("far")).await.unwrap();
        store.upsert("near", "near", metadata("near")).await.unwrap();

        let hits = store.query("the query", 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].doc.id, "near");
        assert!((hits[0].distance - 0.0).abs() < 1e-6);
        assert!((hits[1].distance - 2.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_persistence_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let fixtures = [("doc body", vec![0.5, 0.5])];
        {
            let store = VectorStore::open_or_create(dir.path(), embedder(&fixtures)).unwrap();
            store.upsert("repo-a", "doc body", metadata("repo-a")).await.unwrap();
        }

        let reopened = VectorStore::open_or_create(dir.path(), embedder(&fixtures)).unwrap();
        assert_eq!(reopened.count(), 1);

        reopened.clear().unwrap();
        assert_eq!(reopened.count(), 0);
        assert!(!dir.path().join("corpus.json").exists());
    }
}
