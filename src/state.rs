//! Shared application state handed to the HTTP handlers and CLI commands.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::fetch::HttpContentFetcher;
use crate::llm::embeddings::OllamaEmbedder;
use crate::llm::ollama::OllamaClient;
use crate::store::VectorStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<VectorStore>,
    pub ollama: Arc<OllamaClient>,
    pub fetcher: Arc<HttpContentFetcher>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!("Failed to create data dir {}", config.data_dir.display())
        })?;

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;

        let embedder = Arc::new(OllamaEmbedder::new(client.clone(), config.ollama.clone()));
        let store = Arc::new(VectorStore::open_or_create(&config.data_dir, embedder)?);
        let ollama = Arc::new(OllamaClient::new(client.clone(), config.ollama.clone()));
        let fetcher = Arc::new(HttpContentFetcher::new(client, config.fetcher.clone()));

        Ok(Self {
            config,
            store,
            ollama,
            fetcher,
        })
    }
}
