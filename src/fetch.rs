//! Repository content fetching via a gitingest-style flattening service.
//!
//! The service accepts a repository URL and returns the repository's files
//! flattened into a single text blob with per-file headers. Two attempts are
//! made per repository: the configured patterns first, then a docs-only
//! retry with a tighter size cap for repositories whose full fetch fails.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::config::FetcherConfig;

/// Fetches the flattened text content of a repository. Test doubles stand in
/// for [`HttpContentFetcher`] where no service is running.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, repo_url: &str) -> Result<String>;
}

pub struct HttpContentFetcher {
    client: reqwest::Client,
    config: FetcherConfig,
}

#[derive(Serialize)]
struct IngestRequest<'a> {
    url: &'a str,
    max_file_size: u64,
    include_patterns: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<&'a str>,
}

const MB: u64 = 1024 * 1024;

/// Patterns for the docs-only fallback attempt.
const DOCS_ONLY_PATTERNS: [&str; 4] = ["**/README*", "**/*.md", "**/*.rst", "**/*.txt"];

impl HttpContentFetcher {
    pub fn new(client: reqwest::Client, config: FetcherConfig) -> Self {
        Self { client, config }
    }

    async fn attempt(
        &self,
        repo_url: &str,
        max_file_size: u64,
        include_patterns: &[String],
    ) -> Result<String> {
        let req = IngestRequest {
            url: repo_url,
            max_file_size,
            include_patterns,
            token: self.config.github_token.as_deref(),
        };

        let resp = self
            .client
            .post(&self.config.endpoint)
            .json(&req)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await
            .context("Failed to call content service")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Content service returned {status}: {body}");
        }

        let text = resp
            .text()
            .await
            .context("Failed to read content service response")?;
        if text.trim().is_empty() {
            anyhow::bail!("Content service returned an empty body");
        }
        Ok(text)
    }
}

#[async_trait]
impl ContentFetcher for HttpContentFetcher {
    async fn fetch(&self, repo_url: &str) -> Result<String> {
        let primary_size = self.config.max_file_size_mb * MB;
        let fallback_patterns: Vec<String> =
            DOCS_ONLY_PATTERNS.iter().map(|p| p.to_string()).collect();
        let fallback_size = primary_size.min(MB);

        let attempts: [(&str, u64, &[String]); 2] = [
            ("primary", primary_size, self.config.include_patterns.as_slice()),
            ("fallback:docs-only", fallback_size, fallback_patterns.as_slice()),
        ];

        let mut last_error = anyhow!("no fetch attempts were made");
        for (label, max_file_size, patterns) in attempts {
            match self.attempt(repo_url, max_file_size, patterns).await {
                Ok(content) => return Ok(content),
                Err(e) => {
                    tracing::warn!("Fetch attempt {label} failed for {repo_url}: {e:#}");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}
