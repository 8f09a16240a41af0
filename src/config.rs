use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::extract::ExtractionMode;
use crate::models::RepoSpec;

/// Top-level configuration, constructed once at process start and passed by
/// reference into the ranking and extraction code. Loaded from a YAML file
/// (path in `REPO_SCOUT_CONFIG`, default `./repo-scout.yaml`; a missing file
/// falls back to defaults) with environment variable overrides applied on top.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the corpus persistence file is stored
    pub data_dir: PathBuf,
    /// Server bind address
    pub bind_addr: String,
    /// Ollama generation + embedding configuration
    pub ollama: OllamaConfig,
    /// Repository content fetcher configuration
    pub fetcher: FetcherConfig,
    /// Hybrid search weights and rerank default
    pub search: SearchConfig,
    /// Section extraction limits
    pub extraction: ExtractionConfig,
    /// Repositories indexed by the `build` command
    pub repositories: Vec<RepoSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Base URL for the Ollama API (generate, pull, embed)
    pub base_url: String,
    /// Model used for summarization and reranking
    pub model: String,
    /// Model used for embeddings
    pub embedding_model: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Base URL of the gitingest-style flattening service
    pub endpoint: String,
    /// Maximum per-file size sent to the service, in MB
    pub max_file_size_mb: u64,
    /// Include patterns for the primary fetch attempt (empty = everything)
    pub include_patterns: Vec<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Token forwarded to the service for private repositories
    pub github_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Weight of the normalized dense similarity in the fused score
    pub dense_weight: f64,
    /// Weight of the normalized BM25 score in the fused score
    pub bm25_weight: f64,
    /// Whether searches rerank with the LLM by default
    pub rerank: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Which sections feed the summarization context (root docs or prioritized)
    pub mode: ExtractionMode,
    /// Maximum number of section previews kept
    pub max_files: usize,
    /// Maximum characters per section preview
    pub max_file_preview_chars: usize,
    /// Extensions accepted by root-document extraction (lowercase, with dot)
    pub root_doc_extensions: Vec<String>,
    /// Hard cap on the assembled summarization context
    pub max_prompt_chars: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            bind_addr: "127.0.0.1:9100".to_string(),
            ollama: OllamaConfig::default(),
            fetcher: FetcherConfig::default(),
            search: SearchConfig::default(),
            extraction: ExtractionConfig::default(),
            repositories: Vec::new(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "mistral".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            timeout_secs: 180,
        }
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8008/ingest".to_string(),
            max_file_size_mb: 3,
            include_patterns: Vec::new(),
            timeout_secs: 120,
            github_token: None,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            dense_weight: 0.4,
            bm25_weight: 0.6,
            rerank: false,
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            mode: ExtractionMode::RootDocs,
            max_files: 30,
            max_file_preview_chars: 2000,
            root_doc_extensions: vec![".toml".to_string(), ".txt".to_string()],
            max_prompt_chars: 120_000,
        }
    }
}

impl Config {
    /// Load the YAML config file, apply environment overrides, and validate.
    pub fn load() -> Result<Self> {
        let path = std::env::var("REPO_SCOUT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./repo-scout.yaml"));

        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_yaml::from_str(&text)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("REPO_SCOUT_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(addr) = std::env::var("REPO_SCOUT_BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Ok(url) = std::env::var("REPO_SCOUT_OLLAMA_URL") {
            self.ollama.base_url = url;
        }
        if let Ok(model) = std::env::var("REPO_SCOUT_OLLAMA_MODEL") {
            self.ollama.model = model;
        }
        if let Ok(model) = std::env::var("REPO_SCOUT_EMBEDDING_MODEL") {
            self.ollama.embedding_model = model;
        }
        if let Ok(val) = std::env::var("REPO_SCOUT_OLLAMA_TIMEOUT_SECS") {
            if let Ok(v) = val.parse() {
                self.ollama.timeout_secs = v;
            }
        }
        if let Ok(url) = std::env::var("REPO_SCOUT_FETCHER_ENDPOINT") {
            self.fetcher.endpoint = url;
        }
        if let Ok(val) = std::env::var("REPO_SCOUT_FETCHER_MAX_FILE_SIZE_MB") {
            if let Ok(v) = val.parse() {
                self.fetcher.max_file_size_mb = v;
            }
        }
        if let Ok(patterns) = std::env::var("REPO_SCOUT_FETCHER_INCLUDE_PATTERNS") {
            self.fetcher.include_patterns = patterns
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
        }
        if let Ok(token) = std::env::var("REPO_SCOUT_GITHUB_TOKEN") {
            self.fetcher.github_token = Some(token);
        }
        if let Ok(val) = std::env::var("REPO_SCOUT_DENSE_WEIGHT") {
            if let Ok(v) = val.parse() {
                self.search.dense_weight = v;
            }
        }
        if let Ok(val) = std::env::var("REPO_SCOUT_BM25_WEIGHT") {
            if let Ok(v) = val.parse() {
                self.search.bm25_weight = v;
            }
        }
        if let Ok(val) = std::env::var("REPO_SCOUT_RERANK") {
            self.search.rerank =
                matches!(val.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
    }

    /// Fail-fast validation at startup.
    fn validate(&self) -> Result<()> {
        if !self.search.dense_weight.is_finite() || self.search.dense_weight < 0.0 {
            bail!("dense_weight must be a finite value >= 0");
        }
        if !self.search.bm25_weight.is_finite() || self.search.bm25_weight < 0.0 {
            bail!("bm25_weight must be a finite value >= 0");
        }
        if self.ollama.timeout_secs == 0 {
            bail!("ollama.timeout_secs must be at least 1");
        }
        if self.extraction.max_files == 0 {
            bail!("extraction.max_files must be at least 1");
        }
        Ok(())
    }

    /// Corpus persistence file.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("corpus.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.search.dense_weight, 0.4);
        assert_eq!(config.search.bm25_weight, 0.6);
        assert_eq!(config.extraction.root_doc_extensions, vec![".toml", ".txt"]);
    }

    #[test]
    fn test_yaml_partial_override() {
        let yaml = r#"
bind_addr: "0.0.0.0:9000"
search:
  dense_weight: 0.7
  bm25_weight: 0.3
repositories:
  - name: lightrag
    url: https://github.com/HKUDS/LightRAG
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.search.dense_weight, 0.7);
        // Untouched sections keep their defaults
        assert_eq!(config.ollama.model, "mistral");
        assert_eq!(config.repositories.len(), 1);
        assert_eq!(config.repositories[0].name, "lightrag");
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut config = Config::default();
        config.search.bm25_weight = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_extraction_mode_parses_from_yaml() {
        let yaml = "extraction:\n  mode: prioritized\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.extraction.mode, ExtractionMode::Prioritized);
    }
}
