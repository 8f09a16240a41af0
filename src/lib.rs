//! # repo-scout
//!
//! A repository discovery engine. Each indexed repository is represented by a
//! single LLM-generated summary document, and searches rank those summaries
//! with a hybrid of dense vector similarity and simplified BM25, optionally
//! re-ranked by an LLM.
//!
//! ## Architecture
//!
//! Indexing:
//!
//! ```text
//!   repo URL ──► content service ──► section extraction ──► context blocks
//!                                                                │
//!                                                                ▼
//!   corpus store ◄── embedding ◄── summary ◄── LLM summarization
//! ```
//!
//! Search:
//!
//! ```text
//!   query ──┬──► dense nearest-neighbor (whole corpus)
//!           │                                │  1 - distance/2
//!           └──► simplified BM25 per summary │
//!                                │ raw/10 cap│
//!                                ▼           ▼
//!                      weighted fusion (0.4 dense + 0.6 bm25)
//!                                │
//!                                ▼
//!                  optional LLM re-ranking of top 2N pool
//!                                │
//!                                ▼
//!                          top N results
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - YAML configuration with environment overrides
//! - [`models`] - Shared data types: `RepoSpec`, `RankedRepo`, request/response types
//! - [`fetch`] - Repository content fetching via a flattening service
//! - [`extract`] - Section extraction from flattened content blobs
//! - [`llm::ollama`] - Ollama text generation with pull-and-retry-once
//! - [`llm::embeddings`] - Embedding generation via the Ollama embed API
//! - [`llm::summarize`] - Repository summarization with raw-context fallback
//! - [`llm::rerank`] - Best-effort LLM re-ranking of search candidates
//! - [`search::bm25`] - Simplified BM25 lexical scoring (no IDF term)
//! - [`search::hybrid`] - Dense + BM25 fusion and the search entry point
//! - [`store`] - In-memory vector store with JSON persistence
//! - [`index`] - Index building over the configured repositories
//! - [`api`] - Axum HTTP handlers
//! - [`state`] - Shared application state

pub mod api;
pub mod config;
pub mod extract;
pub mod fetch;
pub mod index;
pub mod llm;
pub mod models;
pub mod search;
pub mod state;
pub mod store;
