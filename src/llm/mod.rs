//! Ollama-backed language model plumbing: text generation with
//! pull-and-retry-once semantics, embeddings, summarization, and the
//! best-effort search reranker.

pub mod embeddings;
pub mod ollama;
pub mod rerank;
pub mod summarize;
