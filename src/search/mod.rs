//! Hybrid search: simplified BM25 lexical scoring fused with dense vector
//! similarity, with optional LLM re-ranking of the top candidate pool.

pub mod bm25;
pub mod hybrid;
