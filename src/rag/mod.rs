//! RAG (Retrieval-Augmented Generation) module.
//!
//! This module provides:
//! - `RagStore` / `SqliteRagStore`: the persisted vector store
//! - `ingest_records`: embeds course rows into a collection
//! - `ContextBuilder`: formats retrieved chunks for the LLM
//! - `QueryEngine`: retrieval plus generation for one question

mod context_builder;
mod ingest;
mod query_engine;
mod sqlite;
mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use context_builder::{build_prompt, ContextBuilder};
pub use ingest::{ingest_records, IngestMode, IngestOptions, IngestReport};
pub use query_engine::{QueryAnswer, QueryEngine, QueryEngineOptions, SourceNode, EMPTY_RESPONSE};
pub use sqlite::SqliteRagStore;
pub use store::{ChunkSearchResult, RagStore, StoredChunk};
