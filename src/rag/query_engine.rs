//! Retrieval plus generation over the course collection.

use std::sync::Arc;

use super::context_builder::{build_prompt, ContextBuilder};
use super::store::{ChunkSearchResult, RagStore};
use crate::core::config::RagSettings;
use crate::core::errors::ApiError;
use crate::embedding::EmbeddingProvider;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};

/// Returned when nothing was retrieved or the model produced no text.
pub const EMPTY_RESPONSE: &str = "Empty Response";

#[derive(Debug, Clone)]
pub struct QueryEngineOptions {
    pub collection: String,
    pub similarity_top_k: usize,
    pub max_context_chars: usize,
    pub system_instruction: String,
    pub temperature: f64,
    pub max_output_tokens: Option<u32>,
}

impl QueryEngineOptions {
    pub fn from_settings(settings: &RagSettings) -> Self {
        Self {
            collection: settings.store.collection.clone(),
            similarity_top_k: settings.retrieval.similarity_top_k,
            max_context_chars: settings.retrieval.max_context_chars,
            system_instruction: settings.llm.system_instruction.clone(),
            temperature: settings.llm.temperature,
            max_output_tokens: settings.llm.max_output_tokens,
        }
    }
}

/// A retrieved course that backed an answer.
#[derive(Debug, Clone)]
pub struct SourceNode {
    pub chunk_id: String,
    pub score: f32,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct QueryAnswer {
    pub response: String,
    pub sources: Vec<SourceNode>,
}

pub struct QueryEngine {
    store: Arc<dyn RagStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    context_builder: ContextBuilder,
    options: QueryEngineOptions,
}

impl QueryEngine {
    pub fn new(
        store: Arc<dyn RagStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        options: QueryEngineOptions,
    ) -> Self {
        Self {
            context_builder: ContextBuilder::new(options.max_context_chars),
            store,
            embedder,
            llm,
            options,
        }
    }

    pub fn options(&self) -> &QueryEngineOptions {
        &self.options
    }

    pub async fn query(&self, query: &str) -> Result<QueryAnswer, ApiError> {
        let query_embedding = self.embedder.embed_query(query).await?;
        let results = self
            .store
            .search(
                &self.options.collection,
                &query_embedding,
                self.options.similarity_top_k,
            )
            .await?;

        if results.is_empty() {
            tracing::info!(
                "No chunks retrieved from '{}'; skipping generation",
                self.options.collection
            );
            return Ok(QueryAnswer {
                response: EMPTY_RESPONSE.to_string(),
                sources: Vec::new(),
            });
        }

        let (context, used) = self.context_builder.build_context(&results);
        tracing::debug!(
            "Retrieved {} chunks, {} fit into the context",
            results.len(),
            used
        );

        let request = ChatRequest::new(vec![ChatMessage::user(build_prompt(&context, query))])
            .with_system(self.options.system_instruction.clone())
            .with_temperature(self.options.temperature)
            .with_max_tokens(self.options.max_output_tokens);

        let text = self.llm.chat(request).await?;
        let response = match text.trim() {
            "" => EMPTY_RESPONSE.to_string(),
            trimmed => trimmed.to_string(),
        };

        Ok(QueryAnswer {
            response,
            sources: results.iter().take(used).map(source_node).collect(),
        })
    }
}

fn source_node(result: &ChunkSearchResult) -> SourceNode {
    SourceNode {
        chunk_id: result.chunk.chunk_id.clone(),
        score: result.score,
        metadata: result.chunk.metadata.clone(),
    }
}
