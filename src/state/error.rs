use thiserror::Error;

/// Reasons the query engine could not be brought up at startup.
#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("{0} environment variable not found and no llm.api_key configured")]
    MissingApiKey(String),

    #[error("Failed to open vector store: {0}")]
    Store(#[source] anyhow::Error),

    #[error("Collection '{0}' not found in the vector store; run the ingestion step first")]
    CollectionMissing(String),

    #[error(
        "Collection '{collection}' was built with embedding model '{stored}', but '{configured}' is configured"
    )]
    EmbeddingMismatch {
        collection: String,
        stored: String,
        configured: String,
    },

    #[error("Failed to initialize embedding model: {0}")]
    Embedding(#[source] anyhow::Error),

    #[error("Failed to initialize LLM service: {0}")]
    Llm(#[source] anyhow::Error),
}
