use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};

use crate::core::config::{AppPaths, ConfigService, RagSettings};
use crate::embedding::build_embedder;
use crate::llm::{GeminiProvider, LlmProvider};
use crate::rag::{QueryEngine, QueryEngineOptions, RagStore, SqliteRagStore};

pub mod error;

use error::InitializationError;

/// Application state shared by every route.
///
/// The engine is either built once at startup or absent for the whole
/// process lifetime; handlers only ever read it.
pub struct AppState {
    pub settings: Arc<RagSettings>,
    pub started_at: DateTime<Utc>,
    engine: Option<Arc<QueryEngine>>,
    init_error: Option<String>,
}

impl AppState {
    /// Loads configuration and tries to bring the query engine up.
    ///
    /// Invalid configuration is fatal. Anything that goes wrong while
    /// building the engine is logged and leaves the service unavailable.
    pub async fn initialize(paths: Arc<AppPaths>) -> anyhow::Result<Arc<Self>> {
        let config = ConfigService::new(paths.clone());
        let settings = config
            .load_settings()
            .context("Failed to load configuration")?;

        let state = match build_query_engine(&settings, &paths).await {
            Ok(engine) => {
                tracing::info!("RAG system initialized successfully");
                Self::ready(settings, engine)
            }
            Err(err) => {
                tracing::error!("Failed to initialize RAG system: {}", err);
                Self::unavailable(settings, err.to_string())
            }
        };

        Ok(Arc::new(state))
    }

    pub fn ready(settings: RagSettings, engine: QueryEngine) -> Self {
        Self::with_engine(settings, Some(Arc::new(engine)), None)
    }

    pub fn unavailable(settings: RagSettings, reason: impl Into<String>) -> Self {
        Self::with_engine(settings, None, Some(reason.into()))
    }

    fn with_engine(
        settings: RagSettings,
        engine: Option<Arc<QueryEngine>>,
        init_error: Option<String>,
    ) -> Self {
        AppState {
            settings: Arc::new(settings),
            started_at: Utc::now(),
            engine,
            init_error,
        }
    }

    pub fn engine(&self) -> Option<&Arc<QueryEngine>> {
        self.engine.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.engine.is_some()
    }

    /// Why the engine is missing, if it is.
    pub fn init_error(&self) -> Option<&str> {
        self.init_error.as_deref()
    }
}

/// Opens the persisted collection and wires embedder, store and LLM together.
pub async fn build_query_engine(
    settings: &RagSettings,
    paths: &AppPaths,
) -> Result<QueryEngine, InitializationError> {
    let api_key = settings
        .llm
        .resolve_api_key()
        .ok_or_else(|| InitializationError::MissingApiKey(settings.llm.api_key_env.clone()))?;

    let store_dir = settings.store.resolve_dir(paths);
    tracing::info!("Loading vector store from {}", store_dir.display());
    let store = SqliteRagStore::open_existing(&store_dir)
        .await
        .map_err(|e| InitializationError::Store(e.into()))?;

    let collection = settings.store.collection.clone();
    let stored_model = store
        .collection_model(&collection)
        .await
        .map_err(|e| InitializationError::Store(e.into()))?
        .ok_or_else(|| InitializationError::CollectionMissing(collection.clone()))?;

    if stored_model != settings.embedding.model {
        return Err(InitializationError::EmbeddingMismatch {
            collection,
            stored: stored_model,
            configured: settings.embedding.model.clone(),
        });
    }

    let units = store
        .count(&collection)
        .await
        .map_err(|e| InitializationError::Store(e.into()))?;
    tracing::info!("Collection '{}' holds {} course units", collection, units);

    let embedder = build_embedder(&settings.embedding, paths)
        .map_err(|e| InitializationError::Embedding(e.into()))?;
    let llm = GeminiProvider::new(&settings.llm, api_key)
        .map_err(|e| InitializationError::Llm(e.into()))?;
    tracing::info!(
        "Using {} model {} with embeddings from {}",
        llm.name(),
        llm.model(),
        stored_model
    );

    Ok(QueryEngine::new(
        Arc::new(store),
        embedder,
        Arc::new(llm),
        QueryEngineOptions::from_settings(settings),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn write_config(root: &Path, body: &str) {
        fs::write(root.join("config.yml"), body).unwrap();
    }

    const REMOTE_EMBEDDINGS: &str = "\
embedding:
  provider: openai_compatible
  model: test-embed
  base_url: http://127.0.0.1:9
llm:
  api_key_env: COURSE_RAG_TEST_NEVER_SET
  api_key: test-key
";

    #[tokio::test]
    async fn missing_api_key_leaves_service_unavailable() {
        let tmp = tempfile::tempdir().unwrap();
        write_config(tmp.path(), "llm:\n  api_key_env: COURSE_RAG_TEST_NEVER_SET\n");

        let state = AppState::initialize(Arc::new(AppPaths::from_root(tmp.path())))
            .await
            .unwrap();

        assert!(!state.is_ready());
        assert!(state.init_error().unwrap().contains("COURSE_RAG_TEST_NEVER_SET"));
    }

    #[tokio::test]
    async fn missing_store_leaves_service_unavailable() {
        let tmp = tempfile::tempdir().unwrap();
        write_config(tmp.path(), REMOTE_EMBEDDINGS);

        let state = AppState::initialize(Arc::new(AppPaths::from_root(tmp.path())))
            .await
            .unwrap();

        assert!(!state.is_ready());
        assert!(state.init_error().unwrap().contains("Vector store not found"));
    }

    #[tokio::test]
    async fn invalid_config_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        write_config(tmp.path(), "retrieval:\n  similarity_top_k: -3\n");

        let result = AppState::initialize(Arc::new(AppPaths::from_root(tmp.path()))).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn collection_must_exist_and_match_model() {
        let tmp = tempfile::tempdir().unwrap();
        write_config(tmp.path(), REMOTE_EMBEDDINGS);
        let paths = AppPaths::from_root(tmp.path());
        let settings = ConfigService::new(Arc::new(paths.clone()))
            .load_settings()
            .unwrap();

        let store = SqliteRagStore::create(&paths.default_store_dir).await.unwrap();
        let err = build_query_engine(&settings, &paths).await.err().unwrap();
        assert!(matches!(err, InitializationError::CollectionMissing(_)));

        store
            .create_collection(&settings.store.collection, "other-model")
            .await
            .unwrap();
        let err = build_query_engine(&settings, &paths).await.err().unwrap();
        assert!(matches!(err, InitializationError::EmbeddingMismatch { .. }));
    }

    #[tokio::test]
    async fn matching_collection_yields_ready_state() {
        let tmp = tempfile::tempdir().unwrap();
        write_config(tmp.path(), REMOTE_EMBEDDINGS);
        let paths = AppPaths::from_root(tmp.path());
        let store = SqliteRagStore::create(&paths.default_store_dir).await.unwrap();
        store.create_collection("course_texts", "test-embed").await.unwrap();
        drop(store);

        let state = AppState::initialize(Arc::new(paths)).await.unwrap();

        assert!(state.is_ready());
        assert!(state.init_error().is_none());
        assert_eq!(state.engine().unwrap().options().similarity_top_k, 7);
    }
}
