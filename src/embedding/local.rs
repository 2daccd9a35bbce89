//! In-process embeddings through fastembed's ONNX runtime.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use super::provider::{EmbeddingProvider, InstructionPrefixes};
use crate::core::config::EmbeddingSettings;
use crate::core::errors::ApiError;

pub struct LocalEmbedder {
    model: Arc<TextEmbedding>,
    model_name: String,
    batch_size: usize,
    prefixes: InstructionPrefixes,
}

impl LocalEmbedder {
    /// Loads the model, downloading it into `cache_dir` on first use.
    pub fn new(settings: &EmbeddingSettings, cache_dir: PathBuf) -> Result<Self, ApiError> {
        let variant = resolve_model(&settings.model)?;
        tracing::info!(
            "Loading embedding model {} (cache: {})",
            settings.model,
            cache_dir.display()
        );

        let options = InitOptions::new(variant)
            .with_cache_dir(cache_dir)
            .with_show_download_progress(false);
        let model = TextEmbedding::try_new(options).map_err(|e| {
            ApiError::Internal(format!(
                "Failed to load embedding model {}: {}",
                settings.model, e
            ))
        })?;

        Ok(Self {
            model: Arc::new(model),
            model_name: settings.model.clone(),
            batch_size: settings.batch_size.max(1),
            prefixes: InstructionPrefixes::for_model(&settings.model),
        })
    }

    async fn run(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, ApiError> {
        let model = Arc::clone(&self.model);
        let batch_size = self.batch_size;

        tokio::task::spawn_blocking(move || {
            model
                .embed(texts, Some(batch_size))
                .map_err(ApiError::internal)
        })
        .await
        .map_err(ApiError::internal)?
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.run(self.prefixes.passages(texts)).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        self.run(vec![self.prefixes.query(text)])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Internal("Embedding model returned no vector".to_string()))
    }
}

/// Maps Hugging Face model ids (with or without the org prefix) onto the
/// variants fastembed ships.
fn resolve_model(name: &str) -> Result<EmbeddingModel, ApiError> {
    let short = name.rsplit('/').next().unwrap_or(name).to_lowercase();
    let model = match short.as_str() {
        "multilingual-e5-large" => EmbeddingModel::MultilingualE5Large,
        "multilingual-e5-base" => EmbeddingModel::MultilingualE5Base,
        "multilingual-e5-small" => EmbeddingModel::MultilingualE5Small,
        "all-minilm-l6-v2" => EmbeddingModel::AllMiniLML6V2,
        "paraphrase-multilingual-minilm-l12-v2" => EmbeddingModel::ParaphraseMLMiniLML12V2,
        "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
        "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
        _ => {
            return Err(ApiError::BadRequest(format!(
                "Unsupported local embedding model: {}",
                name
            )))
        }
    };
    Ok(model)
}
