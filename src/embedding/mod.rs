//! Embedding providers: local ONNX inference or a remote OpenAI-style endpoint.

mod local;
mod openai_compat;
mod provider;

use std::sync::Arc;

pub use local::LocalEmbedder;
pub use openai_compat::OpenAiCompatibleEmbedder;
pub use provider::{EmbeddingProvider, InstructionPrefixes};

use crate::core::config::{AppPaths, EmbeddingProviderKind, EmbeddingSettings};
use crate::core::errors::ApiError;

/// Builds the provider selected by `embedding.provider`.
pub fn build_embedder(
    settings: &EmbeddingSettings,
    paths: &AppPaths,
) -> Result<Arc<dyn EmbeddingProvider>, ApiError> {
    match settings.provider {
        EmbeddingProviderKind::Local => {
            let cache_dir = settings
                .cache_dir
                .as_deref()
                .map(|dir| paths.resolve(dir))
                .unwrap_or_else(|| paths.user_data_dir.join("models"));
            Ok(Arc::new(LocalEmbedder::new(settings, cache_dir)?))
        }
        EmbeddingProviderKind::OpenaiCompatible => {
            Ok(Arc::new(OpenAiCompatibleEmbedder::new(settings)?))
        }
    }
}
