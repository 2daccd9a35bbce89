use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::{EmbeddingProvider, InstructionPrefixes};
use crate::core::config::EmbeddingSettings;
use crate::core::errors::ApiError;

/// Embeddings served over an OpenAI-style `/v1/embeddings` endpoint
/// (LM Studio, llama.cpp server, vLLM, ...).
#[derive(Clone)]
pub struct OpenAiCompatibleEmbedder {
    base_url: String,
    model: String,
    api_key: Option<String>,
    batch_size: usize,
    prefixes: InstructionPrefixes,
    client: Client,
}

impl OpenAiCompatibleEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self, ApiError> {
        let base_url = settings.base_url.as_deref().ok_or_else(|| {
            ApiError::BadRequest(
                "embedding.base_url is required for the openai_compatible provider".to_string(),
            )
        })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
            batch_size: settings.batch_size.max(1),
            prefixes: InstructionPrefixes::for_model(&settings.model),
            client: Client::new(),
        })
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({
            "model": self.model,
            "input": inputs,
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let res = request.send().await.map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "Embedding endpoint returned {}: {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;
        let embeddings = parse_embeddings(&payload);
        if embeddings.len() != inputs.len() {
            return Err(ApiError::Internal(format!(
                "Embedding endpoint returned {} vectors for {} inputs",
                embeddings.len(),
                inputs.len()
            )));
        }
        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiCompatibleEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        let inputs = self.prefixes.passages(texts);
        let mut embeddings = Vec::with_capacity(inputs.len());
        for batch in inputs.chunks(self.batch_size) {
            embeddings.extend(self.embed_batch(batch).await?);
        }
        Ok(embeddings)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        self.embed_batch(&[self.prefixes.query(text)])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Internal("Embedding endpoint returned no vector".to_string()))
    }
}

/// Vectors in `index` order; servers are allowed to answer out of order.
fn parse_embeddings(payload: &Value) -> Vec<Vec<f32>> {
    let Some(data) = payload["data"].as_array() else {
        return Vec::new();
    };

    let mut indexed: Vec<(u64, Vec<f32>)> = data
        .iter()
        .enumerate()
        .filter_map(|(pos, item)| {
            let vals = item["embedding"].as_array()?;
            let vec = vals
                .iter()
                .filter_map(|v| v.as_f64().map(|f| f as f32))
                .collect();
            let index = item["index"].as_u64().unwrap_or(pos as u64);
            Some((index, vec))
        })
        .collect();
    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, vec)| vec).collect()
}
