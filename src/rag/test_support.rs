//! Deterministic stand-ins for the embedding model and the LLM.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::errors::ApiError;
use crate::embedding::EmbeddingProvider;
use crate::llm::{ChatRequest, LlmProvider};

const DIMENSIONS: usize = 64;

/// Bag-of-words vectors: texts sharing words end up close together.
#[derive(Default)]
pub struct KeywordEmbedder;

impl KeywordEmbedder {
    fn vectorize(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; DIMENSIONS];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = token
                .to_lowercase()
                .bytes()
                .fold(0xcbf2_9ce4_8422_2325_u64, |acc, b| {
                    (acc ^ b as u64).wrapping_mul(0x0100_0000_01b3)
                });
            vector[(hash % DIMENSIONS as u64) as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    fn model_name(&self) -> &str {
        "keyword-test"
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        Ok(texts.iter().map(|t| Self::vectorize(t)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        Ok(Self::vectorize(text))
    }
}

/// Answers with a fixed string and remembers every request.
pub struct CannedLlm {
    answer: Result<String, String>,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl CannedLlm {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Ok(answer.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            answer: Err(message.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.requests.lock().ok().and_then(|r| r.last().cloned())
    }
}

#[async_trait]
impl LlmProvider for CannedLlm {
    fn name(&self) -> &str {
        "canned"
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        self.answer.clone().map_err(ApiError::Internal)
    }
}
