//! Typed view of the merged configuration document.
//!
//! Every field has a default so an empty `config.yml` yields a working setup:
//! Gemini 2.5 Flash, multilingual E5 embeddings, seven retrieved courses.

use std::env;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;

use super::defaults::*;
use super::paths::AppPaths;
use crate::core::errors::ApiError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    pub server: ServerSettings,
    pub store: StoreSettings,
    pub embedding: EmbeddingSettings,
    pub llm: LlmSettings,
    pub retrieval: RetrievalSettings,
    pub ingest: IngestSettings,
}

impl RagSettings {
    pub fn from_value(value: Value) -> Result<Self, ApiError> {
        serde_json::from_value(value)
            .map_err(|e| ApiError::BadRequest(format!("Invalid config: {}", e)))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl ServerSettings {
    /// `PORT` in the environment wins over the configured port.
    pub fn bind_addr(&self) -> String {
        let port = env::var("PORT")
            .ok()
            .and_then(|val| val.parse::<u16>().ok())
            .unwrap_or(self.port);
        format!("{}:{}", self.host, port)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Store directory; relative paths live under the data dir. `None` means
    /// the default `vector_store` directory.
    pub path: Option<String>,
    pub collection: String,
}

impl StoreSettings {
    pub fn resolve_dir(&self, paths: &AppPaths) -> PathBuf {
        self.path
            .as_deref()
            .map(|dir| paths.resolve(dir))
            .unwrap_or_else(|| paths.default_store_dir.clone())
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: None,
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderKind {
    Local,
    OpenaiCompatible,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProviderKind,
    pub model: String,
    pub batch_size: usize,
    /// Model cache for the local provider.
    pub cache_dir: Option<String>,
    /// Endpoint root for the OpenAI-compatible provider.
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Local,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
            cache_dir: None,
            base_url: None,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub model: String,
    pub base_url: String,
    pub temperature: f64,
    pub max_output_tokens: Option<u32>,
    pub timeout_secs: u64,
    pub system_instruction: String,
    /// Environment variable holding the key.
    pub api_key_env: String,
    /// Fallback key, normally kept in `secrets.yaml`.
    pub api_key: Option<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_LLM_MODEL.to_string(),
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            temperature: DEFAULT_LLM_TEMPERATURE,
            max_output_tokens: None,
            timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            api_key: None,
        }
    }
}

impl LlmSettings {
    pub fn resolve_api_key(&self) -> Option<String> {
        env::var(&self.api_key_env)
            .ok()
            .or_else(|| self.api_key.clone())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub similarity_top_k: usize,
    pub max_context_chars: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            similarity_top_k: DEFAULT_SIMILARITY_TOP_K,
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub input_file: String,
    pub columns: ColumnSettings,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            input_file: DEFAULT_INPUT_FILE.to_string(),
            columns: ColumnSettings::default(),
        }
    }
}

/// CSV header names for each course field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ColumnSettings {
    pub description: String,
    pub course_code: String,
    pub term: String,
    pub course_name: String,
}

impl Default for ColumnSettings {
    fn default() -> Self {
        Self {
            description: "LLM_METIN".to_string(),
            course_code: "ders_kodu".to_string(),
            term: "donem".to_string(),
            course_name: "dersinadi".to_string(),
        }
    }
}
