use async_trait::async_trait;

use crate::core::errors::ApiError;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier recorded alongside the vectors it produced.
    fn model_name(&self) -> &str;

    /// Embed stored texts, one vector per input in input order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;

    /// Embed a search query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ApiError>;
}

/// Text prepended to queries and passages before embedding.
///
/// E5 models are trained with `query: ` / `passage: ` markers and score
/// noticeably worse without them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionPrefixes {
    pub query: &'static str,
    pub passage: &'static str,
}

impl InstructionPrefixes {
    pub fn for_model(model: &str) -> Self {
        let lower = model.to_lowercase();
        if lower.contains("e5-") || lower.contains("/e5") {
            Self {
                query: "query: ",
                passage: "passage: ",
            }
        } else {
            Self {
                query: "",
                passage: "",
            }
        }
    }

    pub fn passages(&self, texts: &[String]) -> Vec<String> {
        texts
            .iter()
            .map(|text| format!("{}{}", self.passage, text))
            .collect()
    }

    pub fn query(&self, text: &str) -> String {
        format!("{}{}", self.query, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn e5_models_get_query_and_passage_markers() {
        let prefixes = InstructionPrefixes::for_model("intfloat/multilingual-e5-large");
        assert_eq!(prefixes.query("hello"), "query: hello");
        assert_eq!(
            prefixes.passages(&["a".to_string()]),
            vec!["passage: a".to_string()]
        );
    }

    #[test]
    fn other_models_are_left_untouched() {
        let prefixes = InstructionPrefixes::for_model("sentence-transformers/all-MiniLM-L6-v2");
        assert_eq!(prefixes.query("hello"), "hello");
        assert_eq!(prefixes.passages(&["a".to_string()]), vec!["a".to_string()]);
    }
}
