//! RAG Context Builder.
//!
//! Turns retrieved chunks into the context block handed to the LLM and
//! wraps it, together with the question, in the answer prompt.

use super::store::ChunkSearchResult;

const CHUNK_SEPARATOR: &str = "\n\n";

/// Formats retrieved chunks, best first, within a character budget.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    max_context_chars: usize,
}

impl ContextBuilder {
    pub fn new(max_context_chars: usize) -> Self {
        Self { max_context_chars }
    }

    /// Builds the context string.
    ///
    /// The first result is always included; later ones are added while the
    /// total stays within `max_context_chars`. Returns the context and the
    /// number of chunks it contains.
    pub fn build_context(&self, results: &[ChunkSearchResult]) -> (String, usize) {
        let mut sections: Vec<String> = Vec::new();
        let mut total_chars = 0;

        for result in results {
            let section = format_chunk(result);
            let section_chars = section.chars().count();
            let separator_chars = if sections.is_empty() {
                0
            } else {
                CHUNK_SEPARATOR.len()
            };

            if !sections.is_empty()
                && total_chars + separator_chars + section_chars > self.max_context_chars
            {
                break;
            }

            total_chars += separator_chars + section_chars;
            sections.push(section);
        }

        let used = sections.len();
        (sections.join(CHUNK_SEPARATOR), used)
    }
}

/// Metadata lines, a blank line, then the text.
fn format_chunk(result: &ChunkSearchResult) -> String {
    let metadata_lines: Vec<String> = result
        .chunk
        .metadata
        .as_ref()
        .and_then(|m| m.as_object())
        .map(|map| {
            map.iter()
                .map(|(key, value)| match value.as_str() {
                    Some(text) => format!("{}: {}", key, text),
                    None => format!("{}: {}", key, value),
                })
                .collect()
        })
        .unwrap_or_default();

    if metadata_lines.is_empty() {
        return result.chunk.content.clone();
    }

    format!("{}\n\n{}", metadata_lines.join("\n"), result.chunk.content)
}

/// Question-answer prompt around the retrieved context.
pub fn build_prompt(context: &str, query: &str) -> String {
    format!(
        "Context information is below.\n\
         ---------------------\n\
         {context}\n\
         ---------------------\n\
         Given the context information and not prior knowledge, answer the query.\n\
         Query: {query}\n\
         Answer: "
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::store::StoredChunk;
    use serde_json::json;

    fn result(id: &str, content: &str, score: f32) -> ChunkSearchResult {
        ChunkSearchResult {
            chunk: StoredChunk {
                chunk_id: id.to_string(),
                content: content.to_string(),
                collection: "courses".to_string(),
                metadata: Some(json!({
                    "course_code": id,
                    "course_name": "Databases",
                    "term": "4"
                })),
            },
            score,
        }
    }

    #[test]
    fn formats_metadata_before_text() {
        let builder = ContextBuilder::new(10_000);
        let (context, used) = builder.build_context(&[result("BIM202", "SQL and normal forms.", 0.9)]);

        assert_eq!(used, 1);
        assert_eq!(
            context,
            "course_code: BIM202\ncourse_name: Databases\nterm: 4\n\nSQL and normal forms."
        );
    }

    #[test]
    fn chunk_without_metadata_is_plain_text() {
        let mut bare = result("x", "just text", 0.5);
        bare.chunk.metadata = None;

        let (context, _) = ContextBuilder::new(100).build_context(&[bare]);
        assert_eq!(context, "just text");
    }

    #[test]
    fn stops_adding_chunks_past_budget_but_keeps_first() {
        let results = vec![
            result("A", &"a".repeat(80), 0.9),
            result("B", &"b".repeat(80), 0.8),
        ];

        let (context, used) = ContextBuilder::new(50).build_context(&results);
        assert_eq!(used, 1);
        assert!(context.contains("course_code: A"));
        assert!(!context.contains("course_code: B"));

        let (_, used) = ContextBuilder::new(10_000).build_context(&results);
        assert_eq!(used, 2);
    }

    #[test]
    fn prompt_wraps_context_and_query() {
        let prompt = build_prompt("CTX", "Which course teaches SQL?");
        assert_eq!(
            prompt,
            "Context information is below.\n---------------------\nCTX\n---------------------\n\
Given the context information and not prior knowledge, answer the query.\n\
Query: Which course teaches SQL?\nAnswer: "
        );
    }
}
