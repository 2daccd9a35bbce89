use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};

use super::provider::LlmProvider;
use super::types::ChatRequest;
use crate::core::config::LlmSettings;
use crate::core::errors::ApiError;

/// Google Gemini through the Generative Language REST API.
#[derive(Clone)]
pub struct GeminiProvider {
    base_url: String,
    model: String,
    api_key: String,
    client: Client,
}

impl GeminiProvider {
    pub fn new(settings: &LlmSettings, api_key: String) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url,
            urlencoding::encode(&self.model)
        )
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError> {
        let body = build_request_body(&request);

        let res = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(text);
            return Err(ApiError::Internal(format!(
                "Gemini request failed ({}): {}",
                status, message
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;
        extract_text(&payload)
    }
}

fn build_request_body(request: &ChatRequest) -> Value {
    let mut system_parts: Vec<Value> = request
        .system
        .iter()
        .map(|text| json!({ "text": text }))
        .collect();

    let mut contents = Vec::with_capacity(request.messages.len());
    for message in &request.messages {
        let role = match message.role.as_str() {
            "system" => {
                system_parts.push(json!({ "text": message.content }));
                continue;
            }
            "assistant" | "model" => "model",
            _ => "user",
        };
        contents.push(json!({
            "role": role,
            "parts": [{ "text": message.content }],
        }));
    }

    let mut body = Map::new();
    if !system_parts.is_empty() {
        body.insert(
            "systemInstruction".to_string(),
            json!({ "parts": system_parts }),
        );
    }
    body.insert("contents".to_string(), Value::Array(contents));

    let mut generation_config = Map::new();
    if let Some(t) = request.temperature {
        generation_config.insert("temperature".to_string(), json!(t));
    }
    if let Some(t) = request.max_tokens {
        generation_config.insert("maxOutputTokens".to_string(), json!(t));
    }
    if !generation_config.is_empty() {
        body.insert(
            "generationConfig".to_string(),
            Value::Object(generation_config),
        );
    }

    Value::Object(body)
}

fn extract_text(payload: &Value) -> Result<String, ApiError> {
    let Some(candidate) = payload["candidates"].as_array().and_then(|c| c.first()) else {
        let reason = payload["promptFeedback"]["blockReason"]
            .as_str()
            .unwrap_or("no candidates returned");
        return Err(ApiError::Internal(format!(
            "Gemini returned no answer: {}",
            reason
        )));
    };

    let parts = candidate["content"]["parts"].as_array();
    if parts.map_or(true, |p| p.is_empty()) {
        if let Some(finish) = candidate["finishReason"].as_str() {
            if finish != "STOP" {
                return Err(ApiError::Internal(format!(
                    "Gemini stopped without an answer: {}",
                    finish
                )));
            }
        }
    }

    Ok(parts
        .into_iter()
        .flatten()
        .filter_map(|part| part["text"].as_str())
        .collect::<Vec<_>>()
        .join(""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ChatMessage;

    #[test]
    fn body_carries_system_instruction_and_generation_config() {
        let request = ChatRequest::new(vec![ChatMessage::user("Which courses cover SQL?")])
            .with_system("Only answer course questions.")
            .with_temperature(0.1)
            .with_max_tokens(Some(256));

        let body = build_request_body(&request);

        assert_eq!(
            body,
            json!({
                "systemInstruction": { "parts": [{ "text": "Only answer course questions." }] },
                "contents": [
                    { "role": "user", "parts": [{ "text": "Which courses cover SQL?" }] }
                ],
                "generationConfig": { "temperature": 0.1, "maxOutputTokens": 256 }
            })
        );
    }

    #[test]
    fn body_maps_roles_and_folds_system_messages() {
        let request = ChatRequest::new(vec![
            ChatMessage {
                role: "system".to_string(),
                content: "be brief".to_string(),
            },
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
        ]);

        let body = build_request_body(&request);

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(body["contents"].as_array().unwrap().len(), 2);
        assert_eq!(body["contents"][1]["role"], "model");
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn extract_joins_text_parts_of_first_candidate() {
        let payload = json!({
            "candidates": [
                { "content": { "parts": [{ "text": "BIM202 " }, { "text": "covers SQL." }] }, "finishReason": "STOP" },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        });

        assert_eq!(extract_text(&payload).unwrap(), "BIM202 covers SQL.");
    }

    #[test]
    fn extract_reports_blocked_prompt() {
        let payload = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let err = extract_text(&payload).unwrap_err();
        assert_eq!(err.detail(), "Gemini returned no answer: SAFETY");
    }

    #[test]
    fn extract_reports_non_stop_finish_without_parts() {
        let payload = json!({ "candidates": [{ "finishReason": "RECITATION" }] });
        let err = extract_text(&payload).unwrap_err();
        assert_eq!(err.detail(), "Gemini stopped without an answer: RECITATION");
    }

    #[test]
    fn endpoint_targets_generate_content() {
        let settings = LlmSettings {
            base_url: "http://localhost:9999/".to_string(),
            ..LlmSettings::default()
        };
        let provider = GeminiProvider::new(&settings, "key".to_string()).unwrap();

        assert_eq!(
            provider.endpoint(),
            "http://localhost:9999/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
