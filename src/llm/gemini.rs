//! Gemini adapter. This system treats Gemini as a single-pass provider: it
//! never sees tool definitions and never participates in the tool-call loop.
//! The full conversation (system prompt, prior turns, any tool-result text
//! that happened to accumulate before a handoff) is flattened into one text
//! part per call, matching `generateContent`'s simplest shape.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProviderError;
use crate::llm::{
    ChatModel, ModelCompletion, ModelMessage, ModelToolChoice, ModelToolDefinition, ModelUsage,
    ProviderCapability,
};
use crate::team::ProviderTag;
use tracing::{debug, error};

const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct GeminiModelConfig {
    pub api_key: String,
    pub model: String,
    pub api_base_url: Option<String>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl GeminiModelConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            api_base_url: None,
            temperature: None,
            top_p: None,
            max_output_tokens: Some(4096),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiModel {
    client: Client,
    config: GeminiModelConfig,
}

impl GeminiModel {
    pub fn new(config: GeminiModelConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .build()
            .map_err(|err| ProviderError::Request(err.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn from_env(model: impl Into<String>) -> Result<Self, ProviderError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| ProviderError::Request("GEMINI_API_KEY is not set".to_string()))?;

        Self::new(GeminiModelConfig::new(api_key, model))
    }

    fn endpoint(&self) -> String {
        let base = self
            .config
            .api_base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE_URL)
            .trim_end_matches('/');
        format!("{base}/models/{}:generateContent", self.config.model)
    }
}

#[async_trait]
impl ChatModel for GeminiModel {
    async fn invoke(
        &self,
        messages: &[ModelMessage],
        _tools: &[ModelToolDefinition],
        _tool_choice: ModelToolChoice,
    ) -> Result<ModelCompletion, ProviderError> {
        let request = build_request(messages, &self.config);

        debug!(model = %self.config.model, round_messages = messages.len(), "gemini request");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|err| ProviderError::Request(err.to_string()))?;

        let status = response.status();
        if !response.status().is_success() {
            let body = extract_api_error(response).await;
            let classified = match status.as_u16() {
                401 | 403 => ProviderError::Unauthorized,
                404 => ProviderError::NotFound,
                400 => ProviderError::BadRequest(body),
                _ => ProviderError::Other(body),
            };
            error!(model = %self.config.model, status = status.as_u16(), error = %classified, "gemini request failed");
            return Err(classified);
        }

        let payload = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|err| ProviderError::Response(err.to_string()))?;

        normalize_response(payload)
    }

    fn capability(&self) -> ProviderCapability {
        ProviderCapability::SinglePass
    }

    fn provider_tag(&self) -> ProviderTag {
        ProviderTag::Gemini
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiErrorEnvelope {
    error: GeminiApiError,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiApiError {
    code: Option<u16>,
    status: Option<String>,
    message: Option<String>,
}

fn build_request(messages: &[ModelMessage], config: &GeminiModelConfig) -> GenerateContentRequest {
    let flattened = flatten_history(messages);

    GenerateContentRequest {
        contents: vec![GeminiContent {
            role: "user".to_string(),
            parts: vec![GeminiPart { text: flattened }],
        }],
        generation_config: Some(GeminiGenerationConfig {
            temperature: config.temperature,
            top_p: config.top_p,
            max_output_tokens: config.max_output_tokens,
        }),
    }
}

/// Renders the whole conversation into a single text block, in order.
fn flatten_history(messages: &[ModelMessage]) -> String {
    let mut lines = Vec::with_capacity(messages.len());

    for message in messages {
        match message {
            ModelMessage::System(content) => {
                if !content.is_empty() {
                    lines.push(format!("System: {content}"));
                }
            }
            ModelMessage::User(content) => {
                if !content.is_empty() {
                    lines.push(format!("User: {content}"));
                }
            }
            ModelMessage::Assistant { content, .. } => {
                if let Some(text) = content.as_ref().filter(|text| !text.is_empty()) {
                    lines.push(format!("Assistant: {text}"));
                }
            }
            ModelMessage::ToolResult {
                tool_name, content, ..
            } => {
                lines.push(format!("Tool({tool_name}): {content}"));
            }
        }
    }

    if lines.is_empty() {
        " ".to_string()
    } else {
        lines.join("\n\n")
    }
}

fn normalize_response(response: GenerateContentResponse) -> Result<ModelCompletion, ProviderError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(ProviderError::Response(
            "gemini response missing candidates".to_string(),
        ));
    };

    let text = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .map(|part| part.text)
                .collect::<Vec<_>>()
                .join("\n")
        })
        .filter(|text| !text.is_empty());

    let usage = response.usage_metadata.map(|usage| ModelUsage {
        input_tokens: usage.prompt_token_count.unwrap_or(0),
        output_tokens: usage.candidates_token_count.unwrap_or(0),
    });

    Ok(ModelCompletion {
        text,
        thinking: None,
        tool_calls: Vec::new(),
        usage,
    })
}

async fn extract_api_error(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if let Ok(parsed) = serde_json::from_str::<GeminiErrorEnvelope>(&body) {
        let code = parsed.error.code.unwrap_or(status.as_u16());
        let status_name = parsed
            .error
            .status
            .unwrap_or_else(|| status.to_string().to_uppercase());
        let message = parsed
            .error
            .message
            .unwrap_or_else(|| "unknown gemini api error".to_string());
        return format!("gemini api error {code} {status_name}: {message}");
    }

    if body.is_empty() {
        format!("gemini api request failed ({status})")
    } else {
        format!("gemini api request failed ({status}): {body}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemini_is_single_pass() {
        let model = GeminiModel::new(GeminiModelConfig::new("key", "gemini-2.5-flash")).unwrap();
        assert_eq!(model.capability(), ProviderCapability::SinglePass);
    }

    #[test]
    fn flatten_history_renders_every_turn_in_order() {
        let messages = vec![
            ModelMessage::System("be terse".to_string()),
            ModelMessage::User("hello".to_string()),
            ModelMessage::Assistant {
                content: Some("hi there".to_string()),
                tool_calls: Vec::new(),
            },
            ModelMessage::ToolResult {
                tool_call_id: "call_1".to_string(),
                tool_name: "read".to_string(),
                content: "file contents".to_string(),
                is_error: false,
            },
        ];

        let flattened = flatten_history(&messages);
        let lines: Vec<_> = flattened.split("\n\n").collect();

        assert_eq!(lines[0], "System: be terse");
        assert_eq!(lines[1], "User: hello");
        assert_eq!(lines[2], "Assistant: hi there");
        assert_eq!(lines[3], "Tool(read): file contents");
    }

    #[test]
    fn build_request_never_carries_tools() {
        let config = GeminiModelConfig::new("key", "gemini-2.5-flash");
        let request = build_request(&[ModelMessage::User("hi".to_string())], &config);
        assert_eq!(request.contents.len(), 1);
        assert_eq!(request.contents[0].role, "user");
    }

    #[test]
    fn normalize_response_requires_candidates() {
        let err = normalize_response(GenerateContentResponse {
            candidates: Vec::new(),
            usage_metadata: None,
        })
        .expect_err("should fail");

        match err {
            ProviderError::Response(message) => assert!(message.contains("missing candidates")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
