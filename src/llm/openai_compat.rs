//! Shared adapter for every OpenAI-compatible wire dialect: xAI, Groq, and
//! Ollama's OpenAI-compatible endpoint. The three providers differ only in
//! base URL, auth header, model id, and tool-call capability — everything
//! else (request/response shape) is identical, so one struct serves all
//! three, parameterized by [`OpenAiCompatConfig`].

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::ProviderError;
use crate::llm::{
    ChatModel, ModelCompletion, ModelMessage, ModelToolCall, ModelToolChoice, ModelToolDefinition,
    ModelUsage, ProviderCapability,
};
use crate::team::ProviderTag;
use tracing::{debug, error};

const EMPTY_USER_CONTENT_FALLBACK: &str = " ";

/// Identifies which concrete OpenAI-compatible provider a config targets,
/// since auth header style and capability both hinge on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAiCompatFlavor {
    Xai,
    Groq,
    Ollama,
}

#[derive(Debug, Clone)]
pub struct OpenAiCompatConfig {
    pub flavor: OpenAiCompatFlavor,
    pub api_key: Option<String>,
    pub model: String,
    pub api_base_url: String,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl OpenAiCompatConfig {
    pub fn xai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            flavor: OpenAiCompatFlavor::Xai,
            api_key: Some(api_key.into()),
            model: model.into(),
            api_base_url: "https://api.x.ai/v1".to_string(),
            temperature: None,
            top_p: None,
            max_tokens: Some(4096),
        }
    }

    pub fn groq(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            flavor: OpenAiCompatFlavor::Groq,
            api_key: Some(api_key.into()),
            model: model.into(),
            api_base_url: "https://api.groq.com/openai/v1".to_string(),
            temperature: None,
            top_p: None,
            max_tokens: Some(4096),
        }
    }

    pub fn ollama(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            flavor: OpenAiCompatFlavor::Ollama,
            api_key: None,
            model: model.into(),
            api_base_url: base_url.into(),
            temperature: None,
            top_p: None,
            max_tokens: Some(4096),
        }
    }

    /// Per spec: xAI, Anthropic, and Ollama are tool-capable; Groq is
    /// single-pass despite sharing this exact wire dialect.
    fn capability(&self) -> ProviderCapability {
        match self.flavor {
            OpenAiCompatFlavor::Xai | OpenAiCompatFlavor::Ollama => ProviderCapability::ToolCapable,
            OpenAiCompatFlavor::Groq => ProviderCapability::SinglePass,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiCompatModel {
    client: Client,
    config: OpenAiCompatConfig,
}

impl OpenAiCompatModel {
    pub fn new(config: OpenAiCompatConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .build()
            .map_err(|err| ProviderError::Request(err.to_string()))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.api_base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatModel {
    async fn invoke(
        &self,
        messages: &[ModelMessage],
        tools: &[ModelToolDefinition],
        tool_choice: ModelToolChoice,
    ) -> Result<ModelCompletion, ProviderError> {
        let request = build_request(messages, tools, tool_choice, &self.config);

        let mut builder = self
            .client
            .post(self.endpoint())
            .header("content-type", "application/json");
        if let Some(api_key) = &self.config.api_key {
            builder = builder.header("authorization", format!("Bearer {api_key}"));
        }

        debug!(model = %self.config.model, round_messages = messages.len(), "openai-compat request");

        let response = builder
            .json(&request)
            .send()
            .await
            .map_err(|err| ProviderError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = extract_api_error(response).await;
            let classified = match status.as_u16() {
                401 | 403 => ProviderError::Unauthorized,
                404 => ProviderError::NotFound,
                400 => ProviderError::BadRequest(body),
                _ => ProviderError::Other(body),
            };
            error!(model = %self.config.model, status = status.as_u16(), error = %classified, "openai-compat request failed");
            return Err(classified);
        }

        let payload = response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|err| ProviderError::Response(err.to_string()))?;

        normalize_response(payload)
    }

    fn capability(&self) -> ProviderCapability {
        self.config.capability()
    }

    fn provider_tag(&self) -> ProviderTag {
        match self.config.flavor {
            OpenAiCompatFlavor::Xai => ProviderTag::Grok,
            OpenAiCompatFlavor::Groq => ProviderTag::Groq,
            OpenAiCompatFlavor::Ollama => ProviderTag::Ollama,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<CompatRequestMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<CompatToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<CompatToolChoicePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
enum CompatRequestMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<CompatToolCall>>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

#[derive(Debug, Serialize)]
struct CompatToolDefinition {
    #[serde(rename = "type")]
    type_: String,
    function: CompatToolFunctionDefinition,
}

#[derive(Debug, Serialize)]
struct CompatToolFunctionDefinition {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum CompatToolChoicePayload {
    Mode(String),
    Specific {
        #[serde(rename = "type")]
        type_: String,
        function: CompatToolChoiceFunction,
    },
}

#[derive(Debug, Serialize)]
struct CompatToolChoiceFunction {
    name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct CompatToolCall {
    id: String,
    #[serde(rename = "type")]
    type_: String,
    function: CompatToolCallFunction,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct CompatToolCallFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<CompatChoice>,
    usage: Option<CompatUsage>,
}

#[derive(Debug, Deserialize)]
struct CompatChoice {
    message: Option<CompatAssistantMessage>,
}

#[derive(Debug, Deserialize)]
struct CompatAssistantMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<CompatToolCall>,
}

#[derive(Debug, Deserialize)]
struct CompatUsage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CompatErrorEnvelope {
    error: CompatApiError,
}

#[derive(Debug, Deserialize)]
struct CompatApiError {
    message: Option<String>,
    #[serde(rename = "type")]
    type_: Option<String>,
    code: Option<Value>,
}

fn build_request(
    messages: &[ModelMessage],
    tools: &[ModelToolDefinition],
    tool_choice: ModelToolChoice,
    config: &OpenAiCompatConfig,
) -> ChatCompletionRequest {
    let request_messages = ensure_non_empty_messages(to_compat_messages(messages));

    let (tools_payload, tool_choice_payload) = if tools.is_empty() {
        (None, None)
    } else {
        let tools_payload = tools
            .iter()
            .map(|tool| CompatToolDefinition {
                type_: "function".to_string(),
                function: CompatToolFunctionDefinition {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.parameters.clone(),
                },
            })
            .collect::<Vec<_>>();

        let tool_choice_payload = match tool_choice {
            ModelToolChoice::Auto => CompatToolChoicePayload::Mode("auto".to_string()),
            ModelToolChoice::Required => CompatToolChoicePayload::Mode("required".to_string()),
            ModelToolChoice::None => CompatToolChoicePayload::Mode("none".to_string()),
            ModelToolChoice::Tool(name) => CompatToolChoicePayload::Specific {
                type_: "function".to_string(),
                function: CompatToolChoiceFunction { name },
            },
        };

        (Some(tools_payload), Some(tool_choice_payload))
    };

    ChatCompletionRequest {
        model: config.model.clone(),
        messages: request_messages,
        tools: tools_payload,
        tool_choice: tool_choice_payload,
        temperature: config.temperature,
        top_p: config.top_p,
        max_tokens: config.max_tokens,
    }
}

fn to_compat_messages(messages: &[ModelMessage]) -> Vec<CompatRequestMessage> {
    let mut request_messages = Vec::new();

    for message in messages {
        match message {
            ModelMessage::System(content) => {
                if content.is_empty() {
                    continue;
                }
                request_messages.push(CompatRequestMessage::System {
                    content: content.clone(),
                });
            }
            ModelMessage::User(content) => {
                if content.is_empty() {
                    continue;
                }
                request_messages.push(CompatRequestMessage::User {
                    content: content.clone(),
                });
            }
            ModelMessage::Assistant {
                content,
                tool_calls,
            } => {
                let serialized_tool_calls = tool_calls
                    .iter()
                    .map(|tool_call| CompatToolCall {
                        id: tool_call.id.clone(),
                        type_: "function".to_string(),
                        function: CompatToolCallFunction {
                            name: tool_call.name.clone(),
                            arguments: tool_call.arguments.to_string(),
                        },
                    })
                    .collect::<Vec<_>>();

                let assistant_content = content.as_ref().filter(|text| !text.is_empty()).cloned();
                if assistant_content.is_none() && serialized_tool_calls.is_empty() {
                    continue;
                }

                request_messages.push(CompatRequestMessage::Assistant {
                    content: assistant_content,
                    tool_calls: if serialized_tool_calls.is_empty() {
                        None
                    } else {
                        Some(serialized_tool_calls)
                    },
                });
            }
            ModelMessage::ToolResult {
                tool_call_id,
                tool_name: _,
                content,
                is_error,
            } => {
                let rendered = if *is_error {
                    format!("Error: {content}")
                } else {
                    content.clone()
                };

                request_messages.push(CompatRequestMessage::Tool {
                    tool_call_id: tool_call_id.clone(),
                    content: rendered,
                });
            }
        }
    }

    request_messages
}

fn ensure_non_empty_messages(mut messages: Vec<CompatRequestMessage>) -> Vec<CompatRequestMessage> {
    if messages.is_empty() {
        messages.push(CompatRequestMessage::User {
            content: EMPTY_USER_CONTENT_FALLBACK.to_string(),
        });
    }

    messages
}

fn normalize_response(response: ChatCompletionResponse) -> Result<ModelCompletion, ProviderError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Response("response missing choices".to_string()))?;

    let message = choice
        .message
        .ok_or_else(|| ProviderError::Response("response missing choice message".to_string()))?;

    let mut tool_calls = Vec::new();
    for tool_call in message.tool_calls {
        let arguments = if tool_call.function.arguments.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str::<Value>(&tool_call.function.arguments).map_err(|err| {
                ProviderError::Response(format!(
                    "tool call arguments for '{}' are not valid JSON: {err}",
                    tool_call.function.name
                ))
            })?
        };

        tool_calls.push(ModelToolCall {
            id: tool_call.id,
            name: tool_call.function.name,
            arguments,
        });
    }

    let usage = response.usage.map(|usage| ModelUsage {
        input_tokens: usage.prompt_tokens.unwrap_or(0),
        output_tokens: usage.completion_tokens.unwrap_or(0),
    });

    Ok(ModelCompletion {
        text: message.content.filter(|text| !text.is_empty()),
        thinking: None,
        tool_calls,
        usage,
    })
}

async fn extract_api_error(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if let Ok(parsed) = serde_json::from_str::<CompatErrorEnvelope>(&body) {
        let code = parsed
            .error
            .code
            .map(|value| match value {
                Value::String(value) => value,
                other => other.to_string(),
            })
            .unwrap_or_else(|| status.as_u16().to_string());
        let error_type = parsed
            .error
            .type_
            .unwrap_or_else(|| status.to_string().to_uppercase());
        let message = parsed
            .error
            .message
            .unwrap_or_else(|| "unknown api error".to_string());

        return format!("api error {code} {error_type}: {message}");
    }

    if body.is_empty() {
        format!("api request failed ({status})")
    } else {
        format!("api request failed ({status}): {body}")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn tool_definition() -> ModelToolDefinition {
        ModelToolDefinition {
            name: "lookup".to_string(),
            description: "Look up something".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"}
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        }
    }

    #[test]
    fn groq_flavor_is_single_pass_despite_shared_dialect() {
        let model = OpenAiCompatModel::new(OpenAiCompatConfig::groq("key", "llama-3.3")).unwrap();
        assert_eq!(model.capability(), ProviderCapability::SinglePass);
    }

    #[test]
    fn xai_and_ollama_are_tool_capable() {
        let xai = OpenAiCompatModel::new(OpenAiCompatConfig::xai("key", "grok-4")).unwrap();
        let ollama =
            OpenAiCompatModel::new(OpenAiCompatConfig::ollama("http://localhost:11434", "llama3"))
                .unwrap();
        assert_eq!(xai.capability(), ProviderCapability::ToolCapable);
        assert_eq!(ollama.capability(), ProviderCapability::ToolCapable);
    }

    #[test]
    fn ollama_config_carries_no_api_key() {
        let config = OpenAiCompatConfig::ollama("http://localhost:11434", "llama3");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn build_request_serializes_messages_tools_and_tool_choice() {
        let messages = vec![
            ModelMessage::System("You are helpful".to_string()),
            ModelMessage::User("Find docs".to_string()),
            ModelMessage::Assistant {
                content: Some("Calling tool".to_string()),
                tool_calls: vec![ModelToolCall {
                    id: "call_1".to_string(),
                    name: "lookup".to_string(),
                    arguments: json!({"query": "rust"}),
                }],
            },
            ModelMessage::ToolResult {
                tool_call_id: "call_1".to_string(),
                tool_name: "lookup".to_string(),
                content: "{\"result\":\"ok\"}".to_string(),
                is_error: false,
            },
        ];

        let mut config = OpenAiCompatConfig::xai("key", "grok-4-1-fast-reasoning");
        config.temperature = Some(0.2);
        config.max_tokens = Some(512);

        let request = build_request(
            &messages,
            &[tool_definition()],
            ModelToolChoice::Tool("lookup".to_string()),
            &config,
        );
        let value = serde_json::to_value(request).expect("serializes");

        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][2]["role"], "assistant");
        assert_eq!(
            value["messages"][2]["tool_calls"][0]["function"]["name"],
            "lookup"
        );
        assert_eq!(value["messages"][3]["role"], "tool");
        assert_eq!(value["tool_choice"]["function"]["name"], "lookup");
        assert_eq!(value["max_tokens"], 512);
    }

    #[test]
    fn build_request_adds_fallback_content_for_empty_user_message() {
        let messages = vec![ModelMessage::User(String::new())];
        let config = OpenAiCompatConfig::xai("key", "grok-4");

        let request = build_request(&messages, &[], ModelToolChoice::Auto, &config);
        let value = serde_json::to_value(request).expect("serializes");

        assert_eq!(
            value["messages"].as_array().map(|values| values.len()),
            Some(1)
        );
        assert_eq!(value["messages"][0]["content"], " ");
        assert!(value.get("tools").is_none());
    }

    #[test]
    fn normalize_response_extracts_text_tool_calls_and_usage() {
        let response = ChatCompletionResponse {
            choices: vec![CompatChoice {
                message: Some(CompatAssistantMessage {
                    content: Some("answer".to_string()),
                    tool_calls: vec![CompatToolCall {
                        id: "call_x".to_string(),
                        type_: "function".to_string(),
                        function: CompatToolCallFunction {
                            name: "lookup".to_string(),
                            arguments: "{\"q\":\"rust\"}".to_string(),
                        },
                    }],
                }),
            }],
            usage: Some(CompatUsage {
                prompt_tokens: Some(11),
                completion_tokens: Some(7),
            }),
        };

        let completion = normalize_response(response).expect("response normalizes");

        assert_eq!(completion.text.as_deref(), Some("answer"));
        assert_eq!(completion.tool_calls.len(), 1);
        assert_eq!(completion.tool_calls[0].name, "lookup");
        assert_eq!(
            completion.usage,
            Some(ModelUsage {
                input_tokens: 11,
                output_tokens: 7,
            })
        );
    }

    #[test]
    fn normalize_response_requires_choices() {
        let err = normalize_response(ChatCompletionResponse {
            choices: Vec::new(),
            usage: None,
        })
        .expect_err("should fail");

        match err {
            ProviderError::Response(message) => assert!(message.contains("missing choices")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
