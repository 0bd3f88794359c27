mod anthropic;
mod cost;
mod gemini;
mod openai_compat;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ProviderError;
use crate::team::ProviderTag;

pub use anthropic::{AnthropicModel, AnthropicModelConfig};
pub use cost::{CostEstimate, estimate_cost, format_usage_footer};
pub use gemini::{GeminiModel, GeminiModelConfig};
pub use openai_compat::{OpenAiCompatConfig, OpenAiCompatModel};

#[derive(Clone, Debug, PartialEq)]
#[doc(hidden)]
pub enum ModelMessage {
    System(String),
    User(String),
    Assistant {
        content: Option<String>,
        tool_calls: Vec<ModelToolCall>,
    },
    ToolResult {
        tool_call_id: String,
        tool_name: String,
        content: String,
        is_error: bool,
    },
}

#[derive(Clone, Debug, PartialEq)]
#[doc(hidden)]
pub struct ModelToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Clone, Debug)]
#[doc(hidden)]
pub struct ModelToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[doc(hidden)]
pub enum ModelToolChoice {
    Auto,
    Required,
    None,
    Tool(String),
}

#[derive(Clone, Debug, Default, PartialEq)]
#[doc(hidden)]
pub struct ModelCompletion {
    pub text: Option<String>,
    pub thinking: Option<String>,
    pub tool_calls: Vec<ModelToolCall>,
    pub usage: Option<ModelUsage>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[doc(hidden)]
pub struct ModelUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Whether a provider adapter participates in the tool-call loop at all.
///
/// Per spec §4.2: xAI, Anthropic, and Ollama (OpenAI-compatible mode) are
/// tool-capable; Groq and Gemini are single-pass and skip the tool loop
/// entirely, even though Groq's wire dialect is otherwise identical to the
/// other OpenAI-compatible providers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderCapability {
    ToolCapable,
    SinglePass,
}

impl ProviderCapability {
    pub fn is_tool_capable(self) -> bool {
        matches!(self, ProviderCapability::ToolCapable)
    }
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn invoke(
        &self,
        messages: &[ModelMessage],
        tools: &[ModelToolDefinition],
        tool_choice: ModelToolChoice,
    ) -> Result<ModelCompletion, ProviderError>;

    /// Defaults to tool-capable; single-pass adapters (Groq, Gemini)
    /// override this.
    fn capability(&self) -> ProviderCapability {
        ProviderCapability::ToolCapable
    }

    /// Which static cost-table row this adapter's usage accounting uses.
    fn provider_tag(&self) -> ProviderTag;
}
