use std::collections::VecDeque;
use std::error::Error;
use std::sync::Mutex;

use async_trait::async_trait;
use crewcode::tools::sandbox::{SandboxPolicy, ToolSandbox};
use crewcode::{
    Agent, AgentEvent, ChatModel, ModelCompletion, ModelMessage, ModelToolCall, ModelToolChoice,
    ModelToolDefinition, ModelUsage, ProviderError, ProviderTag,
};
use futures_util::StreamExt;
use serde_json::json;

/// A scripted model standing in for a real provider so this demo runs with
/// no network access and no API key. Swap in `AnthropicModel::from_env(...)`
/// for a live run.
#[derive(Default)]
struct ScriptedModel {
    responses: Mutex<VecDeque<Result<ModelCompletion, ProviderError>>>,
}

impl ScriptedModel {
    fn new(responses: Vec<Result<ModelCompletion, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::from(responses)),
        }
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn invoke(
        &self,
        _messages: &[ModelMessage],
        _tools: &[ModelToolDefinition],
        _tool_choice: ModelToolChoice,
    ) -> Result<ModelCompletion, ProviderError> {
        let mut guard = self.responses.lock().expect("lock poisoned");
        guard.pop_front().unwrap_or_else(|| {
            Err(ProviderError::Response(
                "scripted model exhausted responses".to_string(),
            ))
        })
    }

    fn provider_tag(&self) -> ProviderTag {
        ProviderTag::Claude
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let sandbox_root = std::env::temp_dir().join("crewcode_single_agent_demo");
    std::fs::create_dir_all(&sandbox_root)?;
    std::fs::write(
        sandbox_root.join("main.rs"),
        "fn main() { println!(\"hello from sandbox\"); }\n",
    )?;

    let sandbox = ToolSandbox::new(SandboxPolicy::safe_mode(&sandbox_root)?);

    let model = ScriptedModel::new(vec![
        Ok(ModelCompletion {
            text: Some("Let me look at the sandbox first.".to_string()),
            thinking: None,
            tool_calls: vec![ModelToolCall {
                id: "call_1".to_string(),
                name: "glob".to_string(),
                arguments: json!({"pattern": "*.rs"}),
            }],
            usage: Some(ModelUsage {
                input_tokens: 120,
                output_tokens: 18,
            }),
        }),
        Ok(ModelCompletion {
            text: Some("Found one file; summarizing now.".to_string()),
            thinking: None,
            tool_calls: vec![],
            usage: Some(ModelUsage {
                input_tokens: 140,
                output_tokens: 24,
            }),
        }),
    ]);

    let mut agent = Agent::builder()
        .model(model)
        .tools(sandbox.tool_specs())
        .system_prompt(format!(
            "You are a coding assistant. Work only inside this sandbox: {}.",
            sandbox_root.display()
        ))
        .build()?;

    let stream = agent.query_stream("List the Rust files in this sandbox.");
    futures_util::pin_mut!(stream);

    while let Some(event) = stream.next().await {
        match event? {
            AgentEvent::Thinking { content } => println!("thinking: {content}"),
            AgentEvent::Text { content } => println!("text: {content}"),
            AgentEvent::ToolCall {
                tool,
                args_json,
                tool_call_id,
            } => println!("tool-call [{tool_call_id}] {tool}: {args_json}"),
            AgentEvent::ToolResult {
                tool,
                result_text,
                tool_call_id,
                is_error,
            } => println!("tool-result [{tool_call_id}] {tool} (error={is_error}): {result_text}"),
            AgentEvent::FinalResponse { content } => println!("\nfinal:\n{content}"),
        }
    }

    for entry in sandbox.log().entries() {
        println!(
            "log: {} ok={} args={}",
            entry.tool, entry.success, entry.args_preview
        );
    }

    let _ = std::fs::remove_dir_all(&sandbox_root);
    Ok(())
}
