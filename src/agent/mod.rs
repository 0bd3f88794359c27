use std::collections::HashMap;
use std::sync::Arc;

use async_stream::try_stream;
use futures_util::{Stream, StreamExt};

use crate::error::{AgentError, ToolError};
use crate::llm::{
    ChatModel, ModelCompletion, ModelMessage, ModelToolCall, ModelToolChoice, ModelToolDefinition,
    ModelUsage, estimate_cost, format_usage_footer,
};
use crate::team::permission::{PermissionGateway, is_dangerous_tool};
use crate::tools::{DependencyMap, ToolOutcome, ToolSpec};
use tracing::{error, warn};

/// Appended to a turn's reply when a round or tool-call budget was
/// exhausted before the model stopped asking for tools.
const TOOL_LIMIT_SENTINEL: &str = "[Tool limit: max rounds reached]";

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub require_done_tool: bool,
    pub max_iterations: u32,
    /// Round budget for [`Agent::send_message`]. Distinct from
    /// `max_iterations`, which bounds the lower-level `query`/`query_stream`
    /// engine `send_message` is built on.
    pub max_rounds: u32,
    /// Tool calls allowed per round in `send_message`; combined with
    /// `max_rounds` this caps total tool calls at
    /// `max_rounds * max_tool_calls_per_round`.
    pub max_tool_calls_per_round: u32,
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            require_done_tool: false,
            max_iterations: 24,
            max_rounds: 12,
            max_tool_calls_per_round: 8,
            system_prompt: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    Idle,
    Thinking,
    Tool,
    Error,
}

/// Per-call overrides for [`Agent::send_message`]; a host (team channel,
/// interactive CLI) supplies these instead of reaching into agent internals.
pub struct SendOptions {
    /// Whether this turn reads and extends the agent's own history, or runs
    /// against a one-off prompt. Team broadcasts pass `false` and build the
    /// prompt themselves, since a teammate's prompt is not the raw user
    /// message.
    pub include_history: bool,
    pub on_tool_call: Option<Box<dyn FnMut(&str, &serde_json::Value) + Send>>,
    pub on_tool_result: Option<Box<dyn FnMut(&str, bool) + Send>>,
    /// Consulted only for dangerous tools (`bash`, `write`, `edit`). `None`
    /// allows every call through, matching team-broadcast mode where a
    /// per-call stdin prompt would deadlock.
    pub permission_gateway: Option<Arc<dyn PermissionGateway>>,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            include_history: true,
            on_tool_call: None,
            on_tool_result: None,
            permission_gateway: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    Thinking {
        content: String,
    },
    Text {
        content: String,
    },
    ToolCall {
        tool: String,
        args_json: serde_json::Value,
        tool_call_id: String,
    },
    ToolResult {
        tool: String,
        result_text: String,
        tool_call_id: String,
        is_error: bool,
    },
    FinalResponse {
        content: String,
    },
}

pub struct AgentBuilder {
    model: Option<Arc<dyn ChatModel>>,
    tools: Vec<ToolSpec>,
    config: AgentConfig,
    dependencies: DependencyMap,
    dependency_overrides: DependencyMap,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self {
            model: None,
            tools: Vec::new(),
            config: AgentConfig::default(),
            dependencies: DependencyMap::new(),
            dependency_overrides: DependencyMap::new(),
        }
    }
}

impl AgentBuilder {
    pub fn model<M>(mut self, model: M) -> Self
    where
        M: ChatModel + 'static,
    {
        self.model = Some(Arc::new(model));
        self
    }

    pub fn tool(mut self, tool: ToolSpec) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn require_done_tool(mut self, require_done_tool: bool) -> Self {
        self.config.require_done_tool = require_done_tool;
        self
    }

    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    pub fn max_rounds(mut self, max_rounds: u32) -> Self {
        self.config.max_rounds = max_rounds;
        self
    }

    pub fn max_tool_calls_per_round(mut self, max_tool_calls_per_round: u32) -> Self {
        self.config.max_tool_calls_per_round = max_tool_calls_per_round;
        self
    }

    pub fn dependency<T>(self, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        self.dependencies.insert(value);
        self
    }

    pub fn dependency_named<T>(self, key: impl Into<String>, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        self.dependencies.insert_named(key, value);
        self
    }

    pub fn dependency_override<T>(self, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        self.dependency_overrides.insert(value);
        self
    }

    pub fn dependency_override_named<T>(self, key: impl Into<String>, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        self.dependency_overrides.insert_named(key, value);
        self
    }

    pub fn build(self) -> Result<Agent, AgentError> {
        let Some(model) = self.model else {
            return Err(AgentError::Config(
                "agent model must be configured via AgentBuilder::model(...)".to_string(),
            ));
        };

        let mut tool_map = HashMap::new();
        for tool in &self.tools {
            if tool_map
                .insert(tool.name().to_string(), tool.clone())
                .is_some()
            {
                return Err(AgentError::Config(format!(
                    "duplicate tool registered: {}",
                    tool.name()
                )));
            }
        }

        Ok(Agent {
            model,
            tools: self.tools,
            tool_map,
            config: self.config,
            dependencies: self.dependencies,
            dependency_overrides: self.dependency_overrides,
            history: Vec::new(),
            status: AgentStatus::Idle,
        })
    }
}

pub struct Agent {
    model: Arc<dyn ChatModel>,
    tools: Vec<ToolSpec>,
    tool_map: HashMap<String, ToolSpec>,
    config: AgentConfig,
    dependencies: DependencyMap,
    dependency_overrides: DependencyMap,
    history: Vec<ModelMessage>,
    status: AgentStatus,
}

impl Agent {
    pub fn builder() -> AgentBuilder {
        AgentBuilder::default()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn messages_len(&self) -> usize {
        self.history.len()
    }

    pub fn status(&self) -> AgentStatus {
        self.status
    }

    pub async fn query(&mut self, user_message: impl Into<String>) -> Result<String, AgentError> {
        let stream = self.query_stream(user_message);
        futures_util::pin_mut!(stream);

        let mut final_response: Option<String> = None;

        while let Some(event) = stream.next().await {
            match event? {
                AgentEvent::FinalResponse { content } => final_response = Some(content),
                AgentEvent::Thinking { .. }
                | AgentEvent::Text { .. }
                | AgentEvent::ToolCall { .. }
                | AgentEvent::ToolResult { .. } => {}
            }
        }

        final_response.ok_or(AgentError::MissingFinalResponse)
    }

    pub fn query_stream(
        &mut self,
        user_message: impl Into<String>,
    ) -> impl Stream<Item = Result<AgentEvent, AgentError>> + '_ {
        let user_message = user_message.into();

        try_stream! {
            if self.history.is_empty() {
                if let Some(system_prompt) = &self.config.system_prompt {
                    self.history
                        .push(ModelMessage::System(system_prompt.clone()));
                }
            }

            self.history.push(ModelMessage::User(user_message));

            let tool_definitions = self
                .tools
                .iter()
                .map(|tool| ModelToolDefinition {
                    name: tool.name().to_string(),
                    description: tool.description().to_string(),
                    parameters: tool.json_schema().clone(),
                })
                .collect::<Vec<_>>();

            let tool_choice = if tool_definitions.is_empty() {
                ModelToolChoice::None
            } else {
                ModelToolChoice::Auto
            };

            for _ in 0..self.config.max_iterations {
                let completion = self
                    .model
                    .invoke(&self.history, &tool_definitions, tool_choice.clone())
                    .await?;

                if let Some(thinking) = completion.thinking.clone() {
                    yield AgentEvent::Thinking { content: thinking };
                }

                self.append_assistant_message(&completion);

                if let Some(text) = completion.text.clone() {
                    if !text.is_empty() {
                        yield AgentEvent::Text {
                            content: text.clone(),
                        };
                    }
                }

                if completion.tool_calls.is_empty() {
                    if !self.config.require_done_tool {
                        let final_content = completion.text.unwrap_or_default();
                        yield AgentEvent::FinalResponse {
                            content: final_content,
                        };
                        return;
                    }
                    continue;
                }

                for tool_call in completion.tool_calls {
                    yield AgentEvent::ToolCall {
                        tool: tool_call.name.clone(),
                        args_json: tool_call.arguments.clone(),
                        tool_call_id: tool_call.id.clone(),
                    };

                    let execution = self.execute_tool_call(&tool_call).await;
                    self.history.push(ModelMessage::ToolResult {
                        tool_call_id: tool_call.id.clone(),
                        tool_name: tool_call.name.clone(),
                        content: execution.result_text.clone(),
                        is_error: execution.is_error,
                    });

                    yield AgentEvent::ToolResult {
                        tool: tool_call.name.clone(),
                        result_text: execution.result_text.clone(),
                        tool_call_id: tool_call.id.clone(),
                        is_error: execution.is_error,
                    };

                    if let Some(done_message) = execution.done_message {
                        yield AgentEvent::FinalResponse {
                            content: done_message,
                        };
                        return;
                    }
                }
            }

            Err::<(), AgentError>(AgentError::MaxIterationsReached {
                max_iterations: self.config.max_iterations,
            })?;
        }
    }

    /// Host-facing single-turn entry point: runs a bounded tool loop,
    /// gates dangerous tool calls through `options.permission_gateway`,
    /// and appends the usage/cost footer to the returned text.
    ///
    /// Unlike `query`, this never errors out when a round or tool-call
    /// budget is exhausted — it returns whatever text accumulated so far
    /// with [`TOOL_LIMIT_SENTINEL`] appended, since a team broadcast or
    /// interactive session should still see a reply.
    pub async fn send_message(
        &mut self,
        text: impl Into<String>,
        mut options: SendOptions,
    ) -> Result<String, AgentError> {
        let text = text.into();
        self.status = AgentStatus::Thinking;

        let mut working: Vec<ModelMessage> = if options.include_history {
            self.history.clone()
        } else {
            Vec::new()
        };

        if working.is_empty() {
            if let Some(system_prompt) = &self.config.system_prompt {
                working.push(ModelMessage::System(system_prompt.clone()));
            }
        }

        working.push(ModelMessage::User(text));

        let tool_definitions = self
            .tools
            .iter()
            .map(|tool| ModelToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.json_schema().clone(),
            })
            .collect::<Vec<_>>();

        let tool_choice = if tool_definitions.is_empty() {
            ModelToolChoice::None
        } else {
            ModelToolChoice::Auto
        };

        let ceiling = self
            .config
            .max_rounds
            .saturating_mul(self.config.max_tool_calls_per_round);

        let mut accumulated_text = String::new();
        let mut last_usage: Option<ModelUsage> = None;
        let mut total_tool_calls: u32 = 0;
        let mut hit_limit = false;
        let mut round_index: u32 = 0;

        let outcome: Result<(), AgentError> = 'rounds: loop {
            let completion = match self
                .model
                .invoke(&working, &tool_definitions, tool_choice.clone())
                .await
            {
                Ok(completion) => completion,
                Err(err) => {
                    self.status = AgentStatus::Error;
                    break 'rounds Err(err.into());
                }
            };

            if let Some(usage) = completion.usage {
                last_usage = Some(usage);
            }

            working.push(ModelMessage::Assistant {
                content: completion.text.clone(),
                tool_calls: completion.tool_calls.clone(),
            });

            if let Some(chunk) = completion.text.as_ref().filter(|text| !text.is_empty()) {
                if !accumulated_text.is_empty() {
                    accumulated_text.push_str("\n\n");
                }
                accumulated_text.push_str(chunk);
            }

            if completion.tool_calls.is_empty() || !self.model.capability().is_tool_capable() {
                break 'rounds Ok(());
            }

            self.status = AgentStatus::Tool;

            for tool_call in &completion.tool_calls {
                if let Some(callback) = options.on_tool_call.as_mut() {
                    callback(&tool_call.name, &tool_call.arguments);
                }

                let (result_text, is_error, done_message) = if is_dangerous_tool(&tool_call.name)
                    && !self
                        .allow_dangerous_call(&options, &tool_call.name, &tool_call.arguments)
                        .await
                {
                    warn!(tool = %tool_call.name, "tool call denied by permission gateway");
                    (
                        format!("Denied: permission not granted for '{}'.", tool_call.name),
                        true,
                        None,
                    )
                } else {
                    let execution = self.execute_tool_call(tool_call).await;
                    (
                        execution.result_text,
                        execution.is_error,
                        execution.done_message,
                    )
                };

                working.push(ModelMessage::ToolResult {
                    tool_call_id: tool_call.id.clone(),
                    tool_name: tool_call.name.clone(),
                    content: result_text.clone(),
                    is_error,
                });

                if let Some(callback) = options.on_tool_result.as_mut() {
                    callback(&tool_call.name, !is_error);
                }

                total_tool_calls += 1;

                if let Some(done_message) = done_message {
                    accumulated_text = done_message;
                    break 'rounds Ok(());
                }

                if total_tool_calls >= ceiling {
                    hit_limit = true;
                    break 'rounds Ok(());
                }
            }

            self.status = AgentStatus::Thinking;
            round_index += 1;

            if round_index >= self.config.max_rounds {
                hit_limit = true;
                break 'rounds Ok(());
            }
        };

        outcome?;

        if hit_limit {
            accumulated_text.push_str("\n\n");
            accumulated_text.push_str(TOOL_LIMIT_SENTINEL);
        }

        if let Some(usage) = last_usage {
            let estimate = estimate_cost(self.model.provider_tag(), usage);
            accumulated_text.push_str(&format_usage_footer(estimate));
        }

        if options.include_history {
            self.history = working;
        }

        self.status = AgentStatus::Idle;
        Ok(accumulated_text)
    }

    async fn allow_dangerous_call(
        &self,
        options: &SendOptions,
        tool_name: &str,
        arguments: &serde_json::Value,
    ) -> bool {
        match &options.permission_gateway {
            Some(gateway) => gateway.allow(tool_name, &arguments.to_string()).await,
            None => true,
        }
    }

    fn append_assistant_message(&mut self, completion: &ModelCompletion) {
        self.history.push(ModelMessage::Assistant {
            content: completion.text.clone(),
            tool_calls: completion.tool_calls.clone(),
        });
    }

    async fn execute_tool_call(&self, tool_call: &ModelToolCall) -> ToolExecutionResult {
        let Some(tool) = self.tool_map.get(&tool_call.name) else {
            return ToolExecutionResult {
                result_text: format!("Unknown tool '{}'.", tool_call.name),
                is_error: true,
                done_message: None,
            };
        };

        let runtime_dependencies = self.dependencies.merged_with(&self.dependency_overrides);

        match tool
            .execute(tool_call.arguments.clone(), &runtime_dependencies)
            .await
        {
            Ok(ToolOutcome::Text(text)) => ToolExecutionResult {
                result_text: text,
                is_error: false,
                done_message: None,
            },
            Ok(ToolOutcome::Done(message)) => ToolExecutionResult {
                result_text: format!("Task completed: {message}"),
                is_error: false,
                done_message: Some(message),
            },
            Err(err) => {
                error!(tool = %tool_call.name, error = %err, "tool execution failed");
                ToolExecutionResult {
                    result_text: format_tool_error(err),
                    is_error: true,
                    done_message: None,
                }
            }
        }
    }
}

fn format_tool_error(err: ToolError) -> String {
    err.to_string()
}

struct ToolExecutionResult {
    result_text: String,
    is_error: bool,
    done_message: Option<String>,
}

pub async fn query(
    agent: &mut Agent,
    user_message: impl Into<String>,
) -> Result<String, AgentError> {
    agent.query(user_message).await
}

pub fn query_stream(
    agent: &mut Agent,
    user_message: impl Into<String>,
) -> impl Stream<Item = Result<AgentEvent, AgentError>> + '_ {
    agent.query_stream(user_message)
}
