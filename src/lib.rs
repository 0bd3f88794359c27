//! # crewcode
//!
//! **Pure-Rust SDK for a terminal-based multi-agent coding assistant.**
//! One agent loop, explicit tool sandboxing, swappable provider adapters,
//! and a sequential team channel for multi-agent handoff — all with
//! explicit control flow, no hidden planners.
//!
//! ## Why this crate?
//! | Capability | `crewcode` | Typical abstraction-heavy frameworks | Why this helps agents |
//! |---|---|---|---|
//! | Agent core | Explicit loop in [`Agent::query_stream`] / [`Agent::send_message`] | Hidden planners / wrappers | Fewer moving parts, easier debugging |
//! | Action space | User-defined tools via [`ToolSpec`] JSON schema, sandboxed in [`tools::sandbox`] | Fixed or opinionated primitives | Start broad, then restrict by policy |
//! | Completion semantics | Optional explicit `done` via [`ToolOutcome::Done`] + [`AgentBuilder::require_done_tool`] | Implicit stop when no tool calls | Prevents premature "done" |
//! | Provider interface | One trait ([`ChatModel`]) and swappable adapters | Provider-specific runtime behavior | Swap models without rewriting agent logic |
//! | Multi-agent | Sequential [`team::TeamChannel`] with explicit context handoff | Ad-hoc broadcast loops | Predictable ordering, inspectable transcript |
//! | Reliability guards | Retries/backoff + max-iteration/round limits + schema validation + permission gating | Often ad-hoc in app code | Safer autonomous runs |
//!
//! ## Philosophy
//! This crate follows the "small loop, large action space, explicit exit" direction described by Browser Use:
//! - [The Bitter Lesson of Agent Frameworks](https://browser-use.com/posts/bitter-lesson-agent-frameworks)
//! - [browser-use/agent-sdk](https://github.com/browser-use/agent-sdk)
//!
//! In this crate, that maps to:
//! - Tools define capability surface ([`ToolSpec`]), bounded by a sandbox policy.
//! - The run loop is explicit and inspectable via events ([`AgentEvent`]).
//! - Completion can be explicit with `done` mode ([`ToolOutcome::Done`]).
//! - Model adapters stay thin and replaceable ([`ChatModel`], [`AnthropicModel`], [`GeminiModel`], [`OpenAiCompatModel`]).
//! - Dangerous tool calls (`bash`, `write`, `edit`) pass through a [`team::PermissionGateway`].
//!
//! ## Quickstart
//! ```rust,no_run
//! use crewcode::{Agent, AnthropicModel};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let model = AnthropicModel::from_env("claude-sonnet-4-5")?;
//! let mut agent = Agent::builder().model(model).build()?;
//!
//! let answer = agent.query("Summarize the task in one line.").await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Streaming events
//! ```rust,no_run
//! use crewcode::{Agent, AgentEvent, GeminiModel};
//! use futures_util::StreamExt;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let model = GeminiModel::from_env("gemini-2.5-flash")?;
//! let mut agent = Agent::builder().model(model).build()?;
//! let stream = agent.query_stream("Solve this step by step.");
//! futures_util::pin_mut!(stream);
//!
//! while let Some(event) = stream.next().await {
//!     match event? {
//!         AgentEvent::ToolCall { tool, .. } => println!("tool: {tool}"),
//!         AgentEvent::FinalResponse { content } => println!("final: {content}"),
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Sandboxed tools and an explicit `done` signal
//! For autonomous runs against the filesystem and a shell, require an
//! explicit completion signal and bound the tool surface with a sandbox:
//! ```rust,no_run
//! use crewcode::{Agent, AnthropicModel};
//! use crewcode::tools::sandbox::{SandboxPolicy, ToolSandbox};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let model = AnthropicModel::from_env("claude-sonnet-4-5")?;
//! let sandbox = ToolSandbox::new(SandboxPolicy::safe_mode(std::env::current_dir()?));
//!
//! let mut agent = Agent::builder()
//!     .model(model)
//!     .tools(sandbox.tool_specs())
//!     .require_done_tool(true)
//!     .max_iterations(64)
//!     .build()?;
//!
//! let _ = agent.query("Inspect the repo and summarize open risks.").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Multi-agent teams
//! ```rust,no_run
//! use crewcode::team::{default_preset, TeamChannel};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let _agents = default_preset();
//! let mut channel = TeamChannel::new();
//! let _ = channel.transcript();
//! # Ok(())
//! # }
//! ```
//!
//! ## Evidence in this repository
//! - Tool-loop, round/tool-call budgets, and usage footer: `src/agent/tests.rs`
//! - Dependency override behavior for tools: `src/agent/tests.rs`
//! - Tool schema and argument validation: `src/tools/mod.rs`
//! - Sandbox policy, truncation, and path jailing: `src/tools/sandbox.rs`
//! - Provider adapters with the same core interface: `src/llm/`
//! - Team persistence and sequential handoff: `src/team/`

/// Agent loop, config, event stream, and query helpers.
pub mod agent;
/// Process-wide configuration: provider API keys and on-disk base directory.
pub mod config;
/// Error types returned by schema validation, tools, providers, and agent runtime.
pub mod error;
/// Provider abstraction and model adapters.
pub mod llm;
/// Multi-agent teams: persistence, sequential broadcast, and permission gating.
pub mod team;
/// Tool specification, dependency injection, and the sandboxed tool set.
pub mod tools;

/// Agent runtime API.
pub use agent::{
    Agent, AgentBuilder, AgentConfig, AgentEvent, AgentStatus, SendOptions, query, query_stream,
};
/// Process-wide configuration.
pub use config::AppConfig;
/// Error values exposed by the SDK.
pub use error::{AgentError, ProviderError, SandboxError, SchemaError, TeamError, ToolError};
/// Model adapters and model-interface types.
pub use llm::{
    AnthropicModel, AnthropicModelConfig, ChatModel, GeminiModel, GeminiModelConfig,
    ModelCompletion, ModelMessage, ModelToolCall, ModelToolChoice, ModelToolDefinition, ModelUsage,
    OpenAiCompatConfig, OpenAiCompatModel,
};
/// Team persistence, channel, permission, and preset types.
pub use team::{
    default_preset, AutoAllowGateway, ChannelEvent, InteractiveGateway, PermissionGateway,
    ProviderTag, Team, TeamChannel, TeamManager, TranscriptEntry,
};
/// Tool and dependency primitives.
pub use tools::{DependencyMap, ToolOutcome, ToolSpec};
