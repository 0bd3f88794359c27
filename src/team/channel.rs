//! Sequential broadcast of one user turn to an ordered team, with explicit
//! context handoff: agent i's prompt contains the user message plus every
//! reply before it, never a reply that comes after.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::agent::{Agent, SendOptions};
use crate::error::AgentError;
use crate::team::config::AgentConfig;

/// How many trailing transcript entries are ever rendered into a prompt.
/// Fixed per spec; older context is silently elided.
pub const TRANSCRIPT_PROMPT_CAP: usize = 50;

/// One entry in the shared transcript. `author_id = None` marks the user,
/// whose `role` is the literal `"user"`; an agent's `role` is its job role
/// (e.g. `"Architect"`), not a message-kind tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptEntry {
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Grows monotonically for the life of a session; cleared only by an
/// explicit reset. Not owned by any one team — a host can run several teams
/// against the same transcript if it chooses to, though in practice one
/// transcript tracks one team.
#[derive(Debug, Clone, Default)]
pub struct SharedTranscript {
    entries: Vec<TranscriptEntry>,
}

impl SharedTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn push(&mut self, entry: TranscriptEntry) {
        self.entries.push(entry);
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }
}

/// Events the channel emits as it works through a broadcast. The core does
/// not depend on any subscriber; hosts that want UI updates implement
/// [`ChannelEventSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    AgentThinking {
        agent_id: String,
    },
    AgentToolCall {
        agent_id: String,
        tool: String,
        args_json: serde_json::Value,
    },
    AgentToolResult {
        agent_id: String,
        tool: String,
        ok: bool,
    },
    AgentResponded {
        agent_id: String,
        reply: String,
    },
    AgentError {
        agent_id: String,
        error: String,
    },
}

/// UI fan-out sink. Every method has a no-op default; implement only what
/// you need. A single subscriber is the typical case.
pub trait ChannelEventSink: Send + Sync {
    fn on_event(&self, _event: &ChannelEvent) {}
}

/// Drops every event. The default when no host sink is wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ChannelEventSink for NoopSink {}

/// A tool call/result recorded by `SendOptions`' callbacks during one
/// `send_message`, queued until the call returns since the callbacks can't
/// hold a borrow of `self.sink` across the `.await`.
enum PendingEvent {
    ToolCall {
        tool: String,
        args_json: serde_json::Value,
    },
    ToolResult {
        tool: String,
        ok: bool,
    },
}

pub struct TeamChannel<S: ChannelEventSink = NoopSink> {
    transcript: SharedTranscript,
    sink: S,
}

impl TeamChannel<NoopSink> {
    pub fn new() -> Self {
        Self {
            transcript: SharedTranscript::new(),
            sink: NoopSink,
        }
    }
}

impl Default for TeamChannel<NoopSink> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ChannelEventSink> TeamChannel<S> {
    pub fn with_sink(sink: S) -> Self {
        Self {
            transcript: SharedTranscript::new(),
            sink,
        }
    }

    pub fn transcript(&self) -> &SharedTranscript {
        &self.transcript
    }

    pub fn reset(&mut self) {
        self.transcript.reset();
    }

    /// Broadcasts `message` to every `(AgentConfig, Agent)` pair in order,
    /// strictly sequentially. Per-agent failures are recorded as an "Error:"
    /// transcript entry and do not abort the broadcast.
    pub async fn broadcast(
        &mut self,
        message: &str,
        agents: &mut [(AgentConfig, Agent)],
    ) -> Result<Vec<TranscriptEntry>, AgentError> {
        if agents.is_empty() {
            return Err(AgentError::Team(crate::error::TeamError::EmptyTeam));
        }

        info!(agent_count = agents.len(), "team broadcast starting");

        self.transcript.push(TranscriptEntry {
            author_id: None,
            author_name: None,
            role: "user".to_string(),
            content: message.to_string(),
            timestamp: now(),
        });

        let mut this_turn_replies: Vec<TranscriptEntry> = Vec::with_capacity(agents.len());

        for (index, (config, agent)) in agents.iter_mut().enumerate() {
            self.sink.on_event(&ChannelEvent::AgentThinking {
                agent_id: config.id.clone(),
            });

            let prompt = build_agent_prompt(message, config, index, self.transcript.entries());

            let pending: Arc<Mutex<Vec<PendingEvent>>> = Arc::new(Mutex::new(Vec::new()));

            let options = SendOptions {
                include_history: false,
                on_tool_call: Some(Box::new({
                    let pending = pending.clone();
                    move |tool: &str, args: &serde_json::Value| {
                        pending
                            .lock()
                            .expect("pending channel events lock poisoned")
                            .push(PendingEvent::ToolCall {
                                tool: tool.to_string(),
                                args_json: args.clone(),
                            });
                    }
                })),
                on_tool_result: Some(Box::new({
                    let pending = pending.clone();
                    move |tool: &str, ok: bool| {
                        pending
                            .lock()
                            .expect("pending channel events lock poisoned")
                            .push(PendingEvent::ToolResult {
                                tool: tool.to_string(),
                                ok,
                            });
                    }
                })),
                ..SendOptions::default()
            };

            let result = agent.send_message(prompt, options).await;

            for event in pending
                .lock()
                .expect("pending channel events lock poisoned")
                .drain(..)
            {
                match event {
                    PendingEvent::ToolCall { tool, args_json } => {
                        self.sink.on_event(&ChannelEvent::AgentToolCall {
                            agent_id: config.id.clone(),
                            tool,
                            args_json,
                        });
                    }
                    PendingEvent::ToolResult { tool, ok } => {
                        self.sink.on_event(&ChannelEvent::AgentToolResult {
                            agent_id: config.id.clone(),
                            tool,
                            ok,
                        });
                    }
                }
            }

            let entry = match result {
                Ok(reply) => {
                    self.sink.on_event(&ChannelEvent::AgentResponded {
                        agent_id: config.id.clone(),
                        reply: reply.clone(),
                    });
                    TranscriptEntry {
                        author_id: Some(config.id.clone()),
                        author_name: Some(config.name.clone()),
                        role: config.role.clone(),
                        content: reply,
                        timestamp: now(),
                    }
                }
                Err(err) => {
                    warn!(agent_id = %config.id, error = %err, "agent failed during broadcast");
                    self.sink.on_event(&ChannelEvent::AgentError {
                        agent_id: config.id.clone(),
                        error: err.to_string(),
                    });
                    TranscriptEntry {
                        author_id: Some(config.id.clone()),
                        author_name: Some(config.name.clone()),
                        role: config.role.clone(),
                        content: format!("Error: {err}"),
                        timestamp: now(),
                    }
                }
            };

            self.transcript.push(entry.clone());
            this_turn_replies.push(entry);
        }

        info!("team broadcast finished");
        Ok(this_turn_replies)
    }
}

fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Builds the three-section per-agent prompt: the user request, prior
/// teammate replies (omitted for the first agent), and the assignment.
///
/// The teammate section is built from the last `TRANSCRIPT_PROMPT_CAP`
/// agent entries of the shared transcript, not just this turn's replies —
/// the K-cap window spans the transcript's whole history, per the
/// transcript's own "grows monotonically" contract. `transcript` is read
/// before this agent's own reply exists, so it never contains a later entry.
fn build_agent_prompt(
    message: &str,
    config: &AgentConfig,
    index: usize,
    transcript: &[TranscriptEntry],
) -> String {
    let mut sections = Vec::new();

    sections.push(format!("== USER REQUEST ==\n{message}"));

    if index > 0 {
        let teammate_entries = transcript
            .iter()
            .filter(|entry| entry.author_id.is_some())
            .collect::<Vec<_>>();
        let capped_start = teammate_entries.len().saturating_sub(TRANSCRIPT_PROMPT_CAP);
        let teammates = teammate_entries[capped_start..]
            .iter()
            .map(|entry| {
                let name = entry.author_name.as_deref().unwrap_or("teammate");
                format!("--- {name} ({}) ---\n{}", entry.role, entry.content)
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        sections.push(format!("== TEAMMATE RESPONSES ==\n{teammates}"));
    }

    let assignment = if index == 0 {
        format!(
            "== YOUR ASSIGNMENT ==\nYou are {} ({}). You go first: produce a detailed plan. \
             Use your available tools as needed.",
            config.name, config.role
        )
    } else {
        format!(
            "== YOUR ASSIGNMENT ==\nYou are {} ({}). Teammates above have already responded; \
             build on their work, do not repeat it. Use your available tools as needed.",
            config.name, config.role
        )
    };
    sections.push(assignment);

    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::team::config::ProviderTag;

    fn agent_config(id: &str, name: &str, role: &str) -> AgentConfig {
        AgentConfig::new(id, name, role, ProviderTag::Claude, "claude-sonnet-4-5")
    }

    #[test]
    fn first_agent_prompt_omits_teammate_section() {
        let config = agent_config("a1", "Planner", "Architect");
        let prompt = build_agent_prompt("add endpoint /health", &config, 0, &[]);
        assert!(prompt.contains("== USER REQUEST =="));
        assert!(!prompt.contains("== TEAMMATE RESPONSES =="));
        assert!(prompt.contains("you go first"));
    }

    #[test]
    fn later_agent_prompt_includes_only_prior_replies() {
        let planner_reply = TranscriptEntry {
            author_id: Some("a1".to_string()),
            author_name: Some("Planner".to_string()),
            role: "Architect".to_string(),
            content: "plan P".to_string(),
            timestamp: now(),
        };

        let builder_config = agent_config("a2", "Builder", "Backend");
        let prompt =
            build_agent_prompt("add endpoint /health", &builder_config, 1, &[planner_reply]);

        assert!(prompt.contains("== TEAMMATE RESPONSES =="));
        assert!(prompt.contains("--- Planner (Architect) ---"));
        assert!(prompt.contains("plan P"));
        assert!(prompt.contains("build on their work"));
    }

    #[test]
    fn prompt_caps_teammate_section_to_last_k_entries() {
        let config = agent_config("a3", "Reviewer", "Reviewer");
        let mut replies = Vec::new();
        for i in 0..(TRANSCRIPT_PROMPT_CAP + 5) {
            replies.push(TranscriptEntry {
                author_id: Some(format!("a{i}")),
                author_name: Some(format!("Agent{i}")),
                role: "Backend".to_string(),
                content: format!("reply {i}"),
                timestamp: now(),
            });
        }

        let prompt = build_agent_prompt("task", &config, 2, &replies);
        assert!(!prompt.contains("Agent0 (Backend)"));
        assert!(prompt.contains(&format!("reply {}", TRANSCRIPT_PROMPT_CAP + 4)));
    }

    #[tokio::test]
    async fn second_broadcast_turn_carries_first_turns_replies_into_the_prompt() {
        use crate::error::ProviderError;
        use crate::llm::{
            ChatModel, ModelCompletion, ModelMessage, ModelToolChoice, ModelToolDefinition,
            ModelUsage,
        };
        use async_trait::async_trait;
        use std::collections::VecDeque;

        struct RecordingModel {
            replies: Mutex<VecDeque<String>>,
            last_user_message: Arc<Mutex<Option<String>>>,
        }

        #[async_trait]
        impl ChatModel for RecordingModel {
            async fn invoke(
                &self,
                messages: &[ModelMessage],
                _tools: &[ModelToolDefinition],
                _tool_choice: ModelToolChoice,
            ) -> Result<ModelCompletion, ProviderError> {
                if let Some(ModelMessage::User(text)) = messages.last() {
                    *self.last_user_message.lock().expect("lock poisoned") = Some(text.clone());
                }
                let reply = self
                    .replies
                    .lock()
                    .expect("lock poisoned")
                    .pop_front()
                    .expect("scripted reply available");
                Ok(ModelCompletion {
                    text: Some(reply),
                    thinking: None,
                    tool_calls: vec![],
                    usage: Some(ModelUsage {
                        input_tokens: 1,
                        output_tokens: 1,
                    }),
                })
            }

            fn provider_tag(&self) -> ProviderTag {
                ProviderTag::Claude
            }
        }

        let agent1_captured = Arc::new(Mutex::new(None));
        let agent1 = Agent::builder()
            .model(RecordingModel {
                replies: Mutex::new(VecDeque::from(vec![
                    "reply1-turn1".to_string(),
                    "reply1-turn2".to_string(),
                ])),
                last_user_message: agent1_captured.clone(),
            })
            .build()
            .expect("agent builds");

        let agent2_captured = Arc::new(Mutex::new(None));
        let agent2 = Agent::builder()
            .model(RecordingModel {
                replies: Mutex::new(VecDeque::from(vec![
                    "reply2-turn1".to_string(),
                    "reply2-turn2".to_string(),
                ])),
                last_user_message: agent2_captured.clone(),
            })
            .build()
            .expect("agent builds");

        let mut agents = vec![
            (agent_config("a1", "Planner", "Architect"), agent1),
            (agent_config("a2", "Builder", "Backend"), agent2),
        ];

        let mut channel = TeamChannel::new();
        channel
            .broadcast("first request", &mut agents)
            .await
            .expect("first broadcast succeeds");
        channel
            .broadcast("second request", &mut agents)
            .await
            .expect("second broadcast succeeds");

        let prompt = agent2_captured
            .lock()
            .expect("lock poisoned")
            .clone()
            .expect("agent2 received a prompt");

        assert!(prompt.contains("reply1-turn1"));
        assert!(prompt.contains("reply2-turn1"));
        assert!(prompt.contains("reply1-turn2"));
    }

    #[tokio::test]
    async fn broadcast_forwards_tool_call_and_tool_result_events() {
        use crate::error::ProviderError;
        use crate::llm::{
            ChatModel, ModelCompletion, ModelMessage, ModelToolCall, ModelToolChoice,
            ModelToolDefinition, ModelUsage,
        };
        use crate::tools::{ToolOutcome, ToolSpec};
        use async_trait::async_trait;
        use serde_json::json;
        use std::collections::VecDeque;

        struct ScriptedToolModel {
            responses: Mutex<VecDeque<ModelCompletion>>,
        }

        #[async_trait]
        impl ChatModel for ScriptedToolModel {
            async fn invoke(
                &self,
                _messages: &[ModelMessage],
                _tools: &[ModelToolDefinition],
                _tool_choice: ModelToolChoice,
            ) -> Result<ModelCompletion, ProviderError> {
                Ok(self
                    .responses
                    .lock()
                    .expect("lock poisoned")
                    .pop_front()
                    .expect("scripted response available"))
            }

            fn provider_tag(&self) -> ProviderTag {
                ProviderTag::Claude
            }
        }

        let model = ScriptedToolModel {
            responses: Mutex::new(VecDeque::from(vec![
                ModelCompletion {
                    text: None,
                    thinking: None,
                    tool_calls: vec![ModelToolCall {
                        id: "call_1".to_string(),
                        name: "noop".to_string(),
                        arguments: json!({}),
                    }],
                    usage: Some(ModelUsage {
                        input_tokens: 5,
                        output_tokens: 1,
                    }),
                },
                ModelCompletion {
                    text: Some("done".to_string()),
                    thinking: None,
                    tool_calls: vec![],
                    usage: Some(ModelUsage {
                        input_tokens: 5,
                        output_tokens: 1,
                    }),
                },
            ])),
        };

        let noop_tool = ToolSpec::new("noop", "does nothing")
            .with_handler(|_args, _deps| async move { Ok(ToolOutcome::Text("ok".to_string())) });

        let agent = Agent::builder()
            .model(model)
            .tool(noop_tool)
            .build()
            .expect("agent builds");

        #[derive(Default)]
        struct CapturingSink {
            events: Mutex<Vec<ChannelEvent>>,
        }

        impl ChannelEventSink for CapturingSink {
            fn on_event(&self, event: &ChannelEvent) {
                self.events
                    .lock()
                    .expect("lock poisoned")
                    .push(event.clone());
            }
        }

        let mut channel = TeamChannel::with_sink(CapturingSink::default());
        let mut agents = vec![(agent_config("a1", "Solo", "Architect"), agent)];

        channel
            .broadcast("do the thing", &mut agents)
            .await
            .expect("broadcast succeeds");

        let events = channel.sink.events.lock().expect("lock poisoned");
        assert!(events.iter().any(|event| matches!(
            event,
            ChannelEvent::AgentToolCall { tool, .. } if tool == "noop"
        )));
        assert!(events.iter().any(|event| matches!(
            event,
            ChannelEvent::AgentToolResult { tool, ok: true, .. } if tool == "noop"
        )));
    }
}
