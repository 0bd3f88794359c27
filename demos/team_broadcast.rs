use std::collections::VecDeque;
use std::error::Error;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use crewcode::team::{default_preset, AgentConfig as TeamAgentConfig, Team, TeamChannel};
use crewcode::{
    Agent, ChatModel, ModelCompletion, ModelMessage, ModelToolChoice, ModelToolDefinition,
    ModelUsage, ProviderError, ProviderTag,
};

/// A scripted model that always answers with plain text and no tool calls,
/// so this demo runs the broadcast end to end with no network access.
struct ScriptedModel {
    reply: Mutex<VecDeque<String>>,
}

impl ScriptedModel {
    fn new(replies: Vec<&str>) -> Self {
        Self {
            reply: Mutex::new(replies.into_iter().map(str::to_string).collect()),
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
        let mut guard = self.reply.lock().expect("lock poisoned");
        let text = guard
            .pop_front()
            .unwrap_or_else(|| "(no more scripted replies)".to_string());
        Ok(ModelCompletion {
            text: Some(text),
            thinking: None,
            tool_calls: vec![],
            usage: Some(ModelUsage {
                input_tokens: 80,
                output_tokens: 20,
            }),
        })
    }

    fn provider_tag(&self) -> ProviderTag {
        ProviderTag::Claude
    }
}

/// Builds a real `Agent` for each preset `AgentConfig`, wiring the config's
/// system prompt in but using a scripted model in place of a live provider.
fn build_team(preset: Vec<TeamAgentConfig>, replies: Vec<&'static str>) -> Vec<(TeamAgentConfig, Agent)> {
    preset
        .into_iter()
        .zip(replies)
        .map(|(config, reply)| {
            let mut builder = Agent::builder().model(ScriptedModel::new(vec![reply]));
            if let Some(system_prompt) = &config.system_prompt {
                builder = builder.system_prompt(system_prompt.clone());
            }
            let agent = builder.build().expect("agent builds");
            (config, agent)
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let preset = default_preset();
    let mut agents = build_team(
        preset,
        vec![
            "Plan: add a /health endpoint returning 200 OK; frontend needs no changes.",
            "No frontend changes required for this task.",
            "Added GET /health returning 200 OK with an empty body.",
            "Backend implementation matches the plan; no issues found.",
            "No infrastructure changes needed; endpoint is stateless.",
        ],
    );

    let mut channel = TeamChannel::new();
    let replies = channel
        .broadcast("Add a health-check endpoint to the API.", &mut agents)
        .await?;

    for entry in &replies {
        println!("--- {} ({}) ---\n{}\n", entry.author_name.as_deref().unwrap_or("?"), entry.role, entry.content);
    }

    let mut team = Team::new("demo-team", Utc::now());
    for (config, _agent) in agents {
        team.add_agent(config)?;
    }
    println!("transcript entries: {}", channel.transcript().entries().len());
    println!("team agents: {}", team.agents.len());

    Ok(())
}
