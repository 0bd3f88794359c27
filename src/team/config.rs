use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

/// Magic string an [`AgentConfig`] carries instead of a real API key when it
/// should fall back to the process-wide config default at load time.
/// Retained verbatim rather than an explicit enum variant: changing it would
/// break existing on-disk team files.
pub const CONFIG_DEFAULT_SENTINEL: &str = "__config__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderTag {
    Grok,
    Groq,
    Gemini,
    Claude,
    Ollama,
}

impl ProviderTag {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderTag::Grok => "grok",
            ProviderTag::Groq => "groq",
            ProviderTag::Gemini => "gemini",
            ProviderTag::Claude => "claude",
            ProviderTag::Ollama => "ollama",
        }
    }
}

/// One team member's persisted profile: provider, model, role, and the
/// system prompt that gives it a distinct personality. This is the
/// serializable record; [`crate::agent::Agent`] is the runtime object bound
/// to a [`crate::llm::ChatModel`] that an `AgentConfig` describes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: String,
    pub name: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    pub provider: ProviderTag,
    pub model: String,
    /// Raw key, the `"__config__"` sentinel, or `None` for providers (like
    /// Ollama) that need none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ollama_base_url: Option<String>,
}

impl AgentConfig {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        role: impl Into<String>,
        provider: ProviderTag,
        model: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: role.into(),
            system_prompt: None,
            provider,
            model: model.into(),
            api_key: Some(CONFIG_DEFAULT_SENTINEL.to_string()),
            ollama_base_url: None,
        }
    }

    /// Resolves the effective API key: the agent's explicit key if it is
    /// set and not the sentinel, else the process-wide config default.
    pub fn resolve_api_key<'a>(&'a self, app_config: &'a AppConfig) -> Option<&'a str> {
        match self.api_key.as_deref() {
            Some(CONFIG_DEFAULT_SENTINEL) | None => app_config.default_api_key(self.provider),
            Some(explicit) => Some(explicit),
        }
    }
}

/// An ordered collection of agents persisted under a single name. Order is
/// the broadcast order and is load-bearing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub agents: Vec<AgentConfig>,
}

impl Team {
    pub fn new(name: impl Into<String>, now: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            name: name.into(),
            created_at: now,
            updated_at: now,
            agents: Vec::new(),
        }
    }

    pub fn add_agent(&mut self, agent: AgentConfig) -> Result<(), crate::error::TeamError> {
        if self.agents.iter().any(|existing| existing.id == agent.id) {
            return Err(crate::error::TeamError::DuplicateAgentId(agent.id));
        }
        self.agents.push(agent);
        Ok(())
    }

    pub fn remove_agent(&mut self, id: &str) -> Result<(), crate::error::TeamError> {
        let before = self.agents.len();
        self.agents.retain(|agent| agent.id != id);
        if self.agents.len() == before {
            return Err(crate::error::TeamError::AgentNotFound(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_api_key_falls_back_to_config_default_for_sentinel() {
        let mut agent = AgentConfig::new("a1", "Ann", "Architect", ProviderTag::Gemini, "gemini-2.5-flash");
        agent.api_key = Some(CONFIG_DEFAULT_SENTINEL.to_string());

        let mut app_config = AppConfig::default();
        app_config.gemini_api_key = Some("from-env".to_string());

        assert_eq!(agent.resolve_api_key(&app_config), Some("from-env"));
    }

    #[test]
    fn resolve_api_key_prefers_explicit_key() {
        let mut agent = AgentConfig::new("a1", "Ann", "Architect", ProviderTag::Gemini, "gemini-2.5-flash");
        agent.api_key = Some("explicit-key".to_string());

        let app_config = AppConfig::default();
        assert_eq!(agent.resolve_api_key(&app_config), Some("explicit-key"));
    }

    #[test]
    fn team_rejects_duplicate_agent_ids() {
        let mut team = Team::new("Squad", chrono::Utc::now());
        team.add_agent(AgentConfig::new("a1", "Ann", "Architect", ProviderTag::Claude, "claude-sonnet-4-5"))
            .unwrap();

        let err = team
            .add_agent(AgentConfig::new("a1", "Bob", "Builder", ProviderTag::Grok, "grok-4"))
            .unwrap_err();

        assert!(matches!(err, crate::error::TeamError::DuplicateAgentId(id) if id == "a1"));
    }
}
