//! Process-wide config default lookup.
//!
//! Reading and writing `~/.{appName}/config.json` itself — and the CLI
//! surface that populates it — are owned by the host application, not this
//! crate (see spec §1, "Out of scope"). What *is* in scope is resolving the
//! `"__config__"` sentinel an [`crate::team::AgentConfig`] can carry for its
//! API key: this module is the minimal, env-backed stand-in for "the
//! process-wide config" that sentinel falls back to.

use std::env;

use crate::team::ProviderTag;

/// Default data directory name under the user's home directory; on-disk
/// team files live at `~/.{app_dir_name}/teams/{safeName}.json`.
pub const APP_DIR_NAME: &str = "crewcode";

const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Provider defaults read once from the environment (§6, "Environment
/// variables consumed").
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub grok_api_key: Option<String>,
    pub groq_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub claude_api_key: Option<String>,
    pub grok_base_url: Option<String>,
    pub ollama_base_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            grok_api_key: env::var("GROK_API_KEY").ok(),
            groq_api_key: env::var("GROQ_API_KEY").ok(),
            gemini_api_key: env::var("GEMINI_API_KEY").ok(),
            claude_api_key: env::var("CLAUDE_API_KEY").ok(),
            grok_base_url: env::var("GROK_BASE_URL").ok(),
            ollama_base_url: env::var("OLLAMA_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OLLAMA_BASE_URL.to_string()),
        }
    }

    /// The default API key for a provider, or `None` if unset.
    pub fn default_api_key(&self, provider: ProviderTag) -> Option<&str> {
        match provider {
            ProviderTag::Grok => self.grok_api_key.as_deref(),
            ProviderTag::Groq => self.groq_api_key.as_deref(),
            ProviderTag::Gemini => self.gemini_api_key.as_deref(),
            ProviderTag::Claude => self.claude_api_key.as_deref(),
            ProviderTag::Ollama => None,
        }
    }

    pub fn base_dir() -> Option<std::path::PathBuf> {
        dirs::home_dir().map(|home| home.join(format!(".{APP_DIR_NAME}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_api_key_reads_matching_provider_field() {
        let config = AppConfig {
            grok_api_key: Some("grok-key".to_string()),
            groq_api_key: None,
            gemini_api_key: Some("gemini-key".to_string()),
            claude_api_key: None,
            grok_base_url: None,
            ollama_base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
        };

        assert_eq!(config.default_api_key(ProviderTag::Grok), Some("grok-key"));
        assert_eq!(config.default_api_key(ProviderTag::Groq), None);
        assert_eq!(
            config.default_api_key(ProviderTag::Gemini),
            Some("gemini-key")
        );
        assert_eq!(config.default_api_key(ProviderTag::Ollama), None);
    }
}
