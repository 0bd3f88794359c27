//! Creates, serializes, loads, and deletes named teams under
//! `~/.{appName}/teams/{safeName}.json`.

use std::path::{Path, PathBuf};

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::TeamError;
use crate::team::config::{AgentConfig, CONFIG_DEFAULT_SENTINEL, Team};
use tracing::info;

/// `s/[^A-Za-z0-9_-]/_/g`, applied to a team name to produce its filename.
pub fn safe_name(name: &str) -> String {
    let pattern = Regex::new(r"[^A-Za-z0-9_-]").expect("static regex is valid");
    pattern.replace_all(name, "_").into_owned()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TeamFile {
    name: String,
    #[serde(rename = "createdAt")]
    created_at: chrono::DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    updated_at: chrono::DateTime<Utc>,
    agents: Vec<AgentConfig>,
}

impl From<&Team> for TeamFile {
    fn from(team: &Team) -> Self {
        Self {
            name: team.name.clone(),
            created_at: team.created_at,
            updated_at: team.updated_at,
            agents: team.agents.clone(),
        }
    }
}

impl From<TeamFile> for Team {
    fn from(file: TeamFile) -> Self {
        let agents = file
            .agents
            .into_iter()
            .map(|mut agent| {
                // The sentinel deserializes to "no explicit key"; resolution
                // falls back to the process-wide config either way, but this
                // keeps `agent.api_key` meaning "an explicit key, if any".
                if agent.api_key.as_deref() == Some(CONFIG_DEFAULT_SENTINEL) {
                    agent.api_key = None;
                }
                agent
            })
            .collect();

        Team {
            name: file.name,
            created_at: file.created_at,
            updated_at: file.updated_at,
            agents,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TeamSummary {
    pub name: String,
    pub agent_count: usize,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

pub struct TeamManager {
    teams_dir: PathBuf,
    current_team: Option<String>,
}

impl TeamManager {
    pub fn new(teams_dir: impl Into<PathBuf>) -> Self {
        Self {
            teams_dir: teams_dir.into(),
            current_team: None,
        }
    }

    /// Builds a manager rooted at `~/.{appName}/teams`, per
    /// [`crate::config::AppConfig::base_dir`].
    pub fn from_app_config() -> Result<Self, TeamError> {
        let base = AppConfig::base_dir()
            .ok_or_else(|| TeamError::Io("could not resolve home directory".to_string()))?;
        Ok(Self::new(base.join("teams")))
    }

    pub fn current_team(&self) -> Option<&str> {
        self.current_team.as_deref()
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.teams_dir.join(format!("{}.json", safe_name(name)))
    }

    pub fn create(&mut self, name: impl Into<String>) -> Team {
        let name = name.into();
        let team = Team::new(name.clone(), Utc::now());
        self.current_team = Some(name);
        team
    }

    pub fn add_agent(&self, team: &mut Team, agent: AgentConfig) -> Result<(), TeamError> {
        team.add_agent(agent)?;
        team.updated_at = Utc::now();
        Ok(())
    }

    pub fn remove_agent(&self, team: &mut Team, id: &str) -> Result<(), TeamError> {
        team.remove_agent(id)?;
        team.updated_at = Utc::now();
        Ok(())
    }

    pub fn save(&mut self, team: &Team) -> Result<(), TeamError> {
        std::fs::create_dir_all(&self.teams_dir)?;
        let file = TeamFile::from(team);
        let json = serde_json::to_string_pretty(&file)?;
        std::fs::write(self.path_for(&team.name), json)?;
        self.current_team = Some(team.name.clone());
        info!(team = %team.name, agent_count = team.agents.len(), "team saved");
        Ok(())
    }

    pub fn load(&mut self, name: &str) -> Result<Team, TeamError> {
        let path = self.path_for(name);
        let raw = std::fs::read_to_string(&path)
            .map_err(|_| TeamError::NotFound(name.to_string()))?;
        let file: TeamFile = serde_json::from_str(&raw)?;
        self.current_team = Some(file.name.clone());
        info!(team = %file.name, agent_count = file.agents.len(), "team loaded");
        Ok(file.into())
    }

    pub fn list(&self) -> Result<Vec<TeamSummary>, TeamError> {
        if !self.teams_dir.exists() {
            return Ok(Vec::new());
        }

        let mut summaries = Vec::new();
        for entry in std::fs::read_dir(&self.teams_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }

            let raw = std::fs::read_to_string(&path)?;
            let file: TeamFile = match serde_json::from_str(&raw) {
                Ok(file) => file,
                Err(_) => continue,
            };

            summaries.push(TeamSummary {
                name: file.name,
                agent_count: file.agents.len(),
                created_at: file.created_at,
                updated_at: file.updated_at,
            });
        }

        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(summaries)
    }

    pub fn delete(&mut self, name: &str) -> Result<(), TeamError> {
        let path = self.path_for(name);
        std::fs::remove_file(&path).map_err(|_| TeamError::NotFound(name.to_string()))?;
        if self.current_team.as_deref() == Some(name) {
            self.current_team = None;
        }
        Ok(())
    }

    pub fn teams_dir(&self) -> &Path {
        &self.teams_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::team::config::ProviderTag;

    fn temp_manager() -> TeamManager {
        let dir = std::env::temp_dir().join(format!(
            "crewcode_team_manager_{}",
            uuid::Uuid::new_v4()
        ));
        TeamManager::new(dir)
    }

    #[test]
    fn safe_name_folds_non_alphanumeric() {
        assert_eq!(safe_name("My Team!"), "My_Team_");
        assert_eq!(safe_name("ok-team_1"), "ok-team_1");
    }

    #[test]
    fn save_then_load_round_trips_and_hides_default_key() {
        let mut manager = temp_manager();
        let mut team = manager.create("Squad");

        manager
            .add_agent(
                &mut team,
                AgentConfig::new("a1", "Ann", "Architect", ProviderTag::Claude, "claude-sonnet-4-5"),
            )
            .unwrap();

        let mut second = AgentConfig::new("a2", "Bea", "Backend", ProviderTag::Grok, "grok-4");
        second.api_key = Some("sk-real-secret".to_string());
        manager.add_agent(&mut team, second).unwrap();

        manager.save(&team).unwrap();

        let raw = std::fs::read_to_string(manager.path_for(&team.name)).unwrap();
        // a1 has no explicit key: the sentinel stands in for it on disk.
        assert!(raw.contains(CONFIG_DEFAULT_SENTINEL));
        // a2's explicit key is allowed to persist as-is.
        assert!(raw.contains("sk-real-secret"));

        let mut fresh_manager = TeamManager::new(manager.teams_dir().to_path_buf());
        let loaded = fresh_manager.load(&team.name).unwrap();

        assert_eq!(loaded.name, team.name);
        assert_eq!(loaded.agents.len(), 2);
        assert_eq!(loaded.agents[0].id, "a1");
        assert_eq!(loaded.agents[0].api_key, None);
        assert_eq!(loaded.agents[1].api_key.as_deref(), Some("sk-real-secret"));

        let _ = std::fs::remove_dir_all(manager.teams_dir());
    }

    #[test]
    fn list_reports_agent_counts() {
        let mut manager = temp_manager();
        let mut team = manager.create("Listed");
        manager
            .add_agent(
                &mut team,
                AgentConfig::new("a1", "Ann", "Architect", ProviderTag::Claude, "claude-sonnet-4-5"),
            )
            .unwrap();
        manager.save(&team).unwrap();

        let summaries = manager.list().unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].name, "Listed");
        assert_eq!(summaries[0].agent_count, 1);

        let _ = std::fs::remove_dir_all(manager.teams_dir());
    }

    #[test]
    fn delete_clears_current_team_when_matched() {
        let mut manager = temp_manager();
        let team = manager.create("Temp");
        manager.save(&team).unwrap();
        assert_eq!(manager.current_team(), Some("Temp"));

        manager.delete("Temp").unwrap();
        assert_eq!(manager.current_team(), None);

        let _ = std::fs::remove_dir_all(manager.teams_dir());
    }

    #[test]
    fn delete_missing_team_is_not_found() {
        let mut manager = temp_manager();
        let err = manager.delete("Nope").unwrap_err();
        assert!(matches!(err, TeamError::NotFound(name) if name == "Nope"));
    }
}
