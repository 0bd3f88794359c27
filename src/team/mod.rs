//! Multi-agent teams: persisted agent rosters, a sequential broadcast
//! channel with explicit context handoff, dangerous-tool permission gating,
//! and the built-in agent preset.

pub mod channel;
pub mod config;
pub mod manager;
pub mod permission;
pub mod preset;

pub use channel::{
    ChannelEvent, ChannelEventSink, NoopSink, SharedTranscript, TeamChannel, TranscriptEntry,
    TRANSCRIPT_PROMPT_CAP,
};
pub use config::{AgentConfig, ProviderTag, Team, CONFIG_DEFAULT_SENTINEL};
pub use manager::{safe_name, TeamManager, TeamSummary};
pub use permission::{
    is_dangerous_tool, AutoAllowGateway, InteractiveGateway, PermissionGateway, DANGEROUS_TOOLS,
};
pub use preset::default_preset;
