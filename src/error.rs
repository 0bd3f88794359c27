use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("tool schema must be a JSON object")]
    SchemaNotObject,
    #[error("tool schema must declare type=object")]
    RootTypeMustBeObject,
    #[error("required must be an array of strings")]
    InvalidRequired,
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("invalid tool arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },
    #[error("dependency missing: {0}")]
    MissingDependency(&'static str),
    #[error("tool execution failed: {0}")]
    Execution(String),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Misconfiguration of a [`crate::tools::sandbox::SandboxPolicy`] (a bad
/// blocked-command or blocked-host regex). A blocked call at *runtime* is
/// never an error — it is a normal tool result beginning with `Blocked:`.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("invalid blocked-command pattern {pattern:?}: {message}")]
    InvalidBashPattern { pattern: String, message: String },
    #[error("invalid blocked-host pattern {pattern:?}: {message}")]
    InvalidHostPattern { pattern: String, message: String },
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Request(String),
    #[error("provider response invalid: {0}")]
    Response(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Endpoint not found")]
    NotFound,
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("API Error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum TeamError {
    #[error("team not found: {0}")]
    NotFound(String),
    #[error("no agents in team")]
    EmptyTeam,
    #[error("duplicate agent id: {0}")]
    DuplicateAgentId(String),
    #[error("agent not found: {0}")]
    AgentNotFound(String),
    #[error("team storage error: {0}")]
    Io(String),
    #[error("team serialization error: {0}")]
    Serde(String),
}

impl From<std::io::Error> for TeamError {
    fn from(err: std::io::Error) -> Self {
        TeamError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TeamError {
    fn from(err: serde_json::Error) -> Self {
        TeamError::Serde(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Team(#[from] TeamError),
    #[error("max iterations reached ({max_iterations})")]
    MaxIterationsReached { max_iterations: u32 },
    #[error("agent stream ended without final response")]
    MissingFinalResponse,
    #[error("agent configuration error: {0}")]
    Config(String),
}
