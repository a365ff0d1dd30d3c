use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VoicespecError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingCredentials(Vec<String>),

    #[error("audio file not found: {}", .0.display())]
    AudioNotFound(PathBuf),

    #[error("unsupported audio format: {} (expected one of: {})", .0.display(), crate::audio::AUDIO_EXTENSIONS.join(", "))]
    UnsupportedAudio(PathBuf),

    #[error("Gemini API error: {message} (status: {status})")]
    Gemini { status: u16, message: String },

    #[error("Gemini returned no text content")]
    EmptyModelResponse,

    #[error("missing response header: {0}")]
    MissingResponseHeader(String),

    #[error("model output is not a valid project specification: {0}")]
    MalformedSpec(String),

    #[error("GitHub API error: {message} (status: {status})")]
    GitHub { status: u16, message: String },

    #[error("GitHub authentication failed: check GITHUB_TOKEN")]
    Unauthorized,

    #[error("repository already exists: {0}")]
    RepoExists(String),

    #[error("git {command} failed: {stderr}")]
    Git { command: String, stderr: String },

    #[error("directory already exists: {}", .0.display())]
    DirectoryExists(PathBuf),

    #[error("Claude Code did not finish within {secs}s")]
    AgentTimeout { secs: u64 },

    #[error(transparent)]
    Agent(claude_agent::ClaudeAgentError),

    #[error("invalid transition for {stage} from {from} to {to}")]
    InvalidTransition {
        stage: String,
        from: String,
        to: String,
    },

    #[error("stage {stage} cannot start: {reason}")]
    Blocked { stage: String, reason: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl VoicespecError {
    /// Whether this fault came from a bounded wait running out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, VoicespecError::AgentTimeout { .. })
    }
}

impl From<claude_agent::ClaudeAgentError> for VoicespecError {
    fn from(e: claude_agent::ClaudeAgentError) -> Self {
        match e {
            claude_agent::ClaudeAgentError::Timeout { secs } => VoicespecError::AgentTimeout { secs },
            other => VoicespecError::Agent(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, VoicespecError>;
