use crate::error::{Result, VoicespecError};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// GeminiConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: default_gemini_model(),
            base_url: default_gemini_base_url(),
        }
    }
}

// ---------------------------------------------------------------------------
// GitHubConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    #[serde(default = "default_github_api_url")]
    pub api_url: String,
    #[serde(default = "default_private")]
    pub private: bool,
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_private() -> bool {
    true
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_api_url(),
            private: default_private(),
        }
    }
}

// ---------------------------------------------------------------------------
// AgentConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_executable")]
    pub executable: String,
    #[serde(default = "default_agent_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub model: Option<String>,
}

fn default_agent_executable() -> String {
    "claude".to_string()
}

fn default_agent_timeout_secs() -> u64 {
    600
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            executable: default_agent_executable(),
            timeout_secs: default_agent_timeout_secs(),
            model: None,
        }
    }
}

impl AgentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// InboxConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxConfig {
    #[serde(default = "default_to_process")]
    pub to_process: PathBuf,
    #[serde(default = "default_processed")]
    pub processed: PathBuf,
}

fn default_to_process() -> PathBuf {
    PathBuf::from(paths::DEFAULT_INBOX_DIR)
}

fn default_processed() -> PathBuf {
    PathBuf::from(paths::DEFAULT_PROCESSED_DIR)
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            to_process: default_to_process(),
            processed: default_processed(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub inbox: InboxConfig,
    /// Parent directory for local clones. Defaults to `~/projects`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_dir: Option<PathBuf>,
}

impl Config {
    /// Load `voicespec.yaml` from `root`. A missing file yields the defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(&data)?;
        Ok(config)
    }

    pub fn inbox_dir(&self, root: &Path) -> PathBuf {
        paths::resolve(root, &self.inbox.to_process)
    }

    pub fn processed_dir(&self, root: &Path) -> PathBuf {
        paths::resolve(root, &self.inbox.processed)
    }

    /// Directory local clones are created under.
    pub fn workspace_dir(&self) -> PathBuf {
        match &self.workspace_dir {
            Some(dir) => dir.clone(),
            None => home::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(paths::DEFAULT_WORKSPACE_DIR),
        }
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.agent.executable.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "agent.executable is empty".to_string(),
            });
        }

        if self.agent.timeout_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "agent.timeout_secs is 0; every sprint would time out immediately"
                    .to_string(),
            });
        }

        if self.gemini.model.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "gemini.model is empty".to_string(),
            });
        }

        if !self.github.private {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "github.private is false; repositories will be public".to_string(),
            });
        }

        if let Some(dir) = &self.workspace_dir {
            if dir.is_relative() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "workspace_dir '{}' is relative; clones land under the current directory",
                        dir.display()
                    ),
                });
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";

/// Required environment variables and what they are for.
pub const REQUIRED_VARS: &[(&str, &str)] = &[
    (GEMINI_API_KEY, "Google Gemini API key"),
    (GITHUB_TOKEN, "GitHub Personal Access Token"),
];

#[derive(Clone)]
pub struct Credentials {
    pub gemini_api_key: String,
    pub github_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("gemini_api_key", &mask(&self.gemini_api_key))
            .field("github_token", &mask(&self.github_token))
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve credentials through `lookup`; every missing or blank variable is
    /// reported at once.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let gemini = get(GEMINI_API_KEY);
        let github = get(GITHUB_TOKEN);

        match (gemini, github) {
            (Some(gemini_api_key), Some(github_token)) => Ok(Self {
                gemini_api_key,
                github_token,
            }),
            (gemini, github) => {
                let mut missing = Vec::new();
                if gemini.is_none() {
                    missing.push(GEMINI_API_KEY.to_string());
                }
                if github.is_none() {
                    missing.push(GITHUB_TOKEN.to_string());
                }
                Err(VoicespecError::MissingCredentials(missing))
            }
        }
    }
}

/// Show the first eight characters of a secret.
pub fn mask(value: &str) -> String {
    let head: String = value.chars().take(8).collect();
    format!("{head}...")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
