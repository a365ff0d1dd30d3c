use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default upper bound on a single non-interactive run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

// ─── Prompt ───────────────────────────────────────────────────────────────

/// Where the prompt handed to `claude --print` comes from.
///
/// Either way the prompt reaches the CLI on stdin, never as a positional
/// argument, so long work orders are not subject to argv limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    Text(String),
    File(PathBuf),
}

// ─── AgentOptions ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AgentOptions {
    /// Binary to run. Defaults to `claude` on `PATH`.
    pub path_to_executable: Option<String>,
    pub model: Option<String>,
    /// Pass `--dangerously-skip-permissions` so the run never stops for a
    /// confirmation prompt.
    pub skip_permissions: bool,
    /// `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Working directory for the child. `None` inherits the parent's.
    pub cwd: Option<PathBuf>,
    pub env: HashMap<String, String>,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            path_to_executable: None,
            model: None,
            skip_permissions: true,
            timeout: Some(DEFAULT_TIMEOUT),
            cwd: None,
            env: HashMap::new(),
        }
    }
}

impl AgentOptions {
    pub fn executable(&self) -> &str {
        self.path_to_executable.as_deref().unwrap_or("claude")
    }
}

// ─── RunResult ────────────────────────────────────────────────────────────

/// Output of a run that exited with status zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub elapsed_ms: u64,
}
