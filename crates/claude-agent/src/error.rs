use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClaudeAgentError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("executable not found: {0}")]
    ExecutableNotFound(String),

    #[error("Claude Code did not finish within {secs}s")]
    Timeout { secs: u64 },

    #[error("{}", exit_message(.code, .stderr))]
    Exit { code: Option<i32>, stderr: String },

    #[error("working directory not found: {}", .0.display())]
    WorkingDirNotFound(std::path::PathBuf),
}

impl ClaudeAgentError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClaudeAgentError::Timeout { .. })
    }
}

fn exit_message(code: &Option<i32>, stderr: &str) -> String {
    let head = match code {
        Some(code) => format!("Claude Code process exited with code {code}"),
        None => "Claude Code process terminated by signal".to_string(),
    };
    if stderr.trim().is_empty() {
        head
    } else {
        format!("{head}\nstderr: {}", stderr.trim())
    }
}
