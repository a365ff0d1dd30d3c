//! `claude-agent`: native Rust driver for the non-interactive Claude CLI.
//!
//! Runs `claude --print --dangerously-skip-permissions` as a child process,
//! feeds it a prompt on stdin, and waits for it to exit within a bounded
//! timeout. The CLI does all the work inside its working directory; this crate
//! only reports how the run ended.
//!
//! # Architecture
//!
//! ```text
//! RunConfig { Prompt, AgentOptions }
//!     │
//!     ▼
//! build_command   ← `claude --print [--dangerously-skip-permissions] [--model M]`
//!     │
//!     ▼
//! execute         ← stdin from text or file, kill_on_drop + tokio timeout
//!     │
//!     ▼
//! RunResult | ClaudeAgentError::{Timeout, Exit, ExecutableNotFound, Io}
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use claude_agent::{run_blocking, AgentOptions, Prompt, RunConfig};
//!
//! let result = run_blocking(RunConfig {
//!     prompt: Prompt::File("/tmp/work-order.txt".into()),
//!     opts: AgentOptions::default(),
//! })?;
//! println!("{}", result.stdout);
//! ```

pub mod error;
pub mod runner;
pub mod types;

pub(crate) mod process;

pub use error::ClaudeAgentError;
pub use runner::{locate, run as agent_run, run_blocking, version, RunConfig};
pub use types::{AgentOptions, Prompt, RunResult, DEFAULT_TIMEOUT};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, ClaudeAgentError>;
