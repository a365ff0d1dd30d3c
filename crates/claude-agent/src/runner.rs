use std::time::Duration;

use crate::process;
use crate::{AgentOptions, Prompt, Result, RunResult};

// ─── RunConfig ────────────────────────────────────────────────────────────

/// Configuration for a single non-interactive Claude run.
///
/// Pass to [`run`] (or [`run_blocking`]) to drive the CLI to completion.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub prompt: Prompt,
    pub opts: AgentOptions,
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Drive a single `claude --print` run to completion.
///
/// Returns `Err(ClaudeAgentError::Timeout)` if `opts.timeout` elapses (the
/// child is killed), and `Err(ClaudeAgentError::Exit)` with the captured
/// stderr if the CLI exits non-zero.
///
/// # Example
///
/// ```rust,ignore
/// use claude_agent::{runner::{run, RunConfig}, AgentOptions, Prompt};
///
/// let result = run(RunConfig {
///     prompt: Prompt::Text("say hello".into()),
///     opts: AgentOptions::default(),
/// }).await?;
/// println!("{}", result.stdout);
/// ```
pub async fn run(config: RunConfig) -> Result<RunResult> {
    let cmd = process::build_command(&config.opts);
    tracing::info!(
        executable = config.opts.executable(),
        timeout_secs = config.opts.timeout.map(|t| t.as_secs()),
        "running claude"
    );
    process::execute(cmd, &config.prompt, config.opts.timeout).await
}

/// Blocking wrapper around [`run`] for synchronous callers.
pub fn run_blocking(config: RunConfig) -> Result<RunResult> {
    block_on(run(config))
}

/// Report the installed CLI version (`<exe> --version`).
pub fn version(executable: &str, timeout: Duration) -> Result<String> {
    block_on(process::probe_version(executable, timeout))
}

/// Locate `executable` on `PATH`.
pub fn locate(executable: &str) -> Option<std::path::PathBuf> {
    which::which(executable).ok()
}

// ─── Internal ─────────────────────────────────────────────────────────────

fn block_on<T: Send>(fut: impl std::future::Future<Output = Result<T>> + Send) -> Result<T> {
    use tokio::runtime::{Handle, RuntimeFlavor};

    match Handle::try_current() {
        // Already inside a multi-thread runtime (e.g., integration test)
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| handle.block_on(fut))
        }
        // `block_in_place` panics on a current-thread runtime; drive the
        // future from a scoped thread with its own runtime instead.
        Ok(_) => std::thread::scope(|s| {
            s.spawn(|| fresh_runtime(fut))
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
        }),
        Err(_) => fresh_runtime(fut),
    }
}

fn fresh_runtime<T>(fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    tracing::debug!("using new tokio runtime");
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(fut)
}

// ─── Tests ────────────────────────────────────────────────────────────────
