use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::types::{AgentOptions, Prompt, RunResult};
use crate::{ClaudeAgentError, Result};

// ─── Command builder ──────────────────────────────────────────────────────

/// Build the non-interactive `claude --print …` invocation.
///
/// `CLAUDECODE` is removed from the environment so this works both from a
/// terminal and from inside a running Claude session.
pub(crate) fn build_command(opts: &AgentOptions) -> Command {
    let mut cmd = Command::new(opts.executable());
    cmd.arg("--print");

    if opts.skip_permissions {
        cmd.arg("--dangerously-skip-permissions");
    }

    if let Some(model) = &opts.model {
        cmd.arg("--model").arg(model);
    }

    if let Some(cwd) = &opts.cwd {
        cmd.current_dir(cwd);
    }

    cmd.env_remove("CLAUDECODE");
    for (k, v) in &opts.env {
        cmd.env(k, v);
    }

    // NOTE: the prompt is never a positional arg; it is sent via stdin
    cmd
}

// ─── Execution ────────────────────────────────────────────────────────────

/// Spawn `cmd`, feed it `prompt` on stdin and wait for it to exit.
///
/// The child is spawned with `kill_on_drop`, so when `timeout` elapses the
/// dropped wait future takes the process down with it. Stdout and stderr are
/// drained concurrently by `wait_with_output`, which avoids pipe-buffer
/// deadlocks on chatty runs.
pub(crate) async fn execute(
    mut cmd: Command,
    prompt: &Prompt,
    timeout: Option<Duration>,
) -> Result<RunResult> {
    let exe = cmd.as_std().get_program().to_string_lossy().into_owned();

    // A missing cwd fails the spawn with NotFound too; report it by name.
    if let Some(dir) = cmd.as_std().get_current_dir() {
        if !dir.is_dir() {
            return Err(ClaudeAgentError::WorkingDirNotFound(dir.to_path_buf()));
        }
    }

    let stdin = match prompt {
        Prompt::Text(_) => Stdio::piped(),
        Prompt::File(path) => Stdio::from(std::fs::File::open(path)?),
    };
    cmd.stdin(stdin)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let started = Instant::now();
    let mut child = cmd.spawn().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ClaudeAgentError::ExecutableNotFound(exe.clone()),
        _ => ClaudeAgentError::Io(e),
    })?;
    tracing::debug!(executable = %exe, pid = ?child.id(), "spawned agent process");

    if let Prompt::Text(text) = prompt {
        if let Some(mut stdin) = child.stdin.take() {
            let bytes = text.clone().into_bytes();
            // Written from a separate task so a child that streams output
            // before consuming all of stdin cannot wedge us. Dropping the
            // handle closes the pipe.
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(&bytes).await {
                    tracing::debug!(error = %e, "agent closed stdin early");
                }
            });
        }
    }

    let wait = child.wait_with_output();
    let output = match timeout {
        None => wait.await?,
        Some(limit) => match tokio::time::timeout(limit, wait).await {
            Ok(res) => res?,
            Err(_) => {
                tracing::warn!(executable = %exe, secs = limit.as_secs(), "agent timed out; killed");
                return Err(ClaudeAgentError::Timeout {
                    secs: limit.as_secs(),
                });
            }
        },
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        return Err(ClaudeAgentError::Exit {
            code: output.status.code(),
            stderr,
        });
    }

    Ok(RunResult {
        stdout,
        stderr,
        exit_code: output.status.code().unwrap_or(0),
        elapsed_ms: started.elapsed().as_millis() as u64,
    })
}

/// Run `<exe> --version` and return its trimmed stdout.
pub(crate) async fn probe_version(exe: &str, timeout: Duration) -> Result<String> {
    let mut cmd = Command::new(exe);
    cmd.arg("--version");
    let result = execute(cmd, &Prompt::Text(String::new()), Some(timeout)).await?;
    Ok(result.stdout.trim().to_string())
}

// ─── Tests ────────────────────────────────────────────────────────────────
