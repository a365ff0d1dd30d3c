//! Thin wrappers over the `git` binary.

use crate::error::{Result, VoicespecError};
use crate::stages::RepoInspector;
use std::path::Path;
use std::process::Command;

const FALLBACK_NAME: &str = "voicespec";
const FALLBACK_EMAIL: &str = "voicespec@users.noreply.github.com";

/// Run `git <args>` (in `dir` when given) and return trimmed stdout.
/// `secret` is scrubbed from any error text.
fn run_git(dir: Option<&Path>, args: &[&str], secret: Option<&str>) -> Result<String> {
    let mut cmd = Command::new("git");
    cmd.args(args);
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }
    // Never block on a credential prompt.
    cmd.env("GIT_TERMINAL_PROMPT", "0");

    let output = cmd.output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let command = args
            .iter()
            .find(|a| !a.starts_with('-') && !a.contains('='))
            .copied()
            .unwrap_or_default()
            .to_string();
        return Err(VoicespecError::Git {
            command,
            stderr: redact(&stderr, secret),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn redact(text: &str, secret: Option<&str>) -> String {
    match secret {
        Some(s) if !s.is_empty() => text.replace(s, "***"),
        _ => text.to_string(),
    }
}

/// Inject `token` into an HTTPS clone URL. Other URL forms pass through.
pub fn authenticated_url(clone_url: &str, token: &str) -> String {
    match clone_url.strip_prefix("https://") {
        Some(rest) => format!("https://x-access-token:{token}@{rest}"),
        None => clone_url.to_string(),
    }
}

/// `git --version`.
pub fn version() -> Result<String> {
    run_git(None, &["--version"], None)
}

/// Clone `url` into `dest`, which must not exist yet.
pub fn clone(url: &str, dest: &Path, token: Option<&str>) -> Result<()> {
    if dest.exists() {
        return Err(VoicespecError::DirectoryExists(dest.to_path_buf()));
    }
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dest_str = dest.to_string_lossy();
    run_git(None, &["clone", url, &dest_str], token)?;
    tracing::debug!(dest = %dest.display(), "cloned repository");
    Ok(())
}

fn config_value(repo: &Path, key: &str) -> Option<String> {
    run_git(Some(repo), &["config", key], None)
        .ok()
        .filter(|v| !v.is_empty())
}

/// Stage everything and commit. Falls back to a bot identity when the
/// machine has no `user.name` / `user.email` configured.
pub fn commit_all(repo: &Path, message: &str) -> Result<String> {
    run_git(Some(repo), &["add", "-A"], None)?;

    let name = config_value(repo, "user.name");
    let email = config_value(repo, "user.email");
    let name_arg = format!("user.name={FALLBACK_NAME}");
    let email_arg = format!("user.email={FALLBACK_EMAIL}");

    let mut args: Vec<&str> = Vec::new();
    if name.is_none() {
        args.extend(["-c", name_arg.as_str()]);
    }
    if email.is_none() {
        args.extend(["-c", email_arg.as_str()]);
    }
    args.extend(["commit", "-m", message]);
    run_git(Some(repo), &args, None)?;
    head_commit(repo)
}

/// `git push -u origin HEAD`.
pub fn push(repo: &Path, token: Option<&str>) -> Result<()> {
    run_git(Some(repo), &["push", "-u", "origin", "HEAD"], token)?;
    Ok(())
}

pub fn set_remote_url(repo: &Path, url: &str) -> Result<()> {
    run_git(Some(repo), &["remote", "set-url", "origin", url], None)?;
    Ok(())
}

/// `git rev-parse HEAD`.
pub fn head_commit(repo: &Path) -> Result<String> {
    run_git(Some(repo), &["rev-parse", "HEAD"], None)
}

/// `git ls-files`, repository-relative.
pub fn tracked_files(repo: &Path) -> Result<Vec<String>> {
    let out = run_git(Some(repo), &["ls-files"], None)?;
    Ok(out
        .lines()
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// [`RepoInspector`] backed by the local `git` binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitInspector;

impl RepoInspector for GitInspector {
    fn head_commit(&self, repo: &Path) -> Result<String> {
        head_commit(repo)
    }

    fn tracked_files(&self, repo: &Path) -> Result<Vec<String>> {
        tracked_files(repo)
    }
}
