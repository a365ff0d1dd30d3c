use super::{require, AgentOutcome, CodingAgent, RepoInspector, Stage};
use crate::config::AgentConfig;
use crate::error::Result;
use crate::prompt::sprint_instruction;
use crate::record::{SprintResult, StageDelta, StageId, StageOutput, WorkflowRecord};
use crate::workdir::WorkdirGuard;
use claude_agent::{AgentOptions, Prompt, RunConfig};
use std::io::Write;
use std::path::Path;

/// Root-level files whose presence means the agent set up dependency management.
pub const MANIFEST_FILES: &[&str] = &[
    "requirements.txt",
    "package.json",
    "Cargo.toml",
    "go.mod",
    "pom.xml",
    "Gemfile",
];

pub fn has_manifest(files: &[String]) -> bool {
    files.iter().any(|f| MANIFEST_FILES.contains(&f.as_str()))
}

/// Hands the work order to the coding agent inside the new repository, then
/// reads back what it committed.
pub struct SprintStage<A, I> {
    agent: A,
    inspector: I,
}

impl<A: CodingAgent, I: RepoInspector> SprintStage<A, I> {
    pub fn new(agent: A, inspector: I) -> Self {
        Self { agent, inspector }
    }
}

impl<A: CodingAgent, I: RepoInspector> Stage for SprintStage<A, I> {
    fn id(&self) -> StageId {
        StageId::Sprint
    }

    fn run(&self, record: &WorkflowRecord) -> Result<StageDelta> {
        let spec = require(self.id(), "project specification", record.spec())?;
        let repo = require(self.id(), "provisioned repository", record.repository())?;
        // Both the guard and the agent's cwd apply this path; it must be absolute.
        let repo_path = std::path::absolute(&repo.local_repo_path)?;
        let repo_path = repo_path.as_path();

        let mut instruction = tempfile::Builder::new()
            .prefix("voicespec-sprint-")
            .suffix(".txt")
            .tempfile()?;
        instruction.write_all(sprint_instruction(spec).as_bytes())?;
        instruction.flush()?;

        let outcome = {
            let _cwd = WorkdirGuard::enter(repo_path)?;
            tracing::info!(repo = %repo_path.display(), "running coding agent");
            self.agent.execute(instruction.path(), repo_path)?
        };
        tracing::info!(elapsed_ms = outcome.elapsed_ms, "coding agent finished");

        let initial_commit_sha = self.inspector.head_commit(repo_path)?;
        let files_created = self.inspector.tracked_files(repo_path)?;
        let dependencies_installed = has_manifest(&files_created);
        tracing::info!(
            commit = %short_sha(&initial_commit_sha),
            files = files_created.len(),
            dependencies_installed,
            "sprint inspected"
        );

        let success_message = format!(
            "Project initialized successfully!\n\n\
             Local:  {}\n\
             Remote: {}\n\n\
             The project has been fully set up and is ready for development.",
            repo_path.display(),
            repo.repo_url
        );

        let mut delta = StageDelta::new(StageOutput::Sprint {
            result: SprintResult {
                initial_commit_sha,
                files_created,
                dependencies_installed,
                tests_passing: None,
            },
            success_message,
        });
        if !dependencies_installed {
            tracing::warn!("no dependency manifest found in the repository");
            delta = delta.with_warning(format!(
                "no dependency manifest found (looked for {})",
                MANIFEST_FILES.join(", ")
            ));
        }
        Ok(delta)
    }
}

pub fn short_sha(sha: &str) -> &str {
    sha.get(..8).unwrap_or(sha)
}

// ---------------------------------------------------------------------------
// ClaudeCodingAgent
// ---------------------------------------------------------------------------

/// [`CodingAgent`] that runs the `claude` CLI non-interactively.
#[derive(Debug, Clone)]
pub struct ClaudeCodingAgent {
    config: AgentConfig,
}

impl ClaudeCodingAgent {
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }
}

impl CodingAgent for ClaudeCodingAgent {
    fn execute(&self, instruction: &Path, repo: &Path) -> Result<AgentOutcome> {
        let run = RunConfig {
            prompt: Prompt::File(instruction.to_path_buf()),
            opts: AgentOptions {
                path_to_executable: Some(self.config.executable.clone()),
                model: self.config.model.clone(),
                timeout: Some(self.config.timeout()),
                cwd: Some(repo.to_path_buf()),
                ..AgentOptions::default()
            },
        };
        let result = claude_agent::run_blocking(run)?;
        Ok(AgentOutcome {
            stdout: result.stdout,
            stderr: result.stderr,
            elapsed_ms: result.elapsed_ms,
        })
    }
}
