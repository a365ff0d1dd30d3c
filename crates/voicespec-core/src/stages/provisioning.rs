use super::{require, RepoProvisioner, Stage};
use crate::config::Config;
use crate::context::render_context;
use crate::error::{Result, VoicespecError};
use crate::git;
use crate::github::{CreateRepository, GitHubClient};
use crate::paths::CONTEXT_FILE;
use crate::record::{ProvisionedRepo, StageDelta, StageId, StageOutput, WorkflowRecord};
use crate::spec::ProjectSpec;
use std::path::PathBuf;

/// Specification in, remote repository plus seeded local clone out.
pub struct ProvisioningStage<P> {
    provisioner: P,
}

impl<P: RepoProvisioner> ProvisioningStage<P> {
    pub fn new(provisioner: P) -> Self {
        Self { provisioner }
    }
}

impl<P: RepoProvisioner> Stage for ProvisioningStage<P> {
    fn id(&self) -> StageId {
        StageId::Provisioning
    }

    fn run(&self, record: &WorkflowRecord) -> Result<StageDelta> {
        let spec = require(self.id(), "project specification", record.spec())?;
        let repo = self.provisioner.provision(spec)?;
        tracing::info!(
            url = %repo.repo_url,
            path = %repo.local_repo_path.display(),
            "repository provisioned"
        );
        Ok(StageDelta::new(StageOutput::Repository(repo)))
    }
}

// ---------------------------------------------------------------------------
// GitHubProvisioner
// ---------------------------------------------------------------------------

/// Creates the repository on GitHub, clones it under the workspace directory,
/// and pushes a first commit holding the context document.
pub struct GitHubProvisioner {
    client: GitHubClient,
    token: String,
    workspace_dir: PathBuf,
    private: bool,
}

impl GitHubProvisioner {
    pub fn new(token: impl Into<String>, config: &Config) -> Result<Self> {
        let token = token.into();
        Ok(Self {
            client: GitHubClient::new(token.clone(), &config.github)?,
            token,
            workspace_dir: config.workspace_dir(),
            private: config.github.private,
        })
    }
}

impl RepoProvisioner for GitHubProvisioner {
    fn provision(&self, spec: &ProjectSpec) -> Result<ProvisionedRepo> {
        let name = spec.repo_name();
        let local = self.workspace_dir.join(&name);
        // Checked before the remote exists so a local clash leaves nothing behind.
        if local.exists() {
            return Err(VoicespecError::DirectoryExists(local));
        }

        let user = self.client.authenticated_user()?;
        tracing::debug!(owner = %user.login, repo = %name, "creating repository");
        let created = self.client.create_repository(&CreateRepository {
            name: &name,
            description: &spec.project_description,
            private: self.private,
            auto_init: false,
        })?;

        let auth_url = git::authenticated_url(&created.clone_url, &self.token);
        git::clone(&auth_url, &local, Some(&self.token))?;

        let claude_md_content = render_context(spec);
        crate::io::atomic_write(&local.join(CONTEXT_FILE), claude_md_content.as_bytes())?;
        git::commit_all(&local, "Add project context from voice specification")?;
        git::push(&local, Some(&self.token))?;
        // Keep the token out of .git/config once the push is done.
        git::set_remote_url(&local, &created.clone_url)?;

        Ok(ProvisionedRepo {
            repo_url: created.html_url,
            repo_owner: created.owner.login,
            local_repo_path: local,
            claude_md_content,
            initial_files_created: vec![CONTEXT_FILE.to_string()],
        })
    }
}
