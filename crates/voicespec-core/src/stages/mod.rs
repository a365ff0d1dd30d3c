//! The three pipeline stages and the narrow interfaces they call out through.
//!
//! Each external collaborator sits behind a one- or two-method trait so the
//! workflow can be driven end to end with test doubles.

pub mod provisioning;
pub mod sprint;
pub mod transcription;

use crate::audio::AudioFile;
use crate::error::{Result, VoicespecError};
use crate::record::{ProvisionedRepo, StageDelta, StageId, WorkflowRecord};
use crate::spec::ProjectSpec;
use std::path::Path;

pub use provisioning::{GitHubProvisioner, ProvisioningStage};
pub use sprint::{ClaudeCodingAgent, SprintStage, MANIFEST_FILES};
pub use transcription::TranscriptionStage;

// ---------------------------------------------------------------------------
// Collaborator interfaces
// ---------------------------------------------------------------------------

/// Speech-to-text plus schema-constrained structuring.
pub trait SpecModel {
    fn transcribe(&self, audio: &AudioFile) -> Result<String>;
    /// Return raw JSON text conforming to the project spec schema.
    fn structure(&self, transcript: &str) -> Result<String>;
}

/// Create a remote repository plus a seeded local clone.
pub trait RepoProvisioner {
    fn provision(&self, spec: &ProjectSpec) -> Result<ProvisionedRepo>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentOutcome {
    pub stdout: String,
    pub stderr: String,
    pub elapsed_ms: u64,
}

/// Execute an instruction document against a repository.
pub trait CodingAgent {
    fn execute(&self, instruction: &Path, repo: &Path) -> Result<AgentOutcome>;
}

/// Read-only version-control queries.
pub trait RepoInspector {
    fn head_commit(&self, repo: &Path) -> Result<String>;
    fn tracked_files(&self, repo: &Path) -> Result<Vec<String>>;
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// One unit of work. A stage reads the record and returns its delta; it
/// never mutates the record and signals failure only through `Err`.
pub trait Stage {
    fn id(&self) -> StageId;
    fn run(&self, record: &WorkflowRecord) -> Result<StageDelta>;
}

/// Fetch a field block a stage depends on, or explain why it is missing.
pub(crate) fn require<'r, T>(
    stage: StageId,
    what: &str,
    field: Option<&'r T>,
) -> Result<&'r T> {
    field.ok_or_else(|| VoicespecError::Blocked {
        stage: stage.label().to_string(),
        reason: format!("record has no {what}"),
    })
}
