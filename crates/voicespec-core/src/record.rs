//! The workflow record: one per run, enriched stage by stage.
//!
//! Stages never touch the record directly. They read it through a shared
//! reference and hand back a [`StageDelta`]; the controller folds the delta in
//! with [`WorkflowRecord::complete_stage`] or records the failure with
//! [`WorkflowRecord::fail_stage`]. Status moves are checked by
//! [`StageStatus::transition`], so an out-of-order move is an error rather
//! than silent corruption.

use crate::error::{Result, VoicespecError};
use crate::spec::ProjectSpec;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// StageId
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Transcription,
    Provisioning,
    Sprint,
}

impl StageId {
    pub const ALL: [StageId; 3] = [StageId::Transcription, StageId::Provisioning, StageId::Sprint];

    /// Graph node name.
    pub fn node(self) -> &'static str {
        match self {
            StageId::Transcription => "agent_1",
            StageId::Provisioning => "agent_2",
            StageId::Sprint => "agent_3",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StageId::Transcription => "transcription",
            StageId::Provisioning => "provisioning",
            StageId::Sprint => "sprint",
        }
    }

    /// The stage that must be completed before this one may start.
    pub fn predecessor(self) -> Option<StageId> {
        match self {
            StageId::Transcription => None,
            StageId::Provisioning => Some(StageId::Transcription),
            StageId::Sprint => Some(StageId::Provisioning),
        }
    }

    pub fn next(self) -> Option<StageId> {
        match self {
            StageId::Transcription => Some(StageId::Provisioning),
            StageId::Provisioning => Some(StageId::Sprint),
            StageId::Sprint => None,
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// StageStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl StageStatus {
    /// Apply a status move for `stage`. Only `pending -> in_progress` and
    /// `in_progress -> {completed, failed}` exist.
    pub fn transition(self, to: StageStatus, stage: StageId) -> Result<StageStatus> {
        use StageStatus::*;
        match (self, to) {
            (Pending, InProgress) | (InProgress, Completed) | (InProgress, Failed) => Ok(to),
            _ => Err(VoicespecError::InvalidTransition {
                stage: stage.label().to_string(),
                from: self.to_string(),
                to: to.to_string(),
            }),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, StageStatus::Completed | StageStatus::Failed)
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageStatus::Pending => "pending",
            StageStatus::InProgress => "in_progress",
            StageStatus::Completed => "completed",
            StageStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Stage outputs
// ---------------------------------------------------------------------------

/// What provisioning produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionedRepo {
    pub repo_url: String,
    pub repo_owner: String,
    pub local_repo_path: PathBuf,
    pub claude_md_content: String,
    /// Files committed while seeding the repository.
    pub initial_files_created: Vec<String>,
}

/// What the sprint left behind in the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SprintResult {
    pub initial_commit_sha: String,
    pub files_created: Vec<String>,
    pub dependencies_installed: bool,
    /// The agent's own test run is not observed.
    pub tests_passing: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutput {
    Specification {
        transcript: String,
        spec: ProjectSpec,
    },
    Repository(ProvisionedRepo),
    Sprint {
        result: SprintResult,
        success_message: String,
    },
}

impl StageOutput {
    fn stage(&self) -> StageId {
        match self {
            StageOutput::Specification { .. } => StageId::Transcription,
            StageOutput::Repository(_) => StageId::Provisioning,
            StageOutput::Sprint { .. } => StageId::Sprint,
        }
    }
}

/// A successful stage's contribution to the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageDelta {
    pub output: StageOutput,
    pub warnings: Vec<String>,
}

impl StageDelta {
    pub fn new(output: StageOutput) -> Self {
        Self {
            output,
            warnings: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

// ---------------------------------------------------------------------------
// WorkflowRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowRecord {
    run_id: Uuid,
    audio_file_path: PathBuf,
    transcript: Option<String>,
    #[serde(flatten)]
    spec: Option<ProjectSpec>,
    #[serde(flatten)]
    repository: Option<ProvisionedRepo>,
    #[serde(flatten)]
    sprint: Option<SprintResult>,
    current_stage: Option<StageId>,
    agent_1_status: StageStatus,
    agent_2_status: StageStatus,
    agent_3_status: StageStatus,
    errors: Vec<String>,
    warnings: Vec<String>,
    completed: bool,
    success_message: Option<String>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl WorkflowRecord {
    pub fn new(audio_file_path: impl Into<PathBuf>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            audio_file_path: audio_file_path.into(),
            transcript: None,
            spec: None,
            repository: None,
            sprint: None,
            current_stage: None,
            agent_1_status: StageStatus::Pending,
            agent_2_status: StageStatus::Pending,
            agent_3_status: StageStatus::Pending,
            errors: Vec::new(),
            warnings: Vec::new(),
            completed: false,
            success_message: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    // ---- accessors --------------------------------------------------------

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn audio_file_path(&self) -> &Path {
        &self.audio_file_path
    }

    pub fn transcript(&self) -> Option<&str> {
        self.transcript.as_deref()
    }

    pub fn spec(&self) -> Option<&ProjectSpec> {
        self.spec.as_ref()
    }

    pub fn repository(&self) -> Option<&ProvisionedRepo> {
        self.repository.as_ref()
    }

    pub fn sprint(&self) -> Option<&SprintResult> {
        self.sprint.as_ref()
    }

    pub fn current_stage(&self) -> Option<StageId> {
        self.current_stage
    }

    /// Current stage's node name, or `start` before any stage has run.
    pub fn current_node(&self) -> &'static str {
        self.current_stage.map(StageId::node).unwrap_or("start")
    }

    pub fn status(&self, stage: StageId) -> StageStatus {
        match stage {
            StageId::Transcription => self.agent_1_status,
            StageId::Provisioning => self.agent_2_status,
            StageId::Sprint => self.agent_3_status,
        }
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn success_message(&self) -> Option<&str> {
        self.success_message.as_deref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    // ---- append-only lists ------------------------------------------------

    pub fn push_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn push_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    // ---- stage lifecycle --------------------------------------------------

    fn set_status(&mut self, stage: StageId, to: StageStatus) -> Result<()> {
        let next = self.status(stage).transition(to, stage)?;
        match stage {
            StageId::Transcription => self.agent_1_status = next,
            StageId::Provisioning => self.agent_2_status = next,
            StageId::Sprint => self.agent_3_status = next,
        }
        Ok(())
    }

    /// Mark `stage` in progress. Its predecessor must be completed.
    pub fn begin_stage(&mut self, stage: StageId) -> Result<()> {
        if let Some(prev) = stage.predecessor() {
            let prev_status = self.status(prev);
            if prev_status != StageStatus::Completed {
                return Err(VoicespecError::Blocked {
                    stage: stage.label().to_string(),
                    reason: format!("{prev} is {prev_status}"),
                });
            }
        }
        self.set_status(stage, StageStatus::InProgress)?;
        self.current_stage = Some(stage);
        Ok(())
    }

    /// Fold a successful stage's delta in and mark it completed.
    pub fn complete_stage(&mut self, stage: StageId, delta: StageDelta) -> Result<()> {
        if delta.output.stage() != stage {
            return Err(VoicespecError::InvalidTransition {
                stage: stage.label().to_string(),
                from: self.status(stage).to_string(),
                to: format!("output of {}", delta.output.stage()),
            });
        }
        self.set_status(stage, StageStatus::Completed)?;

        match delta.output {
            StageOutput::Specification { transcript, spec } => {
                self.transcript = Some(transcript);
                self.spec = Some(spec);
            }
            StageOutput::Repository(repo) => {
                self.repository = Some(repo);
            }
            StageOutput::Sprint {
                result,
                success_message,
            } => {
                self.sprint = Some(result);
                self.success_message = Some(success_message);
            }
        }
        self.warnings.extend(delta.warnings);
        Ok(())
    }

    /// Mark `stage` failed and append its single diagnostic.
    pub fn fail_stage(&mut self, stage: StageId, error: &VoicespecError) -> Result<()> {
        self.set_status(stage, StageStatus::Failed)?;
        self.push_error(diagnostic(stage, error));
        Ok(())
    }

    /// Close the run. `completed` holds only when every stage completed.
    pub fn finish(&mut self) {
        self.completed = StageId::ALL
            .iter()
            .all(|s| self.status(*s) == StageStatus::Completed);
        self.finished_at = Some(Utc::now());
    }

    /// Force the run incomplete, whatever the stage statuses say.
    pub fn mark_incomplete(&mut self) {
        self.completed = false;
        self.finished_at = Some(Utc::now());
    }
}

/// The one line a failed stage contributes to `errors`.
pub fn diagnostic(stage: StageId, error: &VoicespecError) -> String {
    if error.is_timeout() {
        format!("{stage} timeout: {error}")
    } else {
        format!("{stage} failed: {error}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::fixtures::todo_spec;

    fn spec_delta() -> StageDelta {
        StageDelta::new(StageOutput::Specification {
            transcript: "build a todo app".into(),
            spec: todo_spec(),
        })
    }

    fn repo_delta() -> StageDelta {
        StageDelta::new(StageOutput::Repository(ProvisionedRepo {
            repo_url: "https://github.com/octo/todo-cli".into(),
            repo_owner: "octo".into(),
            local_repo_path: PathBuf::from("/tmp/todo-cli"),
            claude_md_content: "# todo-cli".into(),
            initial_files_created: vec!["CLAUDE.md".into()],
        }))
    }

    #[test]
    fn status_transition_table() {
        use StageStatus::*;
        let s = StageId::Sprint;
        assert_eq!(Pending.transition(InProgress, s).unwrap(), InProgress);
        assert_eq!(InProgress.transition(Completed, s).unwrap(), Completed);
        assert_eq!(InProgress.transition(Failed, s).unwrap(), Failed);

        for (from, to) in [
            (Pending, Completed),
            (Pending, Failed),
            (Pending, Pending),
            (InProgress, InProgress),
            (InProgress, Pending),
            (Completed, InProgress),
            (Completed, Failed),
            (Failed, InProgress),
            (Failed, Completed),
        ] {
            let err = from.transition(to, s).unwrap_err();
            assert!(
                matches!(err, VoicespecError::InvalidTransition { .. }),
                "{from} -> {to} should be rejected"
            );
        }
    }

    #[test]
    fn new_record_starts_pending() {
        let record = WorkflowRecord::new("memo.mp3");
        for stage in StageId::ALL {
            assert_eq!(record.status(stage), StageStatus::Pending);
        }
        assert_eq!(record.current_node(), "start");
        assert!(!record.completed());
        assert!(record.spec().is_none());
        assert_eq!(record.audio_file_path(), Path::new("memo.mp3"));
    }

    #[test]
    fn stage_blocked_until_predecessor_completes() {
        let mut record = WorkflowRecord::new("memo.mp3");
        let err = record.begin_stage(StageId::Provisioning).unwrap_err();
        assert!(matches!(err, VoicespecError::Blocked { .. }));
        assert_eq!(record.status(StageId::Provisioning), StageStatus::Pending);
    }

    #[test]
    fn stage_cannot_be_revisited() {
        let mut record = WorkflowRecord::new("memo.mp3");
        record.begin_stage(StageId::Transcription).unwrap();
        record
            .complete_stage(StageId::Transcription, spec_delta())
            .unwrap();
        assert!(record.begin_stage(StageId::Transcription).is_err());
        assert!(record
            .complete_stage(StageId::Transcription, spec_delta())
            .is_err());
    }

    #[test]
    fn specification_delta_sets_every_field_at_once() {
        let mut record = WorkflowRecord::new("memo.mp3");
        record.begin_stage(StageId::Transcription).unwrap();
        assert_eq!(record.current_node(), "agent_1");
        assert!(record.spec().is_none());
        record
            .complete_stage(StageId::Transcription, spec_delta())
            .unwrap();
        let spec = record.spec().unwrap();
        assert_eq!(spec.project_name, "todo-cli");
        assert_eq!(record.transcript(), Some("build a todo app"));
    }

    #[test]
    fn delta_for_wrong_stage_is_rejected() {
        let mut record = WorkflowRecord::new("memo.mp3");
        record.begin_stage(StageId::Transcription).unwrap();
        assert!(record
            .complete_stage(StageId::Transcription, repo_delta())
            .is_err());
        assert_eq!(record.status(StageId::Transcription), StageStatus::InProgress);
        assert!(record.repository().is_none());
    }

    #[test]
    fn failure_appends_one_diagnostic() {
        let mut record = WorkflowRecord::new("memo.mp3");
        record.begin_stage(StageId::Transcription).unwrap();
        let err = VoicespecError::MalformedSpec("expected value at line 1".into());
        record.fail_stage(StageId::Transcription, &err).unwrap();
        assert_eq!(record.status(StageId::Transcription), StageStatus::Failed);
        assert_eq!(record.errors().len(), 1);
        assert!(record.errors()[0].starts_with("transcription failed:"));
        assert!(record.errors()[0].contains("expected value at line 1"));
    }

    #[test]
    fn timeout_diagnostic_names_timeout() {
        let err = VoicespecError::AgentTimeout { secs: 600 };
        let line = diagnostic(StageId::Sprint, &err);
        assert_eq!(line, "sprint timeout: Claude Code did not finish within 600s");
    }

    #[test]
    fn finish_requires_all_completed() {
        let mut record = WorkflowRecord::new("memo.mp3");
        record.begin_stage(StageId::Transcription).unwrap();
        record
            .complete_stage(StageId::Transcription, spec_delta())
            .unwrap();
        record.finish();
        assert!(!record.completed());
        assert!(record.finished_at().is_some());
    }

    #[test]
    fn warnings_from_delta_are_appended() {
        let mut record = WorkflowRecord::new("memo.mp3");
        record.push_warning("first");
        record.begin_stage(StageId::Transcription).unwrap();
        record
            .complete_stage(StageId::Transcription, spec_delta().with_warning("second"))
            .unwrap();
        assert_eq!(record.warnings(), ["first", "second"]);
    }

    #[test]
    fn serializes_with_flat_field_names() {
        let mut record = WorkflowRecord::new("memo.mp3");
        record.begin_stage(StageId::Transcription).unwrap();
        record
            .complete_stage(StageId::Transcription, spec_delta())
            .unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["project_name"], "todo-cli");
        assert_eq!(json["agent_1_status"], "completed");
        assert_eq!(json["agent_2_status"], "pending");
        assert_eq!(json["current_stage"], "transcription");
        assert!(json.get("repo_url").is_none());
    }
}
