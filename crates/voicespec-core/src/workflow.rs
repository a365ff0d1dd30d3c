//! The workflow controller: a fixed graph of three stages and one error sink.
//!
//! ```text
//! agent_1 ──completed──▶ agent_2 ──completed──▶ agent_3 ──completed──▶ end
//!    │                      │                      │
//!    └───────otherwise──────┴───────otherwise──────┴──▶ error_handler ──▶ end
//! ```
//!
//! Stages report failure by returning `Err`. The controller turns that into a
//! `failed` status plus one diagnostic, and routing then looks only at the
//! status. The error value itself is handed back in [`WorkflowRun::failure`].

use crate::audio::AudioFile;
use crate::error::{Result, VoicespecError};
use crate::record::{diagnostic, StageId, StageStatus, WorkflowRecord};
use crate::stages::Stage;
use std::fmt;
use std::path::Path;

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Transcription,
    Provisioning,
    Sprint,
    ErrorHandler,
    End,
}

impl Node {
    pub const ENTRY: Node = Node::Transcription;

    pub fn name(self) -> &'static str {
        match self {
            Node::Transcription => StageId::Transcription.node(),
            Node::Provisioning => StageId::Provisioning.node(),
            Node::Sprint => StageId::Sprint.node(),
            Node::ErrorHandler => "error_handler",
            Node::End => "end",
        }
    }

    pub fn stage(self) -> Option<StageId> {
        match self {
            Node::Transcription => Some(StageId::Transcription),
            Node::Provisioning => Some(StageId::Provisioning),
            Node::Sprint => Some(StageId::Sprint),
            Node::ErrorHandler | Node::End => None,
        }
    }
}

impl From<StageId> for Node {
    fn from(id: StageId) -> Self {
        match id {
            StageId::Transcription => Node::Transcription,
            StageId::Provisioning => Node::Provisioning,
            StageId::Sprint => Node::Sprint,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Conditional edge out of a stage node: advance on `completed`, otherwise
/// divert to the error handler.
pub fn route(stage: StageId, record: &WorkflowRecord) -> Node {
    if record.status(stage) == StageStatus::Completed {
        stage.next().map(Node::from).unwrap_or(Node::End)
    } else {
        Node::ErrorHandler
    }
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// Outcome of one pass through the graph.
#[derive(Debug)]
pub struct WorkflowRun {
    pub record: WorkflowRecord,
    /// Nodes visited, in order, ending with [`Node::End`].
    pub trail: Vec<Node>,
    /// The error the failing stage returned, if any.
    pub failure: Option<VoicespecError>,
}

impl WorkflowRun {
    pub fn succeeded(&self) -> bool {
        self.record.completed()
    }
}

pub struct Workflow {
    transcription: Box<dyn Stage>,
    provisioning: Box<dyn Stage>,
    sprint: Box<dyn Stage>,
}

impl Workflow {
    pub fn new(
        transcription: impl Stage + 'static,
        provisioning: impl Stage + 'static,
        sprint: impl Stage + 'static,
    ) -> Self {
        Self {
            transcription: Box::new(transcription),
            provisioning: Box::new(provisioning),
            sprint: Box::new(sprint),
        }
    }

    fn stage(&self, id: StageId) -> &dyn Stage {
        match id {
            StageId::Transcription => self.transcription.as_ref(),
            StageId::Provisioning => self.provisioning.as_ref(),
            StageId::Sprint => self.sprint.as_ref(),
        }
    }

    /// Drive `record` from the entry node to `end`.
    pub fn run(&self, mut record: WorkflowRecord) -> WorkflowRun {
        let span = tracing::info_span!("workflow", run_id = %record.run_id());
        let _enter = span.enter();

        let mut trail = Vec::new();
        let mut failure = None;
        let mut node = Node::ENTRY;

        loop {
            trail.push(node);
            node = match (node, node.stage()) {
                (_, Some(id)) => {
                    if let Err(e) = self.execute(id, &mut record) {
                        failure = Some(e);
                    }
                    route(id, &record)
                }
                (Node::ErrorHandler, None) => {
                    handle_error(&mut record);
                    Node::End
                }
                _ => {
                    if record.finished_at().is_none() {
                        record.finish();
                    }
                    break;
                }
            };
        }

        if record.completed() {
            tracing::info!("workflow completed");
        }
        WorkflowRun {
            record,
            trail,
            failure,
        }
    }

    fn execute(&self, id: StageId, record: &mut WorkflowRecord) -> Result<()> {
        if let Err(e) = record.begin_stage(id) {
            record.push_error(diagnostic(id, &e));
            return Err(e);
        }
        tracing::info!(stage = %id, "stage started");

        let result = self
            .stage(id)
            .run(record)
            .and_then(|delta| record.complete_stage(id, delta));

        match result {
            Ok(()) => {
                tracing::info!(stage = %id, "stage completed");
                Ok(())
            }
            Err(e) => {
                if record.fail_stage(id, &e).is_err() {
                    record.push_error(diagnostic(id, &e));
                }
                tracing::warn!(stage = %id, error = %e, "stage failed");
                Err(e)
            }
        }
    }
}

/// The absorbing error state.
fn handle_error(record: &mut WorkflowRecord) {
    tracing::error!(
        stage = record.current_node(),
        errors = ?record.errors(),
        "workflow failed"
    );
    record.mark_incomplete();
}

/// Validate the audio input and open a fresh record. Runs before any stage,
/// so a missing or unsupported file never reaches the graph.
pub fn prepare(audio_path: &Path) -> Result<WorkflowRecord> {
    AudioFile::open(audio_path)?;
    Ok(WorkflowRecord::new(audio_path))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::render_context;
    use crate::record::{ProvisionedRepo, StageDelta};
    use crate::spec::fixtures::VALID_JSON;
    use crate::spec::ProjectSpec;
    use crate::stages::{
        AgentOutcome, CodingAgent, ProvisioningStage, RepoInspector, RepoProvisioner, SpecModel,
        SprintStage, TranscriptionStage,
    };
    use serial_test::serial;
    use std::path::PathBuf;
    use tempfile::TempDir;

    // ─── Test doubles ────────────────────────────────────────────────────────

    struct StubModel(String);

    impl SpecModel for StubModel {
        fn transcribe(&self, _audio: &AudioFile) -> Result<String> {
            Ok("I want a todo CLI written in Rust".into())
        }

        fn structure(&self, _transcript: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct StubProvisioner {
        local: PathBuf,
        fail: bool,
    }

    impl RepoProvisioner for StubProvisioner {
        fn provision(&self, spec: &ProjectSpec) -> Result<ProvisionedRepo> {
            if self.fail {
                return Err(VoicespecError::RepoExists(spec.repo_name()));
            }
            Ok(ProvisionedRepo {
                repo_url: format!("https://github.com/octo/{}", spec.repo_name()),
                repo_owner: "octo".into(),
                local_repo_path: self.local.clone(),
                claude_md_content: render_context(spec),
                initial_files_created: vec!["CLAUDE.md".into()],
            })
        }
    }

    enum AgentBehavior {
        Succeed,
        TimeOut,
        Exit,
    }

    struct StubAgent(AgentBehavior);

    impl CodingAgent for StubAgent {
        fn execute(&self, _instruction: &Path, _repo: &Path) -> Result<AgentOutcome> {
            match self.0 {
                AgentBehavior::Succeed => Ok(AgentOutcome::default()),
                AgentBehavior::TimeOut => Err(VoicespecError::AgentTimeout { secs: 600 }),
                AgentBehavior::Exit => Err(claude_agent::ClaudeAgentError::Exit {
                    code: Some(2),
                    stderr: "usage limit reached".into(),
                }
                .into()),
            }
        }
    }

    struct StubInspector(Vec<&'static str>);

    impl RepoInspector for StubInspector {
        fn head_commit(&self, _repo: &Path) -> Result<String> {
            Ok("9fceb02d0ae598e95dc970b74767f19372d61af8".into())
        }

        fn tracked_files(&self, _repo: &Path) -> Result<Vec<String>> {
            Ok(self.0.iter().map(|s| s.to_string()).collect())
        }
    }

    struct Fixture {
        dir: TempDir,
        audio: PathBuf,
        repo: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let audio = dir.path().join("idea.mp3");
            std::fs::write(&audio, b"ID3").unwrap();
            let repo = dir.path().join("todo-cli");
            std::fs::create_dir_all(&repo).unwrap();
            Self { dir, audio, repo }
        }

        fn workflow(
            &self,
            json: &str,
            provision_fails: bool,
            agent: AgentBehavior,
            files: Vec<&'static str>,
        ) -> Workflow {
            Workflow::new(
                TranscriptionStage::new(StubModel(json.to_string())),
                ProvisioningStage::new(StubProvisioner {
                    local: self.repo.clone(),
                    fail: provision_fails,
                }),
                SprintStage::new(StubAgent(agent), StubInspector(files)),
            )
        }

        fn happy(&self) -> Workflow {
            self.workflow(
                VALID_JSON,
                false,
                AgentBehavior::Succeed,
                vec!["CLAUDE.md", "Cargo.toml", "src/main.rs"],
            )
        }

        fn record(&self) -> WorkflowRecord {
            prepare(&self.audio).unwrap()
        }
    }

    /// A stage with no collaborators that always fails.
    struct Failing(StageId);

    impl Stage for Failing {
        fn id(&self) -> StageId {
            self.0
        }

        fn run(&self, _record: &WorkflowRecord) -> Result<StageDelta> {
            Err(VoicespecError::Gemini {
                status: 500,
                message: format!("{} unavailable", self.0),
            })
        }
    }

    fn all_completed(record: &WorkflowRecord) -> bool {
        StageId::ALL
            .iter()
            .all(|s| record.status(*s) == StageStatus::Completed)
    }

    // ─── Routing ─────────────────────────────────────────────────────────────

    #[test]
    fn route_follows_status_only() {
        let mut record = WorkflowRecord::new("a.mp3");
        assert_eq!(route(StageId::Transcription, &record), Node::ErrorHandler);
        record.begin_stage(StageId::Transcription).unwrap();
        assert_eq!(route(StageId::Transcription, &record), Node::ErrorHandler);
        record
            .fail_stage(StageId::Transcription, &VoicespecError::EmptyModelResponse)
            .unwrap();
        assert_eq!(route(StageId::Transcription, &record), Node::ErrorHandler);
    }

    #[test]
    fn node_names_match_graph() {
        assert_eq!(Node::ENTRY.name(), "agent_1");
        assert_eq!(Node::from(StageId::Sprint).name(), "agent_3");
        assert_eq!(Node::ErrorHandler.to_string(), "error_handler");
        assert_eq!(Node::End.stage(), None);
    }

    // ─── Scenarios ───────────────────────────────────────────────────────────

    #[test]
    #[serial]
    fn all_stages_succeed() {
        let fx = Fixture::new();
        let run = fx.happy().run(fx.record());

        assert!(run.succeeded());
        assert!(run.failure.is_none());
        assert!(all_completed(&run.record));
        assert_eq!(
            run.trail,
            vec![
                Node::Transcription,
                Node::Provisioning,
                Node::Sprint,
                Node::End,
            ]
        );

        let sprint = run.record.sprint().unwrap();
        assert!(!sprint.initial_commit_sha.is_empty());
        assert!(sprint.dependencies_installed);
        assert!(sprint
            .files_created
            .iter()
            .any(|f| crate::stages::MANIFEST_FILES.contains(&f.as_str())));
        assert!(run.record.errors().is_empty());
        assert!(run
            .record
            .success_message()
            .unwrap()
            .contains("https://github.com/octo/todo-cli"));
        assert!(run.record.finished_at().is_some());
    }

    #[test]
    #[serial]
    fn success_without_manifest_reports_no_dependencies() {
        let fx = Fixture::new();
        let wf = fx.workflow(
            VALID_JSON,
            false,
            AgentBehavior::Succeed,
            vec!["README.md", "main.py"],
        );
        let run = wf.run(fx.record());
        assert!(run.succeeded());
        assert!(!run.record.sprint().unwrap().dependencies_installed);
        assert_eq!(run.record.warnings().len(), 1);
    }

    #[test]
    fn missing_audio_aborts_before_any_stage() {
        let fx = Fixture::new();
        let err = prepare(&fx.dir.path().join("missing.wav")).unwrap_err();
        assert!(matches!(err, VoicespecError::AudioNotFound(_)));
        // No record exists, so no stage ran and nothing was provisioned.
        assert!(!fx.repo.join("CLAUDE.md").exists());
    }

    #[test]
    fn malformed_spec_fails_stage_one() {
        let fx = Fixture::new();
        let wf = fx.workflow("not json at all", false, AgentBehavior::Succeed, vec![]);
        let run = wf.run(fx.record());
        let record = &run.record;

        assert!(!run.succeeded());
        assert_eq!(record.status(StageId::Transcription), StageStatus::Failed);
        assert_eq!(record.status(StageId::Provisioning), StageStatus::Pending);
        assert_eq!(record.status(StageId::Sprint), StageStatus::Pending);
        assert_eq!(record.errors().len(), 1);
        assert!(record.errors()[0].contains("not a valid project specification"));
        assert!(matches!(run.failure, Some(VoicespecError::MalformedSpec(_))));
        assert_eq!(
            run.trail,
            vec![Node::Transcription, Node::ErrorHandler, Node::End]
        );

        // Nothing from stage one leaked into the record.
        assert!(record.spec().is_none());
        assert!(record.transcript().is_none());
    }

    #[test]
    fn provisioning_failure_skips_sprint() {
        let fx = Fixture::new();
        let wf = fx.workflow(VALID_JSON, true, AgentBehavior::Succeed, vec![]);
        let run = wf.run(fx.record());

        assert!(!run.succeeded());
        assert!(run.record.spec().is_some());
        assert_eq!(run.record.status(StageId::Provisioning), StageStatus::Failed);
        assert_eq!(run.record.status(StageId::Sprint), StageStatus::Pending);
        let first = &run.record.errors()[0];
        assert!(first.starts_with("provisioning failed: repository already exists"));
        assert_eq!(
            run.trail,
            vec![
                Node::Transcription,
                Node::Provisioning,
                Node::ErrorHandler,
                Node::End,
            ]
        );
    }

    #[test]
    #[serial]
    fn sprint_timeout_restores_cwd() {
        let before = std::env::current_dir().unwrap();
        let fx = Fixture::new();
        let wf = fx.workflow(VALID_JSON, false, AgentBehavior::TimeOut, vec![]);
        let run = wf.run(fx.record());

        assert_eq!(std::env::current_dir().unwrap(), before);
        assert!(!run.succeeded());
        assert_eq!(run.record.status(StageId::Sprint), StageStatus::Failed);
        assert_eq!(run.record.errors().len(), 1);
        assert!(run.record.errors()[0].contains("timeout"));
        assert!(run.failure.as_ref().unwrap().is_timeout());
        assert_eq!(run.trail.last(), Some(&Node::End));
        assert!(run.trail.contains(&Node::ErrorHandler));
        // Partial progress stays.
        assert!(run.record.repository().is_some());
        assert!(run.record.sprint().is_none());
    }

    #[test]
    #[serial]
    fn sprint_exit_keeps_stderr() {
        let fx = Fixture::new();
        let wf = fx.workflow(VALID_JSON, false, AgentBehavior::Exit, vec![]);
        let run = wf.run(fx.record());
        assert!(!run.succeeded());
        assert!(run.record.errors()[0].starts_with("sprint failed:"));
        assert!(run.record.errors()[0].contains("usage limit reached"));
    }

    #[test]
    #[serial]
    fn identical_inputs_give_identical_specs() {
        let fx = Fixture::new();
        let first = fx.happy().run(fx.record());
        let second = fx.happy().run(fx.record());
        let (a, b) = (first.record.spec().unwrap(), second.record.spec().unwrap());
        assert_eq!(a.project_name, b.project_name);
        assert_eq!(a.features, b.features);
        assert_eq!(a.dev_specification, b.dev_specification);
        assert_ne!(first.record.run_id(), second.record.run_id());
    }

    // ─── Invariants ──────────────────────────────────────────────────────────

    #[test]
    #[serial]
    fn completed_iff_every_stage_completed() {
        let fx = Fixture::new();
        let runs = vec![
            fx.happy().run(fx.record()),
            fx.workflow("{}", false, AgentBehavior::Succeed, vec![])
                .run(fx.record()),
            fx.workflow(VALID_JSON, true, AgentBehavior::Succeed, vec![])
                .run(fx.record()),
            fx.workflow(VALID_JSON, false, AgentBehavior::TimeOut, vec![])
                .run(fx.record()),
        ];
        for run in &runs {
            assert_eq!(run.record.completed(), all_completed(&run.record));
        }
        assert_eq!(runs.iter().filter(|r| r.succeeded()).count(), 1);
    }

    #[test]
    #[serial]
    fn statuses_are_terminal_or_untouched() {
        let fx = Fixture::new();
        let run = fx
            .workflow(VALID_JSON, false, AgentBehavior::TimeOut, vec![])
            .run(fx.record());
        for stage in StageId::ALL {
            let status = run.record.status(stage);
            assert!(status.is_terminal() || status == StageStatus::Pending);
        }
        // No stage node appears twice.
        for node in [Node::Transcription, Node::Provisioning, Node::Sprint] {
            assert!(run.trail.iter().filter(|n| **n == node).count() <= 1);
        }
    }

    #[test]
    fn first_failure_reaches_error_handler() {
        let wf = Workflow::new(
            Failing(StageId::Transcription),
            Failing(StageId::Provisioning),
            Failing(StageId::Sprint),
        );
        let run = wf.run(WorkflowRecord::new("a.mp3"));
        assert_eq!(
            run.record.errors(),
            ["transcription failed: Gemini API error: transcription unavailable (status: 500)"]
        );
        assert_eq!(run.record.current_node(), "agent_1");
        assert!(!run.record.completed());
        assert_eq!(
            run.trail,
            vec![Node::Transcription, Node::ErrorHandler, Node::End]
        );
    }
}
