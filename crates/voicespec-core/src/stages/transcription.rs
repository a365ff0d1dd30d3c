use super::{SpecModel, Stage};
use crate::audio::{human_size, AudioFile};
use crate::error::Result;
use crate::record::{StageDelta, StageId, StageOutput, WorkflowRecord};
use crate::spec::ProjectSpec;

/// Audio in, structured project specification out.
pub struct TranscriptionStage<M> {
    model: M,
}

impl<M: SpecModel> TranscriptionStage<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }
}

impl<M: SpecModel> Stage for TranscriptionStage<M> {
    fn id(&self) -> StageId {
        StageId::Transcription
    }

    fn run(&self, record: &WorkflowRecord) -> Result<StageDelta> {
        let audio = AudioFile::open(record.audio_file_path())?;
        tracing::info!(
            file = %audio.display_name(),
            size = %human_size(audio.size),
            "transcribing audio"
        );

        let transcript = self.model.transcribe(&audio)?;
        tracing::info!(chars = transcript.len(), "transcription complete");

        let raw = self.model.structure(&transcript)?;
        let spec = ProjectSpec::from_json(&raw)?;
        tracing::info!(
            project = %spec.project_name,
            features = spec.features.len(),
            "specification extracted"
        );

        let empty_features = spec.features.is_empty();
        let mut delta = StageDelta::new(StageOutput::Specification { transcript, spec });
        if empty_features {
            tracing::warn!("no features identified in the dictation");
            delta = delta.with_warning("no features were identified in the transcript");
        }
        Ok(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VoicespecError;
    use crate::spec::fixtures::VALID_JSON;
    use std::cell::Cell;
    use tempfile::TempDir;

    struct CannedModel {
        json: String,
        calls: Cell<u32>,
    }

    impl CannedModel {
        fn new(json: &str) -> Self {
            Self {
                json: json.to_string(),
                calls: Cell::new(0),
            }
        }
    }

    impl SpecModel for CannedModel {
        fn transcribe(&self, _audio: &AudioFile) -> Result<String> {
            self.calls.set(self.calls.get() + 1);
            Ok("build a todo cli".into())
        }

        fn structure(&self, transcript: &str) -> Result<String> {
            assert_eq!(transcript, "build a todo cli");
            self.calls.set(self.calls.get() + 1);
            Ok(self.json.clone())
        }
    }

    fn audio_record(dir: &TempDir) -> WorkflowRecord {
        let path = dir.path().join("memo.m4a");
        std::fs::write(&path, b"audio").unwrap();
        WorkflowRecord::new(path)
    }

    #[test]
    fn produces_specification_delta() {
        let dir = TempDir::new().unwrap();
        let stage = TranscriptionStage::new(CannedModel::new(VALID_JSON));
        let delta = stage.run(&audio_record(&dir)).unwrap();
        match delta.output {
            StageOutput::Specification { transcript, spec } => {
                assert_eq!(transcript, "build a todo cli");
                assert_eq!(spec.project_name, "todo-cli");
            }
            other => panic!("unexpected output: {other:?}"),
        }
        assert!(delta.warnings.is_empty());
    }

    #[test]
    fn missing_audio_fails_before_any_remote_call() {
        let model = CannedModel::new(VALID_JSON);
        let stage = TranscriptionStage::new(model);
        let err = stage
            .run(&WorkflowRecord::new("/no/such/memo.mp3"))
            .unwrap_err();
        assert!(matches!(err, VoicespecError::AudioNotFound(_)));
        assert_eq!(stage.model.calls.get(), 0);
    }

    #[test]
    fn malformed_output_is_a_spec_error() {
        let dir = TempDir::new().unwrap();
        let stage = TranscriptionStage::new(CannedModel::new("```json\n{}\n```"));
        let err = stage.run(&audio_record(&dir)).unwrap_err();
        assert!(matches!(err, VoicespecError::MalformedSpec(_)));
    }

    #[test]
    fn empty_feature_list_warns() {
        let dir = TempDir::new().unwrap();
        let json = VALID_JSON.replace(
            r#"["add todo", "list todos", "complete todo"]"#,
            "[]",
        );
        let stage = TranscriptionStage::new(CannedModel::new(&json));
        let delta = stage.run(&audio_record(&dir)).unwrap();
        assert_eq!(delta.warnings.len(), 1);
    }
}
