pub mod audio;
pub mod config;
pub mod context;
pub mod error;
pub mod gemini;
pub mod git;
pub mod github;
pub mod io;
pub mod paths;
pub mod prompt;
pub mod record;
pub mod spec;
pub mod stages;
pub mod workdir;
pub mod workflow;

pub use error::{Result, VoicespecError};
pub use record::{StageId, StageStatus, WorkflowRecord};
pub use workflow::{Workflow, WorkflowRun};
