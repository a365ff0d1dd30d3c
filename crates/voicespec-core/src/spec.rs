//! The structured project specification extracted from a transcript.

use crate::error::{Result, VoicespecError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechRequirements {
    pub languages: Vec<String>,
    pub frameworks: Vec<String>,
    pub dependencies: Vec<String>,
    pub architecture: String,
}

/// Everything Stage 1 hands to the later stages. The five fields travel
/// together, so a record either has a complete spec or none at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSpec {
    pub project_name: String,
    pub project_description: String,
    /// Markdown.
    pub dev_specification: String,
    pub tech_requirements: TechRequirements,
    pub features: Vec<String>,
}

impl ProjectSpec {
    /// Parse and validate the model's schema-constrained JSON output.
    pub fn from_json(text: &str) -> Result<Self> {
        let spec: ProjectSpec = serde_json::from_str(text.trim())
            .map_err(|e| VoicespecError::MalformedSpec(e.to_string()))?;
        spec.validate()?;
        Ok(spec)
    }

    fn validate(&self) -> Result<()> {
        if self.project_name.trim().is_empty() {
            return Err(VoicespecError::MalformedSpec(
                "project_name is empty".to_string(),
            ));
        }
        if self.dev_specification.trim().is_empty() {
            return Err(VoicespecError::MalformedSpec(
                "dev_specification is empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Repository name derived from the suggested project name.
    pub fn repo_name(&self) -> String {
        crate::paths::repo_slug(&self.project_name)
    }
}

/// Response schema passed to the model's schema-constrained generation.
///
/// Uses the OpenAPI subset accepted by `generationConfig.responseSchema`.
pub fn response_schema() -> serde_json::Value {
    let string_list = serde_json::json!({
        "type": "ARRAY",
        "items": { "type": "STRING" }
    });

    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "project_name": {
                "type": "STRING",
                "description": "Suggested kebab-case project name"
            },
            "project_description": {
                "type": "STRING",
                "description": "Brief 1-2 sentence description"
            },
            "dev_specification": {
                "type": "STRING",
                "description": "Detailed specification in markdown format"
            },
            "tech_requirements": {
                "type": "OBJECT",
                "properties": {
                    "languages": string_list,
                    "frameworks": string_list,
                    "dependencies": string_list,
                    "architecture": { "type": "STRING" }
                },
                "required": ["languages", "frameworks", "dependencies", "architecture"],
                "propertyOrdering": ["languages", "frameworks", "dependencies", "architecture"]
            },
            "features": string_list
        },
        "required": [
            "project_name",
            "project_description",
            "dev_specification",
            "tech_requirements",
            "features"
        ],
        "propertyOrdering": [
            "project_name",
            "project_description",
            "dev_specification",
            "tech_requirements",
            "features"
        ]
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub const VALID_JSON: &str = r#"{
        "project_name": "todo-cli",
        "project_description": "A terminal todo list.",
        "dev_specification": "Build a CLI that stores todos in a local file.",
        "tech_requirements": {
            "languages": ["Rust"],
            "frameworks": ["clap"],
            "dependencies": ["serde", "serde_json"],
            "architecture": "single binary"
        },
        "features": ["add todo", "list todos", "complete todo"]
    }"#;

    pub fn todo_spec() -> ProjectSpec {
        ProjectSpec::from_json(VALID_JSON).unwrap()
    }
}
