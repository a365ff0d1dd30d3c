//! Prompt text sent to the speech model and the coding agent.

use crate::spec::{ProjectSpec, TechRequirements};
use std::fmt::Write;

pub const TRANSCRIPTION_PROMPT: &str = "\
Please transcribe this audio recording accurately.
This is a software specification being dictated by a developer.
Include all technical details, feature requirements, and constraints mentioned.";

/// Ask the model to turn a transcript into the structured project spec. The
/// shape is enforced by the response schema; the prompt only guides content.
pub fn structuring_prompt(transcript: &str) -> String {
    format!(
        "You are a technical specification analyst. Parse the following transcript \
of a software project specification and extract structured information.

Transcript:
{transcript}

Guidelines:
- Suggest a clear, kebab-case project name
- Create a comprehensive specification that an autonomous coding agent can use
- Identify all technical requirements mentioned or implied
- List all features and functionalities
- If information is unclear, make reasonable technical decisions"
    )
}

const SPRINT_TASKS: &[&str] = &[
    "Analyze the CLAUDE.md file in this repository for full context",
    "Set up the project structure based on the technical requirements",
    "Initialize package management (requirements.txt, package.json, etc.)",
    "Create initial source code files with proper structure",
    "Implement core functionality for the main features",
    "Add comprehensive README.md with:\n   - Project description\n   - Installation instructions\n   - Usage examples\n   - Development setup",
    "Set up testing framework with initial tests",
    "Create .gitignore file appropriate for the tech stack",
    "Add any necessary configuration files",
    "Make meaningful commits as you go",
    "Ensure the project is in a working, runnable state",
];

const SPRINT_GUIDANCE: &[&str] = &[
    "Follow best practices for the chosen tech stack",
    "Write clean, well-documented code",
    "Make sure all dependencies are properly specified",
    "Create a professional, production-ready initial structure",
    "The project should be immediately usable after this initialization",
];

/// `- Languages: a, b` lines for the technical requirements block.
pub fn tech_lines(tech: &TechRequirements) -> String {
    let architecture = if tech.architecture.trim().is_empty() {
        "Not specified"
    } else {
        tech.architecture.as_str()
    };
    format!(
        "- Languages: {}\n- Frameworks: {}\n- Dependencies: {}\n- Architecture: {}",
        tech.languages.join(", "),
        tech.frameworks.join(", "),
        tech.dependencies.join(", "),
        architecture
    )
}

/// `1. feature` lines.
pub fn numbered(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {item}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The work order handed to the coding agent.
pub fn sprint_instruction(spec: &ProjectSpec) -> String {
    let mut out = String::new();
    out.push_str("Initialize this project based on the following specification.\n\n");
    let _ = writeln!(out, "PROJECT: {}\n", spec.project_name);
    let _ = writeln!(out, "DESCRIPTION:\n{}\n", spec.project_description);
    let _ = writeln!(out, "FULL SPECIFICATION:\n{}\n", spec.dev_specification);
    let _ = writeln!(
        out,
        "TECHNICAL REQUIREMENTS:\n{}\n",
        tech_lines(&spec.tech_requirements)
    );
    let _ = writeln!(out, "FEATURES TO IMPLEMENT:\n{}\n", numbered(&spec.features));

    out.push_str("TASKS:\n");
    for (i, task) in SPRINT_TASKS.iter().enumerate() {
        let _ = writeln!(out, "{}. {task}", i + 1);
    }

    out.push_str("\nIMPORTANT:\n");
    for line in SPRINT_GUIDANCE {
        let _ = writeln!(out, "- {line}");
    }

    out.push_str("\nBegin the development sprint now.\n");
    out
}
