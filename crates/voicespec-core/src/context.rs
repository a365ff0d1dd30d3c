//! The `CLAUDE.md` context document seeded into every new repository.

use crate::prompt::{numbered, tech_lines};
use crate::spec::ProjectSpec;

pub fn render_context(spec: &ProjectSpec) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", spec.project_name));
    out.push_str(&format!("{}\n\n", spec.project_description.trim()));

    out.push_str("## Specification\n\n");
    out.push_str(spec.dev_specification.trim());
    out.push_str("\n\n");

    out.push_str("## Technical Requirements\n\n");
    out.push_str(&tech_lines(&spec.tech_requirements));
    out.push_str("\n\n");

    out.push_str("## Features\n\n");
    if spec.features.is_empty() {
        out.push_str("_No features were identified in the dictation._\n");
    } else {
        out.push_str(&numbered(&spec.features));
        out.push('\n');
    }

    out.push_str(
        "\n## Origin\n\n\
This repository was provisioned from a dictated specification. Treat this file \
as the source of truth for scope; keep it current as the project evolves.\n",
    );
    out
}
