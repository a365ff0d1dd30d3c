use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = "voicespec.yaml";
pub const DEFAULT_INBOX_DIR: &str = "spec/audio/to-process";
pub const DEFAULT_PROCESSED_DIR: &str = "spec/audio/processed";
pub const DEFAULT_WORKSPACE_DIR: &str = "projects";

/// Context document written into every provisioned repository.
pub const CONTEXT_FILE: &str = "CLAUDE.md";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Resolve `path` against `root` unless it is already absolute.
pub fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

// ---------------------------------------------------------------------------
// Repository names
// ---------------------------------------------------------------------------

const FALLBACK_REPO_NAME: &str = "voice-spec-project";

static NON_SLUG_RE: OnceLock<Regex> = OnceLock::new();

fn non_slug_re() -> &'static Regex {
    NON_SLUG_RE.get_or_init(|| Regex::new(r"[^a-z0-9._]+").unwrap())
}

/// Normalize a model-suggested project name into a kebab-case repository name.
pub fn repo_slug(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    let slug = non_slug_re().replace_all(&lower, "-");
    let slug = slug.trim_matches(|c| c == '-' || c == '.');
    let slug: String = slug.chars().take(100).collect();
    if slug.is_empty() {
        FALLBACK_REPO_NAME.to_string()
    } else {
        slug
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
