use crate::output::{print_json, print_table};
use anyhow::{bail, Context};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use voicespec_core::config::{self, Config, ConfigWarning, REQUIRED_VARS};
use voicespec_core::git;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct CheckItem {
    name: String,
    ok: bool,
    detail: String,
}

impl CheckItem {
    fn new(name: impl Into<String>, ok: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ok,
            detail: detail.into(),
        }
    }
}

#[derive(Serialize)]
struct CheckReport<'a> {
    checks: Vec<CheckItem>,
    config: &'a Config,
    warnings: Vec<ConfigWarning>,
    ok: bool,
}

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load voicespec.yaml")?;

    let mut checks: Vec<CheckItem> = REQUIRED_VARS
        .iter()
        .map(|(name, description)| credential_check(name, description))
        .collect();

    checks.push(match git::version() {
        Ok(v) => CheckItem::new("git", true, v),
        Err(e) => CheckItem::new("git", false, e.to_string()),
    });

    let exe = &config.agent.executable;
    checks.push(match claude_agent::locate(exe) {
        None => CheckItem::new(exe.as_str(), false, "not found on PATH"),
        Some(path) => match claude_agent::version(exe, PROBE_TIMEOUT) {
            Ok(v) => CheckItem::new(exe.as_str(), true, format!("{v} ({})", path.display())),
            Err(e) => CheckItem::new(exe.as_str(), false, e.to_string()),
        },
    });

    let warnings = config.validate();
    let ok = checks.iter().all(|c| c.ok)
        && !warnings
            .iter()
            .any(|w| w.level == config::WarnLevel::Error);

    if json {
        print_json(&CheckReport {
            checks,
            config: &config,
            warnings,
            ok,
        })?;
    } else {
        print_table(
            &["CHECK", "STATUS", "DETAIL"],
            checks
                .iter()
                .map(|c| {
                    vec![
                        c.name.clone(),
                        if c.ok { "ok" } else { "missing" }.to_string(),
                        c.detail.clone(),
                    ]
                })
                .collect(),
        );

        println!();
        println!("Gemini model:    {}", config.gemini.model);
        println!("GitHub API:      {}", config.github.api_url);
        println!("Workspace:       {}", config.workspace_dir().display());
        println!("Inbox:           {}", config.inbox_dir(root).display());
        println!("Processed:       {}", config.processed_dir(root).display());
        println!("Sprint timeout:  {}s", config.agent.timeout_secs);

        for w in &warnings {
            let tag = match w.level {
                config::WarnLevel::Error => "error",
                config::WarnLevel::Warning => "warning",
            };
            println!("{tag}: {}", w.message);
        }
    }

    if !ok {
        bail!("environment is not ready to run the pipeline");
    }
    Ok(())
}

fn credential_check(name: &str, description: &str) -> CheckItem {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => CheckItem::new(name, true, config::mask(&v)),
        _ => CheckItem::new(name, false, format!("not set ({description})")),
    }
}
