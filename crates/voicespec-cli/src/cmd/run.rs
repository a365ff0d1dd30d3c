use crate::output::{print_json, print_list, print_table};
use anyhow::{bail, Context};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use voicespec_core::audio::{self, InboxEntry, AUDIO_EXTENSIONS};
use voicespec_core::config::{Config, Credentials, WarnLevel, REQUIRED_VARS};
use voicespec_core::gemini::GeminiClient;
use voicespec_core::git::GitInspector;
use voicespec_core::stages::{
    ClaudeCodingAgent, GitHubProvisioner, ProvisioningStage, SprintStage, TranscriptionStage,
};
use voicespec_core::workflow::{self, Workflow, WorkflowRun};
use voicespec_core::VoicespecError;

pub fn run(root: &Path, audio_file: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load voicespec.yaml")?;
    let blocking: Vec<String> = config
        .validate()
        .into_iter()
        .filter(|w| w.level == WarnLevel::Error)
        .map(|w| w.message)
        .collect();
    if !blocking.is_empty() {
        bail!("invalid configuration: {}", blocking.join("; "));
    }

    let creds = Credentials::from_env().map_err(|e| {
        if let VoicespecError::MissingCredentials(missing) = &e {
            print_missing_credentials(missing);
        }
        e
    })?;

    let audio_path = match audio_file {
        Some(path) => path.to_path_buf(),
        None => match choose_from_inbox(&config.inbox_dir(root))? {
            Some(path) => path,
            None => {
                println!("No file selected. Exiting.");
                return Ok(());
            }
        },
    };

    let record = workflow::prepare(&audio_path)
        .with_context(|| format!("cannot process {}", audio_path.display()))?;

    if !json {
        println!("Processing: {}\n", audio_path.display());
    }

    let workflow = Workflow::new(
        TranscriptionStage::new(GeminiClient::new(creds.gemini_api_key.clone(), &config.gemini)?),
        ProvisioningStage::new(GitHubProvisioner::new(creds.github_token.clone(), &config)?),
        SprintStage::new(ClaudeCodingAgent::new(config.agent.clone()), GitInspector),
    );
    let outcome = workflow.run(record);

    if json {
        print_json(&outcome.record)?;
    } else {
        report(&outcome);
    }

    if !outcome.succeeded() {
        return Err(workflow_error(outcome));
    }

    let moved = audio::move_to_processed(&audio_path, &config.processed_dir(root))
        .context("failed to move audio into the processed folder")?;
    if !json {
        println!("Moved audio file to: {}", moved.display());
    }
    Ok(())
}

/// Carry the failing stage's error chain under a summary of the run.
fn workflow_error(outcome: WorkflowRun) -> anyhow::Error {
    let summary = format!(
        "workflow did not complete at {} ({} error(s))",
        outcome.record.current_node(),
        outcome.record.errors().len()
    );
    match outcome.failure {
        Some(err) => anyhow::Error::new(err).context(summary),
        None => anyhow::anyhow!(summary),
    }
}

fn print_missing_credentials(missing: &[String]) {
    eprintln!("Missing required environment variables:");
    for (name, description) in REQUIRED_VARS {
        if missing.iter().any(|m| m == name) {
            eprintln!("  - {name}: {description}");
        }
    }
    eprintln!("Set them in the environment or in a .env file.");
}

// ---------------------------------------------------------------------------
// Inbox menu
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
enum Choice {
    Pick(usize),
    Quit,
    Invalid(String),
}

/// Interpret one line of menu input. Empty input picks the newest file.
fn parse_choice(input: &str, count: usize) -> Choice {
    let input = input.trim();
    if input.eq_ignore_ascii_case("q") {
        return Choice::Quit;
    }
    if input.is_empty() {
        return Choice::Pick(0);
    }
    match input.parse::<usize>() {
        Ok(n) if (1..=count).contains(&n) => Choice::Pick(n - 1),
        Ok(_) => Choice::Invalid(format!("Invalid selection. Please choose 1-{count}")),
        Err(_) => Choice::Invalid("Invalid input. Please enter a number or 'q' to quit".into()),
    }
}

fn choose_from_inbox(inbox: &Path) -> anyhow::Result<Option<PathBuf>> {
    let entries = audio::list_inbox(inbox)
        .with_context(|| format!("cannot read inbox {}", inbox.display()))?;

    if entries.is_empty() {
        println!("No audio files found in {}", inbox.display());
        println!("Supported formats: {}", AUDIO_EXTENSIONS.join(", "));
        return Ok(None);
    }

    println!("Available audio files:\n");
    print_table(&["#", "FILE", "SIZE", "MODIFIED"], menu_rows(&entries));
    println!();

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("Select audio file number (or 'q' to quit) [1]: ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next() else {
            // stdin closed
            return Ok(None);
        };
        match parse_choice(&line?, entries.len()) {
            Choice::Pick(i) => return Ok(Some(entries[i].path.clone())),
            Choice::Quit => return Ok(None),
            Choice::Invalid(msg) => eprintln!("{msg}"),
        }
    }
}

fn menu_rows(entries: &[InboxEntry]) -> Vec<Vec<String>> {
    entries
        .iter()
        .enumerate()
        .map(|(i, e)| {
            vec![
                (i + 1).to_string(),
                e.file_name(),
                audio::human_size(e.size),
                e.modified.format("%Y-%m-%d %H:%M").to_string(),
            ]
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

fn report(outcome: &WorkflowRun) {
    let record = &outcome.record;
    println!();
    if outcome.succeeded() {
        if let Some(message) = record.success_message() {
            println!("{message}\n");
        }
        if let Some(spec) = record.spec() {
            println!("Project details:");
            println!("  Name:          {}", spec.project_name);
            println!("  Description:   {}", spec.project_description);
            println!("  Features:      {}", spec.features.len());
        }
        if let Some(sprint) = record.sprint() {
            println!("  Files created: {}", sprint.files_created.len());
            println!(
                "  Commit:        {}",
                voicespec_core::stages::sprint::short_sha(&sprint.initial_commit_sha)
            );
        }
    } else {
        println!("Workflow failed at {}.", record.current_node());
        print_list("Errors", record.errors());
        if let Some(repo) = record.repository() {
            println!(
                "\nThe repository {} was created and left in place.",
                repo.repo_url
            );
        }
    }
    print_list("Warnings", record.warnings());
    println!();
}
