mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Exit status after Ctrl-C, as shells report SIGINT.
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Parser)]
#[command(
    name = "voicespec",
    about = "Turn a dictated project spec into a GitHub repository bootstrapped by Claude Code",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root holding voicespec.yaml and the audio inbox (default: cwd)
    #[arg(long, global = true, env = "VOICESPEC_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Defaults to `run` with an interactive pick from the inbox.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline on one audio file
    Run {
        /// Audio file (omit to choose from the inbox)
        audio_file: Option<PathBuf>,
    },

    /// Check credentials, tools, and configuration
    Check,
}

fn main() {
    // A missing .env is fine; variables may come from the shell.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let default_level = match &cli.command {
        Some(Commands::Check) => tracing::Level::WARN,
        Some(Commands::Run { .. }) | None => tracing::Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = ctrlc::set_handler(|| {
        eprintln!("\ninterrupted");
        std::process::exit(EXIT_INTERRUPTED);
    }) {
        tracing::warn!(error = %e, "could not install Ctrl-C handler");
    }

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Some(Commands::Run { audio_file }) => cmd::run::run(&root, audio_file.as_deref(), cli.json),
        None => cmd::run::run(&root, None, cli.json),
        Some(Commands::Check) => cmd::check::run(&root, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
