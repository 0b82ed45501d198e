//! emitscope CLI - Replay and inspect emitter scenarios.

use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;
mod scenario;

/// Live diagnostics for event emitters
#[derive(Parser)]
#[command(name = "emitscope")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(short = 'f', long, global = true, default_value = "human")]
    pub format: OutputFormat,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Output format options.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// JSON output
    Json,
    /// Compact JSON (single line)
    JsonCompact,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Replay a scenario and print the registry report
    Replay(commands::replay::ReplayArgs),
    /// Validate a scenario file
    Validate(commands::validate::ValidateArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "emitscope_cli={level},emitscope_core={level},emitscope_observe={level},emitscope_emitter={level}",
            level = log_level
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Run the command
    let result = match cli.command {
        Commands::Replay(args) => commands::replay::execute(args, cli.format, cli.quiet),
        Commands::Validate(args) => commands::validate::execute(args, cli.format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}
