//! Credence CLI: verify credence-annotated argument maps from the terminal.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Credence: consistency checks and crux analysis for argument graphs
#[derive(Parser, Debug)]
#[command(name = "credence", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (where `.credence/config.toml` is looked up)
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Configuration file path, replacing the layered lookup
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Verify an argument document and print the report
    Verify(VerifyArgs),
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug, Default)]
struct VerifyArgs {
    /// Document to verify (.json, .yaml or .yml)
    file: PathBuf,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Treat the input as an Argdown JSON export
    #[arg(long)]
    argdown: bool,

    /// Clamp boundary for log-odds aggregation
    #[arg(long)]
    epsilon: Option<f64>,

    /// Allowed distance of contradictory credences' sum from 1
    #[arg(long)]
    contradiction_tolerance: Option<f64>,

    /// Perturbation size for crux analysis
    #[arg(long)]
    delta: Option<f64>,

    /// How support and attack are combined into a claim's credence
    #[arg(long, value_enum)]
    aggregation: Option<AggregationArg>,

    /// Skip crux analysis
    #[arg(long)]
    no_crux: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum AggregationArg {
    LogOddsSum,
    Weighted,
    Mean,
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Write a default configuration to `.credence/config.toml`
    Init,
    /// Show the effective configuration
    Show,
}

fn main() -> anyhow::Result<ExitCode> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    // Human-readable layer for stderr (always active)
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    // JSON file layer for structured logging
    let log_dir = directories::ProjectDirs::from("dev", "credence", "credence")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "credence.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    // Resolve workspace
    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let findings = commands::handle_command(cli.command, &workspace, cli.config.as_deref())?;
    Ok(if findings {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
