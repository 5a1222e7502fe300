use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use testperf::issues::OutputFormat;
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "testperf")]
#[command(version, about = "Surface slow unit tests as line-level code-quality issues")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project root (defaults to the current directory)
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Match a test performance report against project sources and report slow tests
    Analyze {
        /// Path to the JSON performance report. Overrides testperf.toml.
        #[arg(short, long)]
        report: Option<String>,

        /// Report tests slower than this many milliseconds
        #[arg(long, allow_negative_numbers = true)]
        threshold_ms: Option<i64>,

        /// Set a raw property (repeatable), e.g. -D sonar.testperformance.threshold_ms=500
        #[arg(short = 'D', long = "define", value_name = "KEY=VALUE")]
        defines: Vec<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Write issues to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the rule repository and sensor descriptor as JSON
    Rules,
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default testperf.toml file
    Init,
}

/// Log to stderr; `RUST_LOG` refines the `-v` level.
fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::Analyze {
            report,
            threshold_ms,
            defines,
            format,
            output,
        } => cmd::cmd_analyze(
            &project_dir,
            report.as_deref(),
            *threshold_ms,
            defines,
            *format,
            output.as_deref(),
        )?,
        Commands::Rules => cmd::cmd_rules(&project_dir)?,
        Commands::Config { command } => cmd::cmd_config(&project_dir, command.clone())?,
    }

    Ok(())
}
