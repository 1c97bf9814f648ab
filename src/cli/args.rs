//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// vpsup - Idempotent provisioning for a fresh Debian/Ubuntu VPS.
#[derive(Debug, Parser)]
#[command(name = "vpsup")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Override file (default: ./vpsup.conf, then /etc/vpsup/vpsup.conf)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Show verbose output, including command output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Provision the host (default if no command specified)
    Run(RunArgs),

    /// Show which steps are satisfied without changing anything
    Status(StatusArgs),

    /// List steps in execution order
    List(ListArgs),

    /// Show resolved configuration and where each value came from
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Report format for `run`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// One line per step
    #[default]
    Text,
    /// The full report as JSON on stdout
    Json,
}

/// Arguments for the `run` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct RunArgs {
    /// Check every step but change nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Run only specified steps (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Apply specified steps even when already satisfied (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub force: Vec<String>,

    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Never prompt; secrets must come from configuration
    #[arg(long)]
    pub non_interactive: bool,
}

/// Arguments for the `status` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `list` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `config` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ConfigArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `completions` command.
#[derive(Debug, Clone, clap::Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
