//! Command-line interface for vpsup.
//!
//! # Architecture
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations

pub mod args;
pub mod commands;

pub use args::{
    Cli, Commands, CompletionsArgs, ConfigArgs, ListArgs, ReportFormat, RunArgs, StatusArgs,
};
pub use commands::{Command, CommandContext, CommandDispatcher, CommandResult};
