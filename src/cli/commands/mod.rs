//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results.
//!
//! Exit codes: 0 on success, 1 when a step fails or the run is refused,
//! 2 when the configuration cannot be resolved or a step id is unknown,
//! 130 when interrupted.

pub mod completions;
pub mod config;
pub mod dispatcher;
pub mod list;
pub mod run;
pub mod status;

pub use dispatcher::{Command, CommandContext, CommandDispatcher, CommandResult};

/// Exit code for configuration and usage errors.
pub const EXIT_CONFIG: i32 = 2;

/// Exit code after Ctrl-C.
pub const EXIT_INTERRUPTED: i32 = 130;
