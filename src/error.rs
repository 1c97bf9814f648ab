//! Error types for vpsup operations.
//!
//! Each component has its own error enum so callers can tell the three
//! fatal failure classes apart:
//!
//! - [`ConfigError`] - the override source or a value could not be used;
//!   aborts before any step runs
//! - [`ProbeError`] - inspecting system state failed (distinct from
//!   "not present", which is a normal `false`)
//! - [`StepError`] - a step's apply action failed
//!
//! [`VpsupError`] wraps them for the CLI layer, and [`Result`] is the
//! crate-wide alias.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while resolving the configuration snapshot.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Override file exists but could not be read.
    #[error("Cannot read override file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Override file could not be parsed.
    #[error("Failed to parse override file {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    /// A key in the override source is not a recognized option.
    #[error("Unknown option '{key}' in {origin}")]
    UnknownOption { key: String, origin: String },

    /// A value does not parse as the option's type.
    #[error("Invalid value '{value}' for {key} (from {origin}): expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        origin: String,
        expected: &'static str,
    },
}

/// Errors raised by a state probe.
///
/// Absence is never a probe error.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// A file that must be inspected could not be read.
    #[error("Cannot inspect {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An inspection command could not be spawned.
    #[error("Cannot run inspection '{command}': {message}")]
    Spawn { command: String, message: String },

    /// An inspection command produced output that cannot be interpreted.
    #[error("Unexpected output from '{command}': {output}")]
    UnexpectedOutput { command: String, output: String },
}

/// Errors raised by a step's apply action.
#[derive(Debug, Error)]
pub enum StepError {
    /// A system command exited unsuccessfully.
    #[error("Command failed with exit code {code:?}: {command}{}", stderr_suffix(.stderr))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The step cannot run with the current configuration or host state.
    #[error("{0}")]
    Precondition(String),

    /// Fetching an installer script failed.
    #[error("Failed to fetch installer {url}: {message}")]
    Fetch { url: String, message: String },

    /// A probe used while applying failed.
    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// IO error while writing system files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(" ({})", trimmed)
    }
}

/// Errors raised while building a step registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Two steps share an identifier.
    #[error("Duplicate step id: {id}")]
    DuplicateStep { id: String },

    /// A prerequisite is not registered before the step that needs it.
    #[error("Step '{step}' requires '{prerequisite}', which is not registered before it")]
    PrerequisiteOutOfOrder { step: String, prerequisite: String },
}

/// Core error type for vpsup operations.
#[derive(Debug, Error)]
pub enum VpsupError {
    /// Configuration could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A probe failed outside of a run (e.g. `status`).
    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// A step failed outside of a run.
    #[error(transparent)]
    Step(#[from] StepError),

    /// The step registry is inconsistent.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The operation needs root.
    #[error("'{operation}' must be run as root (try sudo)")]
    PrivilegeRequired { operation: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for vpsup operations.
pub type Result<T> = std::result::Result<T, VpsupError>;
