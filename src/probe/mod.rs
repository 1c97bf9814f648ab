//! Read-only inspection of system state.
//!
//! A probe answers "is this already in place?" and nothing else. Absence is
//! a normal answer (`Ok(false)`, `Ok(None)`, an empty list); a
//! [`ProbeError`] means the inspection itself could not be carried out.

pub mod host;
pub mod parse;

pub use host::HostProbe;
pub use parse::{
    npm_spec_name, parse_node_major, parse_npm_global_packages, parse_passwd_status,
    parse_tailscale_running,
};

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ProbeError;
use crate::system::RunAs;

/// Password state reported by `passwd -S`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordStatus {
    /// A usable password is set.
    Set,
    /// The account has no password.
    NoPassword,
    /// The password is locked (fresh `useradd` accounts).
    Locked,
}

impl PasswordStatus {
    /// Whether a password still has to be set.
    pub fn needs_password(&self) -> bool {
        !matches!(self, PasswordStatus::Set)
    }
}

/// Read-only system inspection.
pub trait StateProbe {
    /// Whether an account exists.
    fn user_exists(&self, name: &str) -> Result<bool, ProbeError>;

    /// Group names of an account (empty if it does not exist).
    fn user_groups(&self, name: &str) -> Result<Vec<String>, ProbeError>;

    /// Password state, `None` if the account does not exist.
    fn password_status(&self, name: &str) -> Result<Option<PasswordStatus>, ProbeError>;

    /// Home directory, `None` if the account does not exist.
    fn user_home(&self, name: &str) -> Result<Option<PathBuf>, ProbeError>;

    /// Whether a package is installed.
    fn package_installed(&self, package: &str) -> Result<bool, ProbeError>;

    /// Whether a program is on root's PATH.
    fn command_exists(&self, program: &str) -> Result<bool, ProbeError>;

    /// Whether a service is active.
    fn service_active(&self, service: &str) -> Result<bool, ProbeError>;

    /// File content, `None` if the file does not exist.
    fn read_file(&self, path: &Path) -> Result<Option<String>, ProbeError>;

    /// Time since last modification, `None` if the file does not exist.
    fn file_age(&self, path: &Path) -> Result<Option<Duration>, ProbeError>;

    /// Run a side-effect-free inspection script as `run_as`.
    ///
    /// Returns stdout on success and `None` on a non-zero exit.
    fn capture(&self, run_as: &RunAs, script: &str) -> Result<Option<String>, ProbeError>;
}

/// Home directory of `user`, falling back to `/home/<user>`.
pub fn home_of(probe: &dyn StateProbe, user: &str) -> Result<PathBuf, ProbeError> {
    Ok(probe
        .user_home(user)?
        .unwrap_or_else(|| PathBuf::from("/home").join(user)))
}
