//! Mutating collaborators: package manager, accounts, services, files and
//! installer endpoints.
//!
//! Steps never touch the host directly. Everything they change goes through
//! [`SystemOps`], so the same step code runs against [`HostSystem`] on a real
//! machine and against [`MockSystem`] in tests.

pub mod backup;
pub mod firewall;
pub mod host;
pub mod installer;
pub mod mock;
pub mod profile;
pub mod sshd;

pub use backup::backup_path;
pub use firewall::{FirewallRule, FirewallStatus};
pub use host::HostSystem;
pub use installer::InstallerFetcher;
pub use mock::{MockEffect, MockSystem};
pub use profile::{upsert_block, ProfileBlock};
pub use sshd::{harden_sshd_config, hardening_dropin, EffectiveSshd, SshdSettings};

use std::path::{Path, PathBuf};

use crate::config::ConfigSnapshot;
use crate::error::StepError;

/// Package cache rewritten by every successful `apt-get update`.
pub const APT_PKGCACHE: &str = "/var/cache/apt/pkgcache.bin";

/// Identity a step declares it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecIdentity {
    /// Runs as root.
    Root,
    /// Runs as the configured login user.
    TargetUser,
}

impl ExecIdentity {
    /// Bind the identity to a concrete account.
    pub fn resolve(self, config: &ConfigSnapshot) -> RunAs {
        match self {
            ExecIdentity::Root => RunAs::Root,
            ExecIdentity::TargetUser => RunAs::User(config.username().to_string()),
        }
    }
}

impl std::fmt::Display for ExecIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecIdentity::Root => write!(f, "root"),
            ExecIdentity::TargetUser => write!(f, "user"),
        }
    }
}

/// A concrete account that scripts run as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunAs {
    Root,
    User(String),
}

impl std::fmt::Display for RunAs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunAs::Root => write!(f, "root"),
            RunAs::User(name) => write!(f, "{}", name),
        }
    }
}

/// Ownership and mode applied to a written file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOwner {
    /// Owning user; `None` leaves the file owned by root.
    pub user: Option<String>,
    /// Permission bits.
    pub mode: u32,
}

impl FileOwner {
    /// Root-owned, world-readable.
    pub fn root(mode: u32) -> Self {
        Self { user: None, mode }
    }

    /// Owned by `user` (and the user's primary group).
    pub fn user(user: &str, mode: u32) -> Self {
        Self {
            user: Some(user.to_string()),
            mode,
        }
    }
}

/// Operations that change the host.
///
/// Every method either completes or returns a [`StepError`]; none of them
/// retry. Implementations take `&self` so one value can serve as both the
/// probe and the mutator in a run.
pub trait SystemOps {
    /// Refresh package lists and upgrade installed packages.
    fn update_packages(&self) -> Result<(), StepError>;

    /// Install packages non-interactively.
    fn install_packages(&self, packages: &[String]) -> Result<(), StepError>;

    /// Create a login user with a home directory.
    fn create_user(&self, name: &str, shell: &str) -> Result<(), StepError>;

    /// Add a user to a supplementary group.
    fn add_to_group(&self, user: &str, group: &str) -> Result<(), StepError>;

    /// Set a user's password.
    fn set_password(&self, user: &str, password: &str) -> Result<(), StepError>;

    /// Enable a service and start it now.
    fn enable_service(&self, service: &str) -> Result<(), StepError>;

    /// Restart a running service.
    fn restart_service(&self, service: &str) -> Result<(), StepError>;

    /// Fetch an installer script and pipe it to `bash` as `run_as`.
    fn run_installer(&self, run_as: &RunAs, url: &str, args: &[String]) -> Result<(), StepError>;

    /// Run a shell script as `run_as` (a login shell for a user).
    fn run_script(&self, run_as: &RunAs, script: &str) -> Result<(), StepError>;

    /// Run a program as root.
    fn run_command(&self, program: &str, args: &[String]) -> Result<(), StepError>;

    /// Write a file, creating parent directories with the same owner.
    fn write_file(&self, path: &Path, content: &str, owner: &FileOwner) -> Result<(), StepError>;

    /// Copy a file to a fresh timestamped backup and return its path.
    fn backup_file(&self, path: &Path) -> Result<PathBuf, StepError>;

    /// Insert a marker-delimited block unless its opening marker exists.
    ///
    /// Returns `true` when the file changed.
    fn upsert_block(
        &self,
        path: &Path,
        block: &ProfileBlock,
        owner: &FileOwner,
    ) -> Result<bool, StepError>;
}
