//! vpsup - Idempotent provisioning for a fresh Debian/Ubuntu VPS.
//!
//! vpsup walks an ordered list of provisioning steps (system update, base
//! packages, a sudo user, Docker, Tailscale, fail2ban, a firewall, Node via
//! nvm, AI CLIs, a tmux login profile, SSH keys and sshd hardening). Each
//! step first asks whether its effect already holds and is skipped if so,
//! which makes re-running safe.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Option table, override files and environment resolution
//! - [`error`] - Error types and result aliases
//! - [`probe`] - Read-only inspection of system state
//! - [`shell`] - Command execution, interrupts and platform detection
//! - [`steps`] - Steps, the registry and the executor
//! - [`system`] - Mutating operations on the host, and an in-memory mock
//! - [`ui`] - Spinners, prompts and terminal output
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use vpsup::config::ConfigResolver;
//! use vpsup::steps::{Executor, NoPrompt, RunOptions, StepOutcome, StepRegistry};
//! use vpsup::system::MockSystem;
//!
//! let env = HashMap::from([("VPSUP_USERNAME".to_string(), "deploy".to_string())]);
//! let config = ConfigResolver::new().with_env(env).resolve().unwrap();
//! let registry = StepRegistry::standard().unwrap();
//! let host = MockSystem::new();
//!
//! let options = RunOptions { dry_run: true, ..Default::default() };
//! let outcome = Executor::new(&registry, &host, &host).run(&config, &options, &mut NoPrompt);
//!
//! assert!(outcome.success());
//! assert_eq!(outcome.report.outcome("create-user"), Some(&StepOutcome::Planned));
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod probe;
pub mod shell;
pub mod steps;
pub mod system;
pub mod ui;

pub use error::{Result, VpsupError};
