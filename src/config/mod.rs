//! Configuration resolution for vpsup.
//!
//! - Option definitions in [`options`]
//! - Override file parsing in [`env_file`] and discovery in [`loader`]
//! - Source layering in [`env_layer`]
//! - The resolver in [`resolver`] and its output in [`snapshot`]
//!
//! # Example
//!
//! ```
//! use vpsup::config::{ConfigResolver, OptionKey};
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! let path = temp.path().join("vpsup.conf");
//! fs::write(&path, "USERNAME=alice\nINSTALL_DOCKER=no\n").unwrap();
//!
//! let snapshot = ConfigResolver::new().with_override_file(&path).resolve().unwrap();
//! assert_eq!(snapshot.username(), "alice");
//! assert!(!snapshot.bool(OptionKey::InstallDocker));
//! ```
//!
//! # Override File Locations
//!
//! 1. `--config <path>` (must exist)
//! 2. `./vpsup.conf`
//! 3. `/etc/vpsup/vpsup.conf`
//!
//! Environment variables named `VPSUP_<OPTION>` override any file value.

pub mod env_file;
pub mod env_layer;
pub mod loader;
pub mod options;
pub mod resolver;
pub mod snapshot;

pub use env_file::EnvFileParser;
pub use env_layer::{ConfigLayer, ConfigSource, LayerStack};
pub use loader::{discover_override_file, load_override_file};
pub use options::{OptionKey, OptionKind, OptionSpec, OptionValue, ENV_PREFIX, OPTIONS};
pub use resolver::ConfigResolver;
pub use snapshot::{ConfigSnapshot, ResolvedOption};
