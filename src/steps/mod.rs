//! Provisioning steps and the engine that runs them.
//!
//! - [`Step`] - one idempotent action with a read-only satisfaction check
//! - [`StepRegistry`] - the fixed, ordered list of steps
//! - [`Executor`] - evaluates each step against the snapshot and the host
//! - [`RunReport`] - what happened to every evaluated step
//!
//! # Example
//!
//! ```no_run
//! use vpsup::config::ConfigResolver;
//! use vpsup::steps::{Executor, NoPrompt, RunOptions, StepRegistry};
//! use vpsup::system::MockSystem;
//!
//! let config = ConfigResolver::new().resolve().unwrap();
//! let registry = StepRegistry::standard().unwrap();
//! let host = MockSystem::new();
//!
//! let options = RunOptions {
//!     dry_run: true,
//!     ..Default::default()
//! };
//! let outcome = Executor::new(&registry, &host, &host).run(&config, &options, &mut NoPrompt);
//! for entry in outcome.report.entries() {
//!     println!("{}", entry.summary_line());
//! }
//! ```

pub mod builtin;
pub mod executor;
pub mod registry;
pub mod report;
pub mod step;

pub use executor::{Executor, RunOptions, RunOutcome, RunProgress};
pub use registry::{StepRegistry, StepRegistryBuilder};
pub use report::{format_duration, ReportEntry, RunReport, SkipReason, StepOutcome, StepState};
pub use step::{ApplyContext, FailurePolicy, NoPrompt, SecretPrompt, Step};
