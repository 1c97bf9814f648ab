//! The [`Step`] trait and what a step gets to work with.

use crate::config::ConfigSnapshot;
use crate::error::{ProbeError, StepError};
use crate::probe::StateProbe;
use crate::system::{ExecIdentity, RunAs, SystemOps};

/// How the executor treats a failed apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failure and halt the run.
    Fatal,
    /// Record the failure as a skip and keep going.
    Tolerated,
}

/// Source of secrets the configuration did not provide.
pub trait SecretPrompt {
    /// Ask for a secret. `Ok(None)` when nobody can answer.
    fn read_secret(&mut self, question: &str) -> std::io::Result<Option<String>>;
}

/// Prompt that never answers (non-interactive runs).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrompt;

impl SecretPrompt for NoPrompt {
    fn read_secret(&mut self, _question: &str) -> std::io::Result<Option<String>> {
        Ok(None)
    }
}

/// Everything a step's apply action may use.
pub struct ApplyContext<'a> {
    /// Mutating operations.
    pub system: &'a dyn SystemOps,
    /// Read-only inspection, for facts needed while applying.
    pub probe: &'a dyn StateProbe,
    /// Account bound to the step's declared identity.
    pub run_as: RunAs,
    /// Where to ask for missing secrets.
    pub prompt: &'a mut dyn SecretPrompt,
}

impl ApplyContext<'_> {
    /// Run a script as the step's identity.
    pub fn run_script(&self, script: &str) -> Result<(), StepError> {
        self.system.run_script(&self.run_as, script)
    }
}

/// One idempotent provisioning action.
///
/// `is_satisfied` must be read-only. After a successful `apply`, it must
/// report `true` for the same configuration so a rerun skips the step.
pub trait Step {
    /// Stable, unique identifier (`create-user`).
    fn id(&self) -> &'static str;

    /// Short human-readable title.
    fn title(&self) -> &'static str;

    /// Steps that must come earlier in the registry.
    fn prerequisites(&self) -> &'static [&'static str] {
        &[]
    }

    /// Identity the step's actions run as.
    fn identity(&self) -> ExecIdentity {
        ExecIdentity::Root
    }

    /// Whether the configuration asks for this step at all.
    fn enabled(&self, _config: &ConfigSnapshot) -> bool {
        true
    }

    /// How a failed apply is treated.
    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Fatal
    }

    /// Whether the step's effect already holds.
    fn is_satisfied(
        &self,
        config: &ConfigSnapshot,
        probe: &dyn StateProbe,
    ) -> Result<bool, ProbeError>;

    /// Bring the system to the state `is_satisfied` checks for.
    fn apply(&self, config: &ConfigSnapshot, ctx: &mut ApplyContext<'_>) -> Result<(), StepError>;
}

impl std::fmt::Debug for dyn Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step").field("id", &self.id()).finish()
    }
}
