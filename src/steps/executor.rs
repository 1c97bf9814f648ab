//! Step execution engine.
//!
//! Runs the registry in order. For each step: skip it if the configuration
//! disables it, skip it if its effect already holds, otherwise apply it.
//! The first fatal failure halts the run; nothing is retried or rolled back.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::ConfigSnapshot;
use crate::probe::StateProbe;
use crate::system::SystemOps;

use super::registry::StepRegistry;
use super::report::{
    format_duration, ReportEntry, RunReport, SkipReason, StepOutcome, StepState,
};
use super::step::{ApplyContext, FailurePolicy, SecretPrompt, Step};

/// Options for a run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Evaluate steps but never apply them.
    pub dry_run: bool,
    /// Only consider these steps (empty means all); others are omitted
    /// from the report.
    pub only: HashSet<String>,
    /// Apply these steps even if their effect already holds.
    pub force: HashSet<String>,
    /// Set to stop dispatching further steps.
    pub interrupt: Option<Arc<AtomicBool>>,
}

impl RunOptions {
    fn selects(&self, id: &str) -> bool {
        self.only.is_empty() || self.only.contains(id)
    }

    fn interrupted(&self) -> bool {
        self.interrupt
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

/// Progress events emitted during a run.
#[derive(Debug)]
pub enum RunProgress<'a> {
    /// A step is about to be evaluated.
    StepStarting {
        id: &'a str,
        title: &'a str,
        index: usize,
        total: usize,
    },
    /// A step moved to a new non-terminal state.
    StepState { id: &'a str, state: StepState },
    /// A step reached its outcome.
    StepFinished { entry: &'a ReportEntry },
}

/// Result of a run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Every evaluated step, in order.
    pub report: RunReport,
    /// The step that halted the run, if any.
    pub failed_step: Option<String>,
    /// Whether the run stopped because of an interrupt.
    pub interrupted: bool,
}

impl RunOutcome {
    /// Whether the run finished without a fatal failure or interrupt.
    pub fn success(&self) -> bool {
        self.failed_step.is_none() && !self.interrupted
    }
}

/// Runs a [`StepRegistry`] against a probe and a system.
pub struct Executor<'a> {
    registry: &'a StepRegistry,
    probe: &'a dyn StateProbe,
    system: &'a dyn SystemOps,
}

impl<'a> Executor<'a> {
    /// Create an executor.
    pub fn new(
        registry: &'a StepRegistry,
        probe: &'a dyn StateProbe,
        system: &'a dyn SystemOps,
    ) -> Self {
        Self {
            registry,
            probe,
            system,
        }
    }

    /// Run all steps.
    pub fn run(
        &self,
        config: &ConfigSnapshot,
        options: &RunOptions,
        prompt: &mut dyn SecretPrompt,
    ) -> RunOutcome {
        self.run_with_progress(config, options, prompt, |_| {})
    }

    /// Run all steps with a progress callback.
    pub fn run_with_progress(
        &self,
        config: &ConfigSnapshot,
        options: &RunOptions,
        prompt: &mut dyn SecretPrompt,
        mut on_progress: impl FnMut(RunProgress<'_>),
    ) -> RunOutcome {
        let mut report = RunReport::new();
        let selected: Vec<&dyn Step> = self
            .registry
            .iter()
            .filter(|s| options.selects(s.id()))
            .collect();
        let total = selected.len();

        for (index, step) in selected.into_iter().enumerate() {
            if options.interrupted() {
                tracing::warn!("Interrupted; not starting {}", step.id());
                return RunOutcome {
                    report,
                    failed_step: None,
                    interrupted: true,
                };
            }

            on_progress(RunProgress::StepStarting {
                id: step.id(),
                title: step.title(),
                index,
                total,
            });

            let start = Instant::now();
            let outcome = self.evaluate(step, config, options, prompt, &mut on_progress);
            let entry = ReportEntry {
                step_id: step.id().to_string(),
                title: step.title().to_string(),
                outcome,
                duration: start.elapsed(),
            };

            log_outcome(&entry);
            on_progress(RunProgress::StepFinished { entry: &entry });

            let failed = matches!(entry.outcome, StepOutcome::Failed { .. });
            report.push(entry);

            if failed {
                return RunOutcome {
                    report,
                    failed_step: Some(step.id().to_string()),
                    interrupted: false,
                };
            }
        }

        RunOutcome {
            report,
            failed_step: None,
            interrupted: false,
        }
    }

    fn evaluate(
        &self,
        step: &dyn Step,
        config: &ConfigSnapshot,
        options: &RunOptions,
        prompt: &mut dyn SecretPrompt,
        on_progress: &mut impl FnMut(RunProgress<'_>),
    ) -> StepOutcome {
        let id = step.id();

        if !step.enabled(config) {
            return StepOutcome::disabled();
        }

        let satisfied = match step.is_satisfied(config, self.probe) {
            Ok(satisfied) => satisfied,
            Err(e) => {
                return StepOutcome::Failed {
                    message: format!("probe failed: {}", e),
                }
            }
        };

        if satisfied {
            if options.force.contains(id) {
                tracing::debug!("{} is satisfied but forced", id);
            } else {
                return StepOutcome::satisfied();
            }
        }

        if options.dry_run {
            return StepOutcome::Planned;
        }

        on_progress(RunProgress::StepState {
            id,
            state: StepState::Applying,
        });
        tracing::info!("Applying {} as {}", id, step.identity());

        let mut ctx = ApplyContext {
            system: self.system,
            probe: self.probe,
            run_as: step.identity().resolve(config),
            prompt,
        };

        match step.apply(config, &mut ctx) {
            Ok(()) => StepOutcome::Applied,
            Err(e) => match step.failure_policy() {
                FailurePolicy::Fatal => StepOutcome::Failed {
                    message: e.to_string(),
                },
                FailurePolicy::Tolerated => StepOutcome::Skipped {
                    reason: SkipReason::Tolerated(e.to_string()),
                },
            },
        }
    }
}

fn log_outcome(entry: &ReportEntry) {
    let id = entry.step_id.as_str();
    match &entry.outcome {
        StepOutcome::Applied => {
            tracing::info!("{} applied in {}", id, format_duration(entry.duration))
        }
        StepOutcome::Planned => tracing::info!("{} would be applied", id),
        StepOutcome::Skipped { reason } => match reason {
            SkipReason::Satisfied => tracing::info!("{} already satisfied", id),
            SkipReason::DisabledByConfig => tracing::info!("{} disabled by config", id),
            SkipReason::Tolerated(message) => {
                tracing::warn!("{} failed (tolerated): {}", id, message)
            }
        },
        StepOutcome::Failed { message } => tracing::error!("{} failed: {}", id, message),
    }
}
