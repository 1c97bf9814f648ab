//! Run command implementation.
//!
//! The `vpsup run` command provisions the host.

use std::path::Path;
use std::rc::Rc;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use serde::Serialize;

use crate::cli::args::{ReportFormat, RunArgs};
use crate::config::ConfigSnapshot;
use crate::error::{Result, VpsupError};
use crate::probe::{HostProbe, StateProbe};
use crate::shell::{install_interrupt_handler, is_elevated, OsRelease, OS_RELEASE};
use crate::steps::{
    Executor, NoPrompt, ReportEntry, RunOptions, RunOutcome, RunProgress, SecretPrompt,
    StepOutcome, StepRegistry, StepState,
};
use crate::system::{HostSystem, SystemOps};
use crate::ui::{ActiveBar, SpinnerHandle, TerminalPrompt, UserInterface};

use super::dispatcher::{Command, CommandContext, CommandResult};
use super::{EXIT_CONFIG, EXIT_INTERRUPTED};

/// The run command implementation.
pub struct RunCommand {
    context: CommandContext,
    args: RunArgs,
}

/// The machine a run acts on.
pub struct RunTarget<'a> {
    pub probe: &'a dyn StateProbe,
    pub system: &'a dyn SystemOps,
    pub prompt: &'a mut dyn SecretPrompt,
    /// Spinner slot shared with `prompt`.
    pub active: ActiveBar,
    pub interrupt: Option<Arc<AtomicBool>>,
}

impl RunCommand {
    /// Create a new run command.
    pub fn new(context: CommandContext, args: RunArgs) -> Self {
        Self { context, args }
    }

    /// Get the command arguments.
    pub fn args(&self) -> &RunArgs {
        &self.args
    }

    /// Build run options from args.
    fn build_options(&self, interrupt: Option<Arc<AtomicBool>>) -> RunOptions {
        RunOptions {
            dry_run: self.args.dry_run,
            only: self.args.only.iter().cloned().collect(),
            force: self.args.force.iter().cloned().collect(),
            interrupt,
        }
    }

    /// Step ids named in `--only`/`--force` that the registry lacks.
    fn unknown_steps(&self, registry: &StepRegistry) -> Vec<String> {
        let mut unknown: Vec<String> = self
            .args
            .only
            .iter()
            .chain(&self.args.force)
            .filter(|id| !registry.contains(id))
            .cloned()
            .collect();
        unknown.dedup();
        unknown
    }

    /// Run against `target` with an already resolved configuration.
    ///
    /// [`Command::execute`] calls this with the real host.
    pub fn run_on(
        &self,
        ui: &mut dyn UserInterface,
        config: &ConfigSnapshot,
        target: RunTarget<'_>,
    ) -> Result<CommandResult> {
        let registry = StepRegistry::standard()?;

        let unknown = self.unknown_steps(&registry);
        if !unknown.is_empty() {
            ui.error(&format!(
                "Unknown step: {}. Run 'vpsup list' to see step ids.",
                unknown.join(", ")
            ));
            return Ok(CommandResult::failure(EXIT_CONFIG));
        }

        let json = self.args.format == ReportFormat::Json;
        let options = self.build_options(target.interrupt.clone());
        let executor = Executor::new(&registry, target.probe, target.system);

        let outcome = if json {
            executor.run(config, &options, target.prompt)
        } else {
            let header = if self.args.dry_run {
                "vpsup (dry run)"
            } else {
                "vpsup"
            };
            ui.show_header(header);
            ui.message(&format!("Provisioning for user {}", config.username()));

            let mut view = ProgressView::new(ui, target.active);
            executor.run_with_progress(config, &options, target.prompt, |event| {
                view.handle(event)
            })
        };

        if json {
            let document = RunDocument::new(&outcome, self.args.dry_run);
            let rendered = serde_json::to_string_pretty(&document).map_err(anyhow::Error::from)?;
            ui.message(&rendered);
        } else {
            ui.show_summary(&outcome.report);
        }

        if outcome.interrupted {
            ui.warning("Interrupted; remaining steps were not started");
            return Ok(CommandResult::failure(EXIT_INTERRUPTED));
        }

        if let Some(step) = &outcome.failed_step {
            ui.error(&format!("Step '{}' failed; stopping", step));
            return Ok(CommandResult::failure(1));
        }

        if !json {
            let planned = outcome.report.count(StepState::Pending);
            if self.args.dry_run {
                ui.success(&format!(
                    "Dry run complete: {} step{} would be applied",
                    planned,
                    if planned == 1 { "" } else { "s" }
                ));
            } else {
                ui.success("Host is provisioned");
            }
        }

        Ok(CommandResult::success())
    }
}

impl Command for RunCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let config = match self.context.resolve(ui) {
            Ok(config) => config,
            Err(code) => return Ok(CommandResult::failure(code)),
        };

        if !self.args.dry_run && !is_elevated() {
            return Err(VpsupError::PrivilegeRequired {
                operation: "vpsup run".to_string(),
            });
        }

        match OsRelease::load(Path::new(OS_RELEASE)) {
            Some(os) if !os.is_debian_family() => ui.warning(&format!(
                "{} is not Debian-based; apt and systemd steps may fail",
                os.display_name()
            )),
            None => ui.warning(&format!("Cannot identify the distribution ({})", OS_RELEASE)),
            _ => {}
        }

        let probe = HostProbe::new();
        let system = HostSystem::new().with_streaming(ui.output_mode().shows_command_output());
        let active = ActiveBar::default();

        let mut terminal = TerminalPrompt::new(Rc::clone(&active));
        let mut silent = NoPrompt;
        let prompt: &mut dyn SecretPrompt = if self.args.non_interactive || !ui.is_interactive() {
            &mut silent
        } else {
            &mut terminal
        };

        self.run_on(
            ui,
            &config,
            RunTarget {
                probe: &probe,
                system: &system,
                prompt,
                active,
                interrupt: Some(install_interrupt_handler()),
            },
        )
    }
}

/// Renders executor progress on the UI.
struct ProgressView<'u> {
    ui: &'u mut dyn UserInterface,
    active: ActiveBar,
    label: String,
    spinner: Option<Box<dyn SpinnerHandle>>,
}

impl<'u> ProgressView<'u> {
    fn new(ui: &'u mut dyn UserInterface, active: ActiveBar) -> Self {
        Self {
            ui,
            active,
            label: String::new(),
            spinner: None,
        }
    }

    fn handle(&mut self, event: RunProgress<'_>) {
        match event {
            RunProgress::StepStarting {
                title,
                index,
                total,
                ..
            } => {
                self.label = format!("[{}/{}] {}", index + 1, total, title);
            }
            RunProgress::StepState {
                state: StepState::Applying,
                ..
            } => {
                let spinner = self.ui.start_spinner(&self.label);
                *self.active.borrow_mut() = spinner.progress_bar();
                self.spinner = Some(spinner);
            }
            RunProgress::StepState { .. } => {}
            RunProgress::StepFinished { entry } => {
                self.active.borrow_mut().take();
                match self.spinner.take() {
                    Some(mut spinner) => match entry.outcome {
                        StepOutcome::Applied => spinner.finish_success(&entry.describe()),
                        StepOutcome::Failed { .. } => spinner.finish_error(&entry.describe()),
                        _ => spinner.finish_skipped(&entry.summary_line()),
                    },
                    None => self.ui.show_entry(entry),
                }
            }
        }
    }
}

/// `--format json` output.
#[derive(Debug, Serialize)]
struct RunDocument<'a> {
    success: bool,
    dry_run: bool,
    interrupted: bool,
    failed_step: Option<&'a str>,
    steps: &'a [ReportEntry],
}

impl<'a> RunDocument<'a> {
    fn new(outcome: &'a RunOutcome, dry_run: bool) -> Self {
        Self {
            success: outcome.success(),
            dry_run,
            interrupted: outcome.interrupted,
            failed_step: outcome.failed_step.as_deref(),
            steps: outcome.report.entries(),
        }
    }
}
