//! Status command implementation.
//!
//! The `vpsup status` command shows which steps already hold, using probes
//! only. It changes nothing and does not require root, although some probes
//! (another user's password state, root's keys) can only answer as root.

use serde::Serialize;

use crate::cli::args::StatusArgs;
use crate::config::ConfigSnapshot;
use crate::error::Result;
use crate::probe::{HostProbe, StateProbe};
use crate::steps::{Step, StepRegistry};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandContext, CommandResult};

/// What the probes say about one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StepStatus {
    Disabled,
    Satisfied,
    Pending,
    ProbeError(String),
}

impl StepStatus {
    /// Probe a single step.
    pub fn of(step: &dyn Step, config: &ConfigSnapshot, probe: &dyn StateProbe) -> Self {
        if !step.enabled(config) {
            return StepStatus::Disabled;
        }
        match step.is_satisfied(config, probe) {
            Ok(true) => StepStatus::Satisfied,
            Ok(false) => StepStatus::Pending,
            Err(e) => StepStatus::ProbeError(e.to_string()),
        }
    }

    fn icon(&self) -> char {
        match self {
            StepStatus::Disabled => '○',
            StepStatus::Satisfied => '✓',
            StepStatus::Pending => '◆',
            StepStatus::ProbeError(_) => '✗',
        }
    }

    fn label(&self) -> String {
        match self {
            StepStatus::Disabled => "disabled".to_string(),
            StepStatus::Satisfied => "satisfied".to_string(),
            StepStatus::Pending => "pending".to_string(),
            StepStatus::ProbeError(message) => format!("probe error: {}", message),
        }
    }
}

#[derive(Debug, Serialize)]
struct StatusRow {
    id: &'static str,
    title: &'static str,
    #[serde(flatten)]
    status: StepStatus,
}

/// The status command implementation.
pub struct StatusCommand {
    context: CommandContext,
    args: StatusArgs,
}

impl StatusCommand {
    /// Create a new status command.
    pub fn new(context: CommandContext, args: StatusArgs) -> Self {
        Self { context, args }
    }

    /// Get the command arguments.
    pub fn args(&self) -> &StatusArgs {
        &self.args
    }

    /// Report status using `probe`.
    pub fn status_with(
        &self,
        ui: &mut dyn UserInterface,
        probe: &dyn StateProbe,
    ) -> Result<CommandResult> {
        let config = match self.context.resolve(ui) {
            Ok(config) => config,
            Err(code) => return Ok(CommandResult::failure(code)),
        };
        let registry = StepRegistry::standard()?;

        let rows: Vec<StatusRow> = registry
            .iter()
            .map(|step| StatusRow {
                id: step.id(),
                title: step.title(),
                status: StepStatus::of(step, &config, probe),
            })
            .collect();

        if self.args.json {
            let rendered = serde_json::to_string_pretty(&rows).map_err(anyhow::Error::from)?;
            ui.message(&rendered);
        } else {
            ui.show_header("Status");
            let width = rows.iter().map(|r| r.id.len()).max().unwrap_or(0);
            for row in &rows {
                ui.message(&format!(
                    "  {} {:width$}  {}",
                    row.status.icon(),
                    row.id,
                    row.status.label(),
                    width = width
                ));
            }

            let pending = rows
                .iter()
                .filter(|r| r.status == StepStatus::Pending)
                .count();
            if pending == 0 {
                ui.success("Nothing to do");
            } else {
                ui.message(&format!(
                    "\n{} step{} would be applied by 'vpsup run'",
                    pending,
                    if pending == 1 { "" } else { "s" }
                ));
            }
        }

        let errors = rows
            .iter()
            .filter(|r| matches!(r.status, StepStatus::ProbeError(_)))
            .count();
        if errors > 0 {
            if !self.args.json {
                ui.warning(&format!("{} step(s) could not be inspected", errors));
            }
            return Ok(CommandResult::failure(1));
        }

        Ok(CommandResult::success())
    }
}

impl Command for StatusCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        self.status_with(ui, &HostProbe::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigResolver;
    use crate::system::MockSystem;
    use crate::ui::MockUI;
    use std::collections::HashMap;

    fn context(pairs: &[(&str, &str)]) -> CommandContext {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (format!("VPSUP_{}", k), v.to_string()))
            .collect();
        CommandContext::new(ConfigResolver::new().with_env(env))
    }

    #[test]
    fn fresh_host_lists_pending_and_disabled_steps() {
        let mock = MockSystem::new();
        let mut ui = MockUI::new();
        let cmd = StatusCommand::new(
            context(&[("INSTALL_DOCKER", "false")]),
            StatusArgs::default(),
        );

        let result = cmd.status_with(&mut ui, &mock).unwrap();

        assert!(result.success);
        assert!(ui.messages().iter().any(|m| m.contains("create-user") && m.contains("pending")));
        assert!(ui
            .messages()
            .iter()
            .any(|m| m.contains("install-docker") && m.contains("disabled")));
        assert!(ui.has_message("would be applied"));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn probe_errors_fail_the_command() {
        let mock = MockSystem::new();
        mock.make_unreadable(crate::system::APT_PKGCACHE);
        let mut ui = MockUI::new();
        let cmd = StatusCommand::new(context(&[]), StatusArgs::default());

        let result = cmd.status_with(&mut ui, &mock).unwrap();

        assert_eq!(result.exit_code, 1);
        assert!(ui
            .messages()
            .iter()
            .any(|m| m.contains("system-update") && m.contains("probe error")));
        assert!(ui.has_warning("could not be inspected"));
    }

    #[test]
    fn json_output_tags_each_step() {
        let mock = MockSystem::new();
        let mut ui = MockUI::new();
        let cmd = StatusCommand::new(
            context(&[("UPDATE_SYSTEM", "false")]),
            StatusArgs { json: true },
        );

        cmd.status_with(&mut ui, &mock).unwrap();

        let rows: serde_json::Value = serde_json::from_str(&ui.messages()[0]).unwrap();
        assert_eq!(rows[0]["id"], "system-update");
        assert_eq!(rows[0]["status"], "disabled");
        assert_eq!(rows[2]["id"], "create-user");
        assert_eq!(rows[2]["status"], "pending");
    }

    #[test]
    fn config_errors_exit_two() {
        let mock = MockSystem::new();
        let mut ui = MockUI::new();
        let cmd = StatusCommand::new(context(&[("INSTALL_DOCKER", "maybe")]), StatusArgs::default());

        let result = cmd.status_with(&mut ui, &mock).unwrap();

        assert_eq!(result.exit_code, 2);
        assert!(ui.has_error("INSTALL_DOCKER"));
    }
}
