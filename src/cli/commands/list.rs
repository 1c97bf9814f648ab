//! List command implementation.
//!
//! The `vpsup list` command lists steps in execution order.

use serde::Serialize;

use crate::cli::args::ListArgs;
use crate::error::Result;
use crate::steps::{FailurePolicy, StepRegistry};
use crate::system::ExecIdentity;
use crate::ui::theme::VpsupTheme;
use crate::ui::{should_use_colors, UserInterface};

use super::dispatcher::{Command, CommandContext, CommandResult};

#[derive(Debug, Serialize)]
struct StepInfo {
    id: &'static str,
    title: &'static str,
    identity: ExecIdentity,
    prerequisites: &'static [&'static str],
    failure_policy: FailurePolicy,
    enabled: bool,
}

/// The list command implementation.
pub struct ListCommand {
    context: CommandContext,
    args: ListArgs,
}

impl ListCommand {
    /// Create a new list command.
    pub fn new(context: CommandContext, args: ListArgs) -> Self {
        Self { context, args }
    }

    /// Get the command arguments.
    pub fn args(&self) -> &ListArgs {
        &self.args
    }
}

impl Command for ListCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let config = match self.context.resolve(ui) {
            Ok(config) => config,
            Err(code) => return Ok(CommandResult::failure(code)),
        };
        let registry = StepRegistry::standard()?;

        let steps: Vec<StepInfo> = registry
            .iter()
            .map(|step| StepInfo {
                id: step.id(),
                title: step.title(),
                identity: step.identity(),
                prerequisites: step.prerequisites(),
                failure_policy: step.failure_policy(),
                enabled: step.enabled(&config),
            })
            .collect();

        if self.args.json {
            let rendered = serde_json::to_string_pretty(&steps).map_err(anyhow::Error::from)?;
            ui.message(&rendered);
            return Ok(CommandResult::success());
        }

        let theme = VpsupTheme::for_colors(should_use_colors());

        ui.message(&format!("  {}", theme.key.apply_to("Steps:")));
        for (index, step) in steps.iter().enumerate() {
            let mut notes = Vec::new();
            if step.identity == ExecIdentity::TargetUser {
                notes.push(format!("as {}", config.username()));
            }
            if step.failure_policy == FailurePolicy::Tolerated {
                notes.push("failure tolerated".to_string());
            }
            if !step.enabled {
                notes.push("disabled".to_string());
            }
            let detail = if notes.is_empty() {
                String::new()
            } else {
                format!(" {}", theme.dim.apply_to(format!("({})", notes.join(", "))))
            };

            ui.message(&format!(
                "    {} {}{}",
                theme.format_counter(index, steps.len()),
                theme.highlight.apply_to(step.id),
                detail
            ));
            ui.message(&format!("        {}", theme.dim.apply_to(step.title)));

            if !step.prerequisites.is_empty() {
                ui.message(&format!(
                    "        {} {}",
                    theme.dim.apply_to("└── requires:"),
                    theme.dim.apply_to(step.prerequisites.join(", "))
                ));
            }
        }

        Ok(CommandResult::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigResolver;
    use crate::ui::MockUI;
    use std::collections::HashMap;

    fn context(pairs: &[(&str, &str)]) -> CommandContext {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CommandContext::new(ConfigResolver::new().with_env(env))
    }

    #[test]
    fn lists_steps_in_registry_order() {
        let mut ui = MockUI::new();
        let cmd = ListCommand::new(context(&[]), ListArgs::default());

        let result = cmd.execute(&mut ui).unwrap();

        assert!(result.success);
        let ids: Vec<usize> = ["system-update", "create-user", "harden-ssh"]
            .iter()
            .map(|id| ui.messages().iter().position(|m| m.contains(id)).unwrap())
            .collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert!(ui.has_message("requires:"));
    }

    #[test]
    fn marks_disabled_and_user_steps() {
        let mut ui = MockUI::new();
        let cmd = ListCommand::new(
            context(&[("VPSUP_INSTALL_DOCKER", "false"), ("VPSUP_USERNAME", "ops")]),
            ListArgs::default(),
        );

        cmd.execute(&mut ui).unwrap();

        assert!(ui
            .messages()
            .iter()
            .any(|m| m.contains("install-docker") && m.contains("disabled")));
        assert!(ui
            .messages()
            .iter()
            .any(|m| m.contains("install-node") && m.contains("as ops")));
    }

    #[test]
    fn json_output_includes_prerequisites() {
        let mut ui = MockUI::new();
        let cmd = ListCommand::new(context(&[]), ListArgs { json: true });

        cmd.execute(&mut ui).unwrap();

        let steps: serde_json::Value = serde_json::from_str(&ui.messages()[0]).unwrap();
        let harden = steps
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["id"] == "harden-ssh")
            .unwrap();
        assert_eq!(harden["prerequisites"][0], "user-sudo");
        assert_eq!(harden["identity"], "root");
        assert_eq!(harden["failure_policy"], "fatal");
    }
}
