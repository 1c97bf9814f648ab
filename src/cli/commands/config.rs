//! Config command implementation.
//!
//! The `vpsup config` command shows the resolved configuration and where
//! each value came from. Secrets are masked.

use serde_json::{json, Map, Value};

use crate::cli::args::ConfigArgs;
use crate::config::ConfigSnapshot;
use crate::error::Result;
use crate::ui::theme::VpsupTheme;
use crate::ui::{should_use_colors, UserInterface};

use super::dispatcher::{Command, CommandContext, CommandResult};

/// The config command implementation.
pub struct ConfigCommand {
    context: CommandContext,
    args: ConfigArgs,
}

impl ConfigCommand {
    /// Create a new config command.
    pub fn new(context: CommandContext, args: ConfigArgs) -> Self {
        Self { context, args }
    }

    /// Get the command arguments.
    pub fn args(&self) -> &ConfigArgs {
        &self.args
    }

    fn to_json(&self, config: &ConfigSnapshot) -> Value {
        let mut options = Map::new();
        for (key, resolved) in config.iter() {
            let value = if key.spec().secret {
                Value::String(config.display_value(*key))
            } else {
                serde_json::to_value(&resolved.value).unwrap_or(Value::Null)
            };
            options.insert(
                key.name().to_string(),
                json!({ "value": value, "source": resolved.source.to_string() }),
            );
        }

        json!({
            "override_file": self
                .context
                .resolver()
                .override_file()
                .map(|path| path.display().to_string()),
            "options": options,
        })
    }
}

impl Command for ConfigCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let config = match self.context.resolve(ui) {
            Ok(config) => config,
            Err(code) => return Ok(CommandResult::failure(code)),
        };

        if self.args.json {
            let rendered =
                serde_json::to_string_pretty(&self.to_json(&config)).map_err(anyhow::Error::from)?;
            ui.message(&rendered);
            return Ok(CommandResult::success());
        }

        let theme = VpsupTheme::for_colors(should_use_colors());

        match self.context.resolver().override_file() {
            Some(path) => ui.message(&format!(
                "{} {}",
                theme.dim.apply_to("# Override file:"),
                path.display()
            )),
            None => ui.message(&theme.dim.apply_to("# No override file").to_string()),
        }

        for (key, resolved) in config.iter() {
            ui.message(&format!(
                "{}={}  {}",
                theme.key.apply_to(key.name()),
                config.display_value(*key),
                theme.dim.apply_to(format!("# {}", resolved.source))
            ));
        }

        Ok(CommandResult::success())
    }
}
