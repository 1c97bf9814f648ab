//! Routing from parsed arguments to subcommands.
//!
//! Every subcommand is a [`Command`] built from a shared [`CommandContext`]
//! and returns a [`CommandResult`] carrying its exit code.

use std::path::Path;

use crate::cli::args::{Cli, Commands, RunArgs};
use crate::config::{ConfigResolver, ConfigSnapshot};
use crate::error::Result;
use crate::ui::UserInterface;

use super::EXIT_CONFIG;

/// A vpsup subcommand.
pub trait Command {
    /// Run the subcommand. `Err` is reserved for failures the command cannot
    /// report itself; expected failures come back as a non-zero exit code.
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult>;
}

/// Outcome of a subcommand, mapped to the process exit status by `main`.
#[derive(Debug)]
pub struct CommandResult {
    pub success: bool,
    pub exit_code: i32,
}

impl CommandResult {
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// A failure exiting with `exit_code` (see [`super::EXIT_CONFIG`]).
    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Shared inputs for commands.
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    resolver: ConfigResolver,
}

impl CommandContext {
    /// Context resolving configuration with the given resolver.
    pub fn new(resolver: ConfigResolver) -> Self {
        Self { resolver }
    }

    /// Context for the running process.
    pub fn for_process(config: Option<&Path>, cwd: &Path) -> Self {
        Self::new(ConfigResolver::for_process(config, cwd))
    }

    /// The resolver commands use.
    pub fn resolver(&self) -> &ConfigResolver {
        &self.resolver
    }

    /// Resolve the configuration, reporting failures on `ui`.
    ///
    /// Returns the exit code to use on `Err`.
    pub fn resolve(&self, ui: &mut dyn UserInterface) -> std::result::Result<ConfigSnapshot, i32> {
        self.resolver.resolve().map_err(|e| {
            ui.error(&format!("Configuration error: {}", e));
            EXIT_CONFIG
        })
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    context: CommandContext,
}

impl CommandDispatcher {
    /// Create a new dispatcher.
    pub fn new(context: CommandContext) -> Self {
        Self { context }
    }

    /// Get the shared context.
    pub fn context(&self) -> &CommandContext {
        &self.context
    }

    /// Run the subcommand named on the command line. A bare `vpsup` is
    /// `vpsup run`.
    pub fn dispatch(&self, cli: &Cli, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        self.command_for(cli.command.as_ref()).execute(ui)
    }

    fn command_for(&self, command: Option<&Commands>) -> Box<dyn Command> {
        use super::{completions, config, list, run, status};

        let context = self.context.clone();
        match command {
            Some(Commands::Run(args)) => Box::new(run::RunCommand::new(context, args.clone())),
            Some(Commands::Status(args)) => {
                Box::new(status::StatusCommand::new(context, args.clone()))
            }
            Some(Commands::List(args)) => Box::new(list::ListCommand::new(context, args.clone())),
            Some(Commands::Config(args)) => {
                Box::new(config::ConfigCommand::new(context, args.clone()))
            }
            Some(Commands::Completions(args)) => {
                Box::new(completions::CompletionsCommand::new(args.clone()))
            }
            None => Box::new(run::RunCommand::new(context, RunArgs::default())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::MockUI;
    use std::collections::HashMap;

    #[test]
    fn command_result_success() {
        let result = CommandResult::success();
        assert!(result.success);
        assert_eq!(result.exit_code, 0);
    }

    #[test]
    fn command_result_failure() {
        let result = CommandResult::failure(1);
        assert!(!result.success);
        assert_eq!(result.exit_code, 1);
    }

    #[test]
    fn context_reports_config_errors() {
        let env = HashMap::from([("VPSUP_SSH_PORT".to_string(), "ssh".to_string())]);
        let context = CommandContext::new(ConfigResolver::new().with_env(env));
        let mut ui = MockUI::new();

        assert_eq!(context.resolve(&mut ui).unwrap_err(), EXIT_CONFIG);
        assert!(ui.has_error("SSH_PORT"));
    }

    #[test]
    fn dispatcher_keeps_context() {
        let context = CommandContext::new(ConfigResolver::new().with_override_file("/x.conf"));
        let dispatcher = CommandDispatcher::new(context);
        assert_eq!(
            dispatcher.context().resolver().override_file(),
            Some(Path::new("/x.conf"))
        );
    }
}
