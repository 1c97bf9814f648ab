//! `vpsup completions <shell>`: print a completion script to stdout.

use std::io::Write;

use clap::CommandFactory;
use clap_complete::Shell;

use crate::cli::args::{Cli, CompletionsArgs};
use crate::error::Result;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

pub struct CompletionsCommand {
    args: CompletionsArgs,
}

impl CompletionsCommand {
    pub fn new(args: CompletionsArgs) -> Self {
        Self { args }
    }
}

/// Write the completion script for `shell` into `out`.
fn write_completions(shell: Shell, out: &mut dyn Write) {
    clap_complete::generate(shell, &mut Cli::command(), "vpsup", out);
}

impl Command for CompletionsCommand {
    fn execute(&self, _ui: &mut dyn UserInterface) -> Result<CommandResult> {
        // The script goes to stdout untouched so it can be redirected or sourced.
        write_completions(self.args.shell, &mut std::io::stdout().lock());
        Ok(CommandResult::success())
    }
}
