//! vpsup CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vpsup::cli::{Cli, CommandContext, CommandDispatcher, Commands};
use vpsup::shell::is_ci;
use vpsup::ui::{create_ui, should_use_colors, OutputMode};

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is INFO
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("vpsup=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vpsup=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    tracing::debug!("vpsup starting with args: {:?}", cli);

    let output_mode = OutputMode::from_flags(cli.verbose, cli.quiet);

    if cli.no_color {
        std::env::set_var("NO_COLOR", "1");
    }
    let colors = !cli.no_color && should_use_colors();

    let cwd = std::env::current_dir().unwrap_or_default();

    let is_interactive = match &cli.command {
        Some(Commands::Run(args)) => !args.non_interactive && !is_ci(),
        _ => !is_ci(),
    };

    let mut ui = create_ui(is_interactive, output_mode, colors);

    let dispatcher = CommandDispatcher::new(CommandContext::for_process(cli.config.as_deref(), &cwd));

    match dispatcher.dispatch(&cli, ui.as_mut()) {
        Ok(result) => ExitCode::from(result.exit_code as u8),
        Err(e) => {
            ui.error(&format!("Error: {}", e));
            ExitCode::from(1)
        }
    }
}
