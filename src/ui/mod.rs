//! User-facing output.
//!
//! - [`UserInterface`] trait for UI abstraction
//! - [`TerminalUI`] for interactive terminal usage
//! - [`NonInteractiveUI`] for CI, pipes and `--non-interactive`
//! - [`MockUI`] for tests
//!
//! # Example
//!
//! ```
//! use vpsup::ui::{create_ui, OutputMode};
//!
//! let mut ui = create_ui(false, OutputMode::Quiet, false);
//! ui.show_header("vpsup");
//! ui.success("Provisioned");
//! ```

pub mod mock;
pub mod non_interactive;
pub mod output;
pub mod prompts;
pub mod spinner;
pub mod terminal;
pub mod theme;

pub use mock::{MockSpinner, MockUI};
pub use non_interactive::NonInteractiveUI;
pub use output::OutputMode;
pub use prompts::{ActiveBar, TerminalPrompt};
pub use spinner::ProgressSpinner;
pub use terminal::{create_ui, TerminalUI};
pub use theme::{should_use_colors, VpsupTheme};

use indicatif::ProgressBar;

use crate::steps::{ReportEntry, RunReport};

/// Trait for user interface interactions.
///
/// Commands only talk to this trait, so tests can swap in [`MockUI`].
pub trait UserInterface {
    /// Get the current output mode.
    fn output_mode(&self) -> OutputMode;

    /// Display a message to the user.
    fn message(&mut self, msg: &str);

    /// Display a success message.
    fn success(&mut self, msg: &str);

    /// Display a warning message.
    fn warning(&mut self, msg: &str);

    /// Display an error message. Shown in every mode.
    fn error(&mut self, msg: &str);

    /// Show a header/banner.
    fn show_header(&mut self, title: &str);

    /// Start a spinner for a step being applied.
    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle>;

    /// Show the final line for a step that did not need a spinner.
    fn show_entry(&mut self, entry: &ReportEntry);

    /// Show totals after a run.
    fn show_summary(&mut self, report: &RunReport);

    /// Check if running in interactive mode.
    fn is_interactive(&self) -> bool;
}

/// Handle for controlling a spinner.
pub trait SpinnerHandle {
    /// Update the spinner message.
    fn set_message(&mut self, msg: &str);

    /// Mark the operation as successful.
    fn finish_success(&mut self, msg: &str);

    /// Mark the operation as failed.
    fn finish_error(&mut self, msg: &str);

    /// Mark as skipped.
    fn finish_skipped(&mut self, msg: &str);

    /// The underlying bar, for suspending it around prompts.
    fn progress_bar(&self) -> Option<ProgressBar> {
        None
    }
}

/// One-line totals for a report (`3 applied · 12 skipped · 0 failed`).
pub fn summary_counts(report: &RunReport) -> String {
    use crate::steps::StepState;

    let mut parts = vec![
        format!("{} applied", report.count(StepState::Applied)),
        format!("{} skipped", report.count(StepState::Skipped)),
        format!("{} failed", report.count(StepState::Failed)),
    ];
    let planned = report.count(StepState::Pending);
    if planned > 0 {
        parts.insert(0, format!("{} planned", planned));
    }
    parts.join(" · ")
}
