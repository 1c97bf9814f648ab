//! Interactive terminal UI.

use console::Term;
use std::io::Write;

use crate::steps::{format_duration, ReportEntry, RunReport};

use super::{
    summary_counts, NonInteractiveUI, OutputMode, ProgressSpinner, SpinnerHandle, UserInterface,
    VpsupTheme,
};

/// Styled output on a TTY, with spinners while steps apply.
pub struct TerminalUI {
    term: Term,
    theme: VpsupTheme,
    mode: OutputMode,
}

impl TerminalUI {
    pub fn new(mode: OutputMode, colors: bool) -> Self {
        Self {
            term: Term::stdout(),
            theme: VpsupTheme::for_colors(colors),
            mode,
        }
    }

    fn line(&self, text: &str) {
        writeln!(&self.term, "{}", text).ok();
    }
}

impl UserInterface for TerminalUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn message(&mut self, msg: &str) {
        self.line(msg);
    }

    fn success(&mut self, msg: &str) {
        if self.mode.shows_progress() {
            self.line(&self.theme.format_success(msg));
        }
    }

    fn warning(&mut self, msg: &str) {
        self.line(&self.theme.format_warning(msg));
    }

    fn error(&mut self, msg: &str) {
        self.line(&self.theme.format_error(msg));
    }

    fn show_header(&mut self, title: &str) {
        if self.mode.shows_progress() {
            self.line(&format!("\n{}\n", self.theme.format_header(title)));
        }
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        let spinner = if self.mode.shows_progress() {
            ProgressSpinner::new(message, self.theme.clone())
        } else {
            ProgressSpinner::hidden()
        };
        Box::new(spinner)
    }

    fn show_entry(&mut self, entry: &ReportEntry) {
        if self.mode.shows_progress() {
            self.line(&self.theme.format_entry(entry));
        }
    }

    fn show_summary(&mut self, report: &RunReport) {
        let elapsed = format!("({})", format_duration(report.total_duration()));
        self.line(&format!(
            "\n{} {} {}",
            self.theme.key.apply_to("Summary:"),
            summary_counts(report),
            self.theme.dim.apply_to(elapsed)
        ));
    }

    fn is_interactive(&self) -> bool {
        self.term.is_term()
    }
}

/// A [`TerminalUI`] when stdout is a TTY and prompting is allowed,
/// otherwise a [`NonInteractiveUI`].
pub fn create_ui(interactive: bool, mode: OutputMode, colors: bool) -> Box<dyn UserInterface> {
    if interactive && Term::stdout().is_term() {
        Box::new(TerminalUI::new(mode, colors))
    } else {
        Box::new(NonInteractiveUI::new(mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_the_requested_mode() {
        let ui = TerminalUI::new(OutputMode::Quiet, false);
        assert_eq!(ui.output_mode(), OutputMode::Quiet);
    }

    #[test]
    fn falls_back_without_interaction() {
        let ui = create_ui(false, OutputMode::Verbose, true);
        assert!(!ui.is_interactive());
        assert_eq!(ui.output_mode(), OutputMode::Verbose);
    }

    #[test]
    fn quiet_spinners_draw_nothing() {
        let mut ui = TerminalUI::new(OutputMode::Quiet, false);
        let spinner = ui.start_spinner("Install Docker");
        assert!(spinner.progress_bar().is_some_and(|bar| bar.is_hidden()));
    }
}
