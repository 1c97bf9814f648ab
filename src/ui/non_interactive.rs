//! Plain line-oriented UI for CI, pipes and `--non-interactive`.

use crate::steps::{format_duration, ReportEntry, RunReport};

use super::{summary_counts, OutputMode, SpinnerHandle, UserInterface};

/// UI that never draws spinners or asks questions.
///
/// Status goes to stdout; warnings and errors go to stderr, so a
/// `--format json` document on stdout stays parseable.
pub struct NonInteractiveUI {
    mode: OutputMode,
}

impl NonInteractiveUI {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }
}

impl UserInterface for NonInteractiveUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn message(&mut self, msg: &str) {
        println!("{}", msg);
    }

    fn success(&mut self, msg: &str) {
        if self.mode.shows_progress() {
            println!("✓ {}", msg);
        }
    }

    fn warning(&mut self, msg: &str) {
        eprintln!("⚠ {}", msg);
    }

    fn error(&mut self, msg: &str) {
        eprintln!("✗ {}", msg);
    }

    fn show_header(&mut self, title: &str) {
        if self.mode.shows_progress() {
            println!("== {} ==", title);
        }
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        if self.mode.shows_progress() {
            println!("… {}", message);
        }
        Box::new(StepLine {
            progress: self.mode.shows_progress(),
        })
    }

    fn show_entry(&mut self, entry: &ReportEntry) {
        if self.mode.shows_progress() {
            println!("{}", entry.summary_line());
        }
    }

    fn show_summary(&mut self, report: &RunReport) {
        println!(
            "Summary: {} ({})",
            summary_counts(report),
            format_duration(report.total_duration())
        );
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

/// Stands in for a spinner: prints the step's final line and nothing else.
struct StepLine {
    progress: bool,
}

impl SpinnerHandle for StepLine {
    fn set_message(&mut self, _msg: &str) {}

    fn finish_success(&mut self, msg: &str) {
        if self.progress {
            println!("✓ {}", msg);
        }
    }

    fn finish_error(&mut self, msg: &str) {
        eprintln!("✗ {}", msg);
    }

    fn finish_skipped(&mut self, msg: &str) {
        if self.progress {
            println!("{}", msg);
        }
    }
}
