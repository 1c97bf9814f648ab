//! A recording [`UserInterface`] for command tests.
//!
//! Nothing is printed; every call is kept so tests can assert on what a
//! command would have shown.
//!
//! # Example
//!
//! ```
//! use vpsup::ui::{MockUI, UserInterface};
//!
//! let mut ui = MockUI::new();
//! ui.message("Starting");
//! ui.success("Host is provisioned");
//!
//! assert!(ui.has_message("Starting"));
//! assert_eq!(ui.successes(), ["Host is provisioned"]);
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use crate::steps::{ReportEntry, RunReport};

use super::{OutputMode, SpinnerHandle, UserInterface};

/// Records messages, spinners and report output instead of printing them.
#[derive(Debug, Default)]
pub struct MockUI {
    mode: OutputMode,
    interactive: bool,
    messages: Vec<String>,
    successes: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
    headers: Vec<String>,
    spinners: Vec<String>,
    entries: Vec<ReportEntry>,
    summaries: Vec<RunReport>,
    finished: Rc<RefCell<Vec<String>>>,
}

impl MockUI {
    /// A non-interactive mock in [`OutputMode::Normal`].
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: OutputMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Pretend to be (or not be) attached to a TTY.
    pub fn set_interactive(&mut self, interactive: bool) {
        self.interactive = interactive;
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn successes(&self) -> &[String] {
        &self.successes
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Messages spinners were started with.
    pub fn spinners(&self) -> &[String] {
        &self.spinners
    }

    /// Final spinner lines, prefixed `ok:`, `error:` or `skipped:`.
    pub fn finished_spinners(&self) -> Vec<String> {
        self.finished.borrow().clone()
    }

    /// Entries shown without a spinner.
    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn summaries(&self) -> &[RunReport] {
        &self.summaries
    }

    pub fn has_message(&self, msg: &str) -> bool {
        self.messages.iter().any(|m| m.contains(msg))
    }

    pub fn has_warning(&self, msg: &str) -> bool {
        self.warnings.iter().any(|m| m.contains(msg))
    }

    pub fn has_error(&self, msg: &str) -> bool {
        self.errors.iter().any(|m| m.contains(msg))
    }
}

impl UserInterface for MockUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn message(&mut self, msg: &str) {
        self.messages.push(msg.to_string());
    }

    fn success(&mut self, msg: &str) {
        self.successes.push(msg.to_string());
    }

    fn warning(&mut self, msg: &str) {
        self.warnings.push(msg.to_string());
    }

    fn error(&mut self, msg: &str) {
        self.errors.push(msg.to_string());
    }

    fn show_header(&mut self, title: &str) {
        self.headers.push(title.to_string());
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        self.spinners.push(message.to_string());
        Box::new(MockSpinner {
            finished: Rc::clone(&self.finished),
        })
    }

    fn show_entry(&mut self, entry: &ReportEntry) {
        self.entries.push(entry.clone());
    }

    fn show_summary(&mut self, report: &RunReport) {
        self.summaries.push(report.clone());
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }
}

/// Spinner that records how it finished.
pub struct MockSpinner {
    finished: Rc<RefCell<Vec<String>>>,
}

impl SpinnerHandle for MockSpinner {
    fn set_message(&mut self, _msg: &str) {}

    fn finish_success(&mut self, msg: &str) {
        self.finished.borrow_mut().push(format!("ok: {}", msg));
    }

    fn finish_error(&mut self, msg: &str) {
        self.finished.borrow_mut().push(format!("error: {}", msg));
    }

    fn finish_skipped(&mut self, msg: &str) {
        self.finished.borrow_mut().push(format!("skipped: {}", msg));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_messages_by_kind() {
        let mut ui = MockUI::new();
        ui.message("hello");
        ui.warning("careful");
        ui.error("broken");

        assert!(ui.has_message("hell"));
        assert!(ui.has_warning("careful"));
        assert!(ui.has_error("broken"));
        assert!(ui.successes().is_empty());
    }

    #[test]
    fn spinners_record_their_finish() {
        let mut ui = MockUI::new();
        let mut spinner = ui.start_spinner("Installing Docker");
        spinner.finish_success("install-docker");

        assert_eq!(ui.spinners(), ["Installing Docker"]);
        assert_eq!(ui.finished_spinners(), vec!["ok: install-docker"]);
    }

    #[test]
    fn interactive_flag_is_settable() {
        let mut ui = MockUI::with_mode(OutputMode::Quiet);
        assert!(!ui.is_interactive());
        ui.set_interactive(true);
        assert!(ui.is_interactive());
        assert_eq!(ui.output_mode(), OutputMode::Quiet);
    }
}
