//! Progress spinners.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use super::theme::VpsupTheme;
use super::SpinnerHandle;

/// A spinner shown while a step applies.
pub struct ProgressSpinner {
    bar: ProgressBar,
    theme: VpsupTheme,
}

impl ProgressSpinner {
    /// Create a visible spinner with a message.
    pub fn new(message: &str, theme: VpsupTheme) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));

        Self { bar, theme }
    }

    /// A spinner that never draws, used in quiet mode.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            theme: VpsupTheme::plain(),
        }
    }

    fn finish_with(&mut self, line: String) {
        self.bar.set_style(
            ProgressStyle::default_spinner()
                .template("{msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        self.bar.finish_with_message(line);
    }
}

impl SpinnerHandle for ProgressSpinner {
    fn set_message(&mut self, msg: &str) {
        self.bar.set_message(msg.to_string());
    }

    fn finish_success(&mut self, msg: &str) {
        let line = self.theme.format_success(msg);
        self.finish_with(line);
    }

    fn finish_error(&mut self, msg: &str) {
        let line = self.theme.format_error(msg);
        self.finish_with(line);
    }

    fn finish_skipped(&mut self, msg: &str) {
        let line = format!("{}", self.theme.dim.apply_to(msg));
        self.finish_with(line);
    }

    fn progress_bar(&self) -> Option<ProgressBar> {
        Some(self.bar.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_spinner_finishes() {
        let mut spinner = ProgressSpinner::hidden();
        spinner.set_message("Installing Docker");
        spinner.finish_success("install-docker");
        assert!(spinner.bar.is_finished());
    }

    #[test]
    fn finish_replaces_message() {
        let mut spinner = ProgressSpinner::hidden();
        spinner.finish_error("base-packages - apt-get failed");
        assert_eq!(spinner.bar.message(), "✗ base-packages - apt-get failed");
    }

    #[test]
    fn progress_bar_is_shared() {
        let spinner = ProgressSpinner::hidden();
        let bar = spinner.progress_bar().unwrap();
        bar.set_message("from elsewhere");
        assert_eq!(spinner.bar.message(), "from elsewhere");
    }
}
