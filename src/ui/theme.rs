//! Colors and step-outcome formatting.

use console::Style;

use crate::steps::{ReportEntry, SkipReason, StepOutcome};

/// vpsup's visual theme.
#[derive(Debug, Clone)]
pub struct VpsupTheme {
    /// Applied steps and overall success (green).
    pub success: Style,
    /// Tolerated failures and warnings (yellow).
    pub warning: Style,
    /// Failures (red bold).
    pub error: Style,
    /// Planned steps and the header mark (cyan).
    pub info: Style,
    /// Skipped steps and secondary text.
    pub dim: Style,
    /// Bold text.
    pub highlight: Style,
    /// Step counters like `[3/16]`.
    pub step_number: Style,
    /// Option names and other keys.
    pub key: Style,
}

impl Default for VpsupTheme {
    fn default() -> Self {
        Self::new()
    }
}

impl VpsupTheme {
    /// The colored theme.
    pub fn new() -> Self {
        Self {
            success: Style::new().green(),
            warning: Style::new().yellow(),
            error: Style::new().red().bold(),
            info: Style::new().cyan(),
            dim: Style::new().dim(),
            highlight: Style::new().bold(),
            step_number: Style::new().dim(),
            key: Style::new().bold(),
        }
    }

    /// A theme without colors (for non-TTY or --no-color).
    pub fn plain() -> Self {
        Self {
            success: Style::new(),
            warning: Style::new(),
            error: Style::new(),
            info: Style::new(),
            dim: Style::new(),
            highlight: Style::new(),
            step_number: Style::new(),
            key: Style::new(),
        }
    }

    /// Pick colored or plain.
    pub fn for_colors(colors: bool) -> Self {
        if colors {
            Self::new()
        } else {
            Self::plain()
        }
    }

    pub fn format_success(&self, msg: &str) -> String {
        format!("{}", self.success.apply_to(format!("✓ {}", msg)))
    }

    pub fn format_warning(&self, msg: &str) -> String {
        format!("{}", self.warning.apply_to(format!("⚠ {}", msg)))
    }

    pub fn format_error(&self, msg: &str) -> String {
        format!("{}", self.error.apply_to(format!("✗ {}", msg)))
    }

    /// Header banner.
    pub fn format_header(&self, title: &str) -> String {
        format!(
            "{} {}",
            self.info.apply_to("▲"),
            self.highlight.apply_to(title)
        )
    }

    /// `[3/16]` counter.
    pub fn format_counter(&self, index: usize, total: usize) -> String {
        format!("{}", self.step_number.apply_to(format!("[{}/{}]", index + 1, total)))
    }

    /// Report line for a step, colored by outcome.
    pub fn format_entry(&self, entry: &ReportEntry) -> String {
        let line = entry.summary_line();
        let style = match &entry.outcome {
            StepOutcome::Applied => &self.success,
            StepOutcome::Failed { .. } => &self.error,
            StepOutcome::Planned => &self.info,
            StepOutcome::Skipped {
                reason: SkipReason::Tolerated(_),
            } => &self.warning,
            StepOutcome::Skipped { .. } => &self.dim,
        };
        format!("{}", style.apply_to(line))
    }
}

/// Check if colors should be enabled.
pub fn should_use_colors() -> bool {
    // https://no-color.org/
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    console::Term::stdout().is_term()
}
