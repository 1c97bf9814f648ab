//! Run report: one entry per evaluated step, in execution order.

use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// Why a step did not apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// The effect already held.
    Satisfied,
    /// The configuration turned the step off.
    DisabledByConfig,
    /// Apply failed, and the step tolerates failure.
    Tolerated(String),
}

/// Terminal outcome of a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Skipped { reason: SkipReason },
    Applied,
    Failed { message: String },
    /// Would apply; only produced by dry runs.
    Planned,
}

impl StepOutcome {
    /// Skipped because the effect already held.
    pub fn satisfied() -> Self {
        StepOutcome::Skipped {
            reason: SkipReason::Satisfied,
        }
    }

    /// Skipped because the configuration turned the step off.
    pub fn disabled() -> Self {
        StepOutcome::Skipped {
            reason: SkipReason::DisabledByConfig,
        }
    }

    /// Whether the outcome is a skip of any kind.
    pub fn is_skipped(&self) -> bool {
        matches!(self, StepOutcome::Skipped { .. })
    }

    /// Lifecycle state this outcome ends in.
    pub fn state(&self) -> StepState {
        match self {
            StepOutcome::Skipped { .. } => StepState::Skipped,
            StepOutcome::Applied => StepState::Applied,
            StepOutcome::Failed { .. } => StepState::Failed,
            StepOutcome::Planned => StepState::Pending,
        }
    }
}

/// Per-step lifecycle: `Pending -> {Skipped | Applying -> {Applied | Failed}}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    /// Not evaluated yet.
    Pending,
    /// Apply in progress.
    Applying,
    /// Terminal: nothing was changed.
    Skipped,
    /// Terminal: apply succeeded.
    Applied,
    /// Terminal: probe or apply failed.
    Failed,
}

impl StepState {
    /// Check if this is a terminal state (no more changes expected).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepState::Skipped | StepState::Applied | StepState::Failed
        )
    }

    /// Get a display character for this state.
    pub fn display_char(&self) -> char {
        match self {
            StepState::Pending => '○',
            StepState::Applying => '◉',
            StepState::Applied => '✓',
            StepState::Failed => '✗',
            StepState::Skipped => '⊘',
        }
    }
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepState::Pending => "pending",
            StepState::Applying => "applying",
            StepState::Skipped => "skipped",
            StepState::Applied => "applied",
            StepState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// One line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub step_id: String,
    pub title: String,
    pub outcome: StepOutcome,
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
}

impl ReportEntry {
    /// Generate a summary line for display.
    pub fn summary_line(&self) -> String {
        format!("{} {}", self.outcome.state().display_char(), self.describe())
    }

    /// The summary line without its status icon.
    pub fn describe(&self) -> String {
        match &self.outcome {
            StepOutcome::Applied => {
                format!("{} ({})", self.step_id, format_duration(self.duration))
            }
            StepOutcome::Skipped { reason } => {
                let why = match reason {
                    SkipReason::Satisfied => "already satisfied".to_string(),
                    SkipReason::DisabledByConfig => "disabled by config".to_string(),
                    SkipReason::Tolerated(message) => format!("tolerated failure: {}", message),
                };
                format!("{} ({})", self.step_id, why)
            }
            StepOutcome::Failed { message } => format!("{} - {}", self.step_id, message),
            StepOutcome::Planned => format!("{} (would apply)", self.step_id),
        }
    }
}

/// Format a duration compactly (`850ms`, `4.2s`, `3m 5s`).
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if secs == 0 {
        format!("{}ms", millis)
    } else if secs < 60 {
        format!("{}.{}s", secs, millis / 100)
    } else {
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    }
}

/// Append-only, ordered record of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    entries: Vec<ReportEntry>,
}

impl RunReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, entry: ReportEntry) {
        self.entries.push(entry);
    }

    /// Entries in execution order.
    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    /// Entry for a step, if it was evaluated.
    pub fn get(&self, step_id: &str) -> Option<&ReportEntry> {
        self.entries.iter().find(|e| e.step_id == step_id)
    }

    /// Outcome of a step, if it was evaluated.
    pub fn outcome(&self, step_id: &str) -> Option<&StepOutcome> {
        self.get(step_id).map(|e| &e.outcome)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no step was evaluated.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries in `state`.
    pub fn count(&self, state: StepState) -> usize {
        self.entries
            .iter()
            .filter(|e| e.outcome.state() == state)
            .count()
    }

    /// Total time spent across all steps.
    pub fn total_duration(&self) -> Duration {
        self.entries.iter().map(|e| e.duration).sum()
    }
}
