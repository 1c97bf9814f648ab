//! Output verbosity.

/// How much a run prints, chosen by `-v` / `-q`.
///
/// Command results (`list`, `config`, JSON documents), warnings, errors and
/// the run summary are printed in every mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Progress plus the output of every command vpsup runs.
    Verbose,
    /// Headers, one spinner or line per step.
    #[default]
    Normal,
    /// No headers or per-step progress.
    Quiet,
}

impl OutputMode {
    /// Pick a mode from the global flags. `--quiet` wins over `--verbose`.
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        match (verbose, quiet) {
            (_, true) => Self::Quiet,
            (true, false) => Self::Verbose,
            (false, false) => Self::Normal,
        }
    }

    /// Whether apt, installers and friends write straight to the terminal.
    pub fn shows_command_output(&self) -> bool {
        matches!(self, Self::Verbose)
    }

    /// Whether headers, success lines and per-step progress are drawn.
    pub fn shows_progress(&self) -> bool {
        !matches!(self, Self::Quiet)
    }
}
