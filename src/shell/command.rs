//! System command execution.

use std::collections::HashMap;
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Result of executing a command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,

    /// Standard output.
    pub stdout: String,

    /// Standard error.
    pub stderr: String,

    /// Execution duration.
    pub duration: Duration,

    /// Whether command succeeded (exit code 0).
    pub success: bool,
}

impl CommandResult {
    /// Create a success result.
    pub fn success(stdout: String, stderr: String, duration: Duration) -> Self {
        Self {
            exit_code: Some(0),
            stdout,
            stderr,
            duration,
            success: true,
        }
    }

    /// Create a failure result.
    pub fn failure(
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        duration: Duration,
    ) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
            duration,
            success: false,
        }
    }
}

/// A program invocation.
#[derive(Debug, Clone, Default)]
pub struct CommandSpec {
    /// Program to run (looked up on PATH).
    pub program: String,

    /// Arguments.
    pub args: Vec<String>,

    /// Data written to the child's stdin, then closed.
    pub stdin: Option<String>,

    /// Environment variables (merged with system env).
    pub env: HashMap<String, String>,
}

impl CommandSpec {
    /// Create a spec for `program` with `args`.
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Feed `input` on stdin.
    pub fn with_stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Set an environment variable.
    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    /// Command line for logs and error messages.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Options for command execution.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandOptions {
    /// Capture stdout and stderr (if false, they are inherited).
    pub capture: bool,
}

impl CommandOptions {
    /// Options that capture all output.
    pub fn captured() -> Self {
        Self { capture: true }
    }
}

/// Execute a command.
///
/// A non-zero exit is a normal [`CommandResult`]; only failing to spawn or
/// wait for the child is an error.
pub fn execute(spec: &CommandSpec, options: &CommandOptions) -> std::io::Result<CommandResult> {
    let start = Instant::now();

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args);

    for (key, value) in &spec.env {
        cmd.env(key, value);
    }

    if spec.stdin.is_some() {
        cmd.stdin(Stdio::piped());
    } else {
        cmd.stdin(Stdio::null());
    }

    if options.capture {
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
    } else {
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());
    }

    tracing::trace!("exec: {}", spec.display());

    let mut child = cmd.spawn()?;

    if let Some(input) = &spec.stdin {
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input.as_bytes())?;
        }
    }

    let output = child.wait_with_output()?;
    let duration = start.elapsed();

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if output.status.success() {
        Ok(CommandResult::success(stdout, stderr, duration))
    } else {
        Ok(CommandResult::failure(
            output.status.code(),
            stdout,
            stderr,
            duration,
        ))
    }
}

/// Execute a command with captured output.
pub fn execute_quiet(spec: &CommandSpec) -> std::io::Result<CommandResult> {
    execute(spec, &CommandOptions::captured())
}

/// Check if a program is on PATH.
pub fn program_exists(program: &str) -> bool {
    std::env::var_os("PATH")
        .map(|path| {
            std::env::split_paths(&path).any(|dir| {
                let candidate = dir.join(program);
                candidate.is_file() && is_executable(&candidate)
            })
        })
        .unwrap_or(false)
}

#[cfg(unix)]
fn is_executable(path: &std::path::Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &std::path::Path) -> bool {
    true
}
