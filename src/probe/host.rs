//! Probe backed by the running host.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::error::ProbeError;
use crate::shell::{execute_quiet, program_exists, CommandResult, CommandSpec};
use crate::system::host::script_spec;
use crate::system::RunAs;

use super::parse::{parse_passwd_home, parse_passwd_status};
use super::{PasswordStatus, StateProbe};

/// Inspects the real system with `getent`, `id`, `passwd`, `dpkg-query`
/// and `systemctl`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostProbe;

impl HostProbe {
    /// Create a host probe.
    pub fn new() -> Self {
        Self
    }

    fn run(&self, spec: &CommandSpec) -> Result<CommandResult, ProbeError> {
        execute_quiet(spec).map_err(|e| ProbeError::Spawn {
            command: spec.display(),
            message: e.to_string(),
        })
    }

    fn passwd_entry(&self, name: &str) -> Result<Option<String>, ProbeError> {
        let spec = CommandSpec::new("getent", ["passwd", name]);
        let result = self.run(&spec)?;
        match result.exit_code {
            Some(0) => Ok(Some(result.stdout)),
            // getent: 2 means "key not found"
            Some(2) => Ok(None),
            _ => Err(ProbeError::UnexpectedOutput {
                command: spec.display(),
                output: result.stderr.trim().to_string(),
            }),
        }
    }
}

impl StateProbe for HostProbe {
    fn user_exists(&self, name: &str) -> Result<bool, ProbeError> {
        Ok(self.passwd_entry(name)?.is_some())
    }

    fn user_groups(&self, name: &str) -> Result<Vec<String>, ProbeError> {
        if !self.user_exists(name)? {
            return Ok(Vec::new());
        }
        let spec = CommandSpec::new("id", ["-nG", name]);
        let result = self.run(&spec)?;
        if !result.success {
            return Err(ProbeError::UnexpectedOutput {
                command: spec.display(),
                output: result.stderr.trim().to_string(),
            });
        }
        Ok(result.stdout.split_whitespace().map(String::from).collect())
    }

    fn password_status(&self, name: &str) -> Result<Option<PasswordStatus>, ProbeError> {
        if !self.user_exists(name)? {
            return Ok(None);
        }
        let spec = CommandSpec::new("passwd", ["-S", name]);
        let result = self.run(&spec)?;
        if !result.success {
            return Err(ProbeError::UnexpectedOutput {
                command: spec.display(),
                output: result.stderr.trim().to_string(),
            });
        }
        parse_passwd_status(&result.stdout)
            .map(Some)
            .map_err(|_| ProbeError::UnexpectedOutput {
                command: spec.display(),
                output: result.stdout.trim().to_string(),
            })
    }

    fn user_home(&self, name: &str) -> Result<Option<PathBuf>, ProbeError> {
        Ok(self
            .passwd_entry(name)?
            .as_deref()
            .and_then(parse_passwd_home)
            .map(PathBuf::from))
    }

    fn package_installed(&self, package: &str) -> Result<bool, ProbeError> {
        let spec = CommandSpec::new("dpkg-query", ["-W", "-f=${Status}", package]);
        let result = self.run(&spec)?;
        Ok(result.success && result.stdout.contains("install ok installed"))
    }

    fn command_exists(&self, program: &str) -> Result<bool, ProbeError> {
        Ok(program_exists(program))
    }

    fn service_active(&self, service: &str) -> Result<bool, ProbeError> {
        let spec = CommandSpec::new("systemctl", ["is-active", "--quiet", service]);
        Ok(self.run(&spec)?.success)
    }

    fn read_file(&self, path: &Path) -> Result<Option<String>, ProbeError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ProbeError::Unreadable {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn file_age(&self, path: &Path) -> Result<Option<Duration>, ProbeError> {
        let modified = match std::fs::metadata(path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ProbeError::Unreadable {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        // A timestamp in the future counts as brand new.
        Ok(Some(
            SystemTime::now()
                .duration_since(modified)
                .unwrap_or(Duration::ZERO),
        ))
    }

    fn capture(&self, run_as: &RunAs, script: &str) -> Result<Option<String>, ProbeError> {
        let spec = script_spec(run_as, script);
        let result = self.run(&spec)?;
        if result.success {
            Ok(Some(result.stdout))
        } else {
            tracing::debug!(
                "Inspection as {} exited with {:?}",
                run_as,
                result.exit_code
            );
            Ok(None)
        }
    }
}
