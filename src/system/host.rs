//! [`SystemOps`] against the running host.

use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StepError;
use crate::shell::{execute, CommandOptions, CommandSpec};

use super::backup::backup_path;
use super::installer::InstallerFetcher;
use super::profile::{upsert_block, ProfileBlock};
use super::{FileOwner, RunAs, SystemOps};

/// Command that runs `script` with `sh` as `run_as`.
///
/// Users get a login shell through `runuser -l`, so their profile (and
/// anything it sources, like nvm) is loaded.
pub fn script_spec(run_as: &RunAs, script: &str) -> CommandSpec {
    match run_as {
        RunAs::Root => CommandSpec::new("sh", ["-c", script]),
        RunAs::User(user) => CommandSpec::new("runuser", ["-l", user.as_str(), "-c", script]),
    }
}

/// Changes the real host through apt, useradd, systemctl and the filesystem.
pub struct HostSystem {
    fetcher: InstallerFetcher,
    options: CommandOptions,
}

impl HostSystem {
    /// Create a host system that captures command output.
    pub fn new() -> Self {
        Self {
            fetcher: InstallerFetcher::new(),
            options: CommandOptions::captured(),
        }
    }

    /// Stream command output to the terminal instead of capturing it.
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.options.capture = !streaming;
        self
    }

    fn exec(&self, spec: &CommandSpec) -> Result<(), StepError> {
        self.exec_as(spec, &spec.display())
    }

    /// Run `spec`, naming it `label` in logs and errors.
    fn exec_as(&self, spec: &CommandSpec, label: &str) -> Result<(), StepError> {
        tracing::debug!("Running {}", label);
        let result = execute(spec, &self.options).map_err(|e| StepError::CommandFailed {
            command: label.to_string(),
            code: None,
            stderr: e.to_string(),
        })?;

        if result.success {
            Ok(())
        } else {
            Err(StepError::CommandFailed {
                command: label.to_string(),
                code: result.exit_code,
                stderr: result.stderr,
            })
        }
    }

    fn apt(args: &[&str]) -> CommandSpec {
        CommandSpec::new("apt-get", args.iter().copied())
            .with_env("DEBIAN_FRONTEND", "noninteractive")
    }

    fn chown(&self, path: &Path, user: &str) -> Result<(), StepError> {
        let path = path.to_string_lossy().to_string();
        self.exec(&CommandSpec::new(
            "chown",
            [format!("{}:", user), path],
        ))
    }

    fn ensure_parent(&self, path: &Path, owner: &FileOwner) -> Result<(), StepError> {
        let Some(parent) = path.parent() else {
            return Ok(());
        };
        if parent.exists() {
            return Ok(());
        }
        fs::create_dir_all(parent)?;
        set_mode(parent, 0o700)?;
        if let Some(user) = &owner.user {
            self.chown(parent, user)?;
        }
        Ok(())
    }
}

impl Default for HostSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemOps for HostSystem {
    fn update_packages(&self) -> Result<(), StepError> {
        self.exec(&Self::apt(&["update", "-y"]))?;
        self.exec(&Self::apt(&["upgrade", "-y"]))
    }

    fn install_packages(&self, packages: &[String]) -> Result<(), StepError> {
        if packages.is_empty() {
            return Ok(());
        }
        let mut args = vec!["install", "-y"];
        args.extend(packages.iter().map(String::as_str));
        self.exec(&Self::apt(&args))
    }

    fn create_user(&self, name: &str, shell: &str) -> Result<(), StepError> {
        self.exec(&CommandSpec::new("useradd", ["-m", "-s", shell, name]))
    }

    fn add_to_group(&self, user: &str, group: &str) -> Result<(), StepError> {
        self.exec(&CommandSpec::new("usermod", ["-aG", group, user]))
    }

    fn set_password(&self, user: &str, password: &str) -> Result<(), StepError> {
        let spec = CommandSpec::new("chpasswd", Vec::<String>::new())
            .with_stdin(format!("{}:{}\n", user, password));
        self.exec(&spec)
    }

    fn enable_service(&self, service: &str) -> Result<(), StepError> {
        self.exec(&CommandSpec::new("systemctl", ["enable", "--now", service]))
    }

    fn restart_service(&self, service: &str) -> Result<(), StepError> {
        self.exec(&CommandSpec::new("systemctl", ["restart", service]))
    }

    fn run_installer(&self, run_as: &RunAs, url: &str, args: &[String]) -> Result<(), StepError> {
        let body = self.fetcher.fetch(url)?;

        let mut script = String::from("bash -s");
        if !args.is_empty() {
            script.push_str(" --");
            for arg in args {
                script.push(' ');
                script.push_str(arg);
            }
        }

        let spec = script_spec(run_as, &script).with_stdin(body);
        self.exec_as(&spec, &format!("installer {} (as {})", url, run_as))
    }

    fn run_script(&self, run_as: &RunAs, script: &str) -> Result<(), StepError> {
        let label = format!("script as {}: {}", run_as, first_line(script));
        self.exec_as(&script_spec(run_as, script), &label)
    }

    fn run_command(&self, program: &str, args: &[String]) -> Result<(), StepError> {
        self.exec(&CommandSpec::new(program, args.iter().cloned()))
    }

    fn write_file(&self, path: &Path, content: &str, owner: &FileOwner) -> Result<(), StepError> {
        tracing::debug!("Writing {}", path.display());
        self.ensure_parent(path, owner)?;
        fs::write(path, content)?;
        set_mode(path, owner.mode)?;
        if let Some(user) = &owner.user {
            self.chown(path, user)?;
        }
        Ok(())
    }

    fn backup_file(&self, path: &Path) -> Result<PathBuf, StepError> {
        let target = backup_path(path, Local::now(), Path::exists);
        fs::copy(path, &target)?;
        tracing::info!("Backed up {} to {}", path.display(), target.display());
        Ok(target)
    }

    fn upsert_block(
        &self,
        path: &Path,
        block: &ProfileBlock,
        owner: &FileOwner,
    ) -> Result<bool, StepError> {
        let current = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        match upsert_block(&current, block) {
            Some(updated) => {
                self.write_file(path, &updated, owner)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn first_line(script: &str) -> &str {
    script.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim()
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}
