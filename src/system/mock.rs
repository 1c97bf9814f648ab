//! In-memory host for tests.
//!
//! [`MockSystem`] implements both [`StateProbe`] and [`SystemOps`] over the
//! same state, so applying a step changes what the next probe sees. Opaque
//! operations (installer scripts, user scripts, arbitrary commands) have no
//! built-in effect; tests attach [`MockEffect`]s to them with
//! [`MockSystem::on_call`].

use chrono::Local;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::error::{ProbeError, StepError};
use crate::probe::{PasswordStatus, StateProbe};

use super::backup::backup_path;
use super::profile::{upsert_block, ProfileBlock};
use super::{FileOwner, RunAs, SystemOps, APT_PKGCACHE};

/// A state change applied when a matching call succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEffect {
    /// Put a program on PATH.
    AddCommand(String),
    /// Mark a service active.
    ActivateService(String),
    /// Mark a package installed.
    InstallPackage(String),
    /// Create or replace a file.
    WriteFile { path: PathBuf, content: String },
    /// Make inspection scripts containing `script` print `output`.
    SetCapture { script: String, output: String },
}

#[derive(Debug, Clone)]
struct MockUser {
    groups: BTreeSet<String>,
    password: PasswordStatus,
    home: PathBuf,
}

#[derive(Debug, Clone)]
struct MockFile {
    content: String,
    modified: SystemTime,
}

#[derive(Debug, Default)]
struct MockState {
    users: BTreeMap<String, MockUser>,
    passwords: BTreeMap<String, String>,
    packages: BTreeSet<String>,
    commands: BTreeSet<String>,
    services: BTreeSet<String>,
    files: BTreeMap<PathBuf, MockFile>,
    unreadable: BTreeSet<PathBuf>,
    captures: Vec<(String, String)>,
    hooks: Vec<(String, Vec<MockEffect>)>,
    failures: Vec<String>,
    calls: Vec<String>,
}

impl MockState {
    fn apply(&mut self, effect: &MockEffect) {
        match effect {
            MockEffect::AddCommand(name) => {
                self.commands.insert(name.clone());
            }
            MockEffect::ActivateService(name) => {
                self.services.insert(name.clone());
            }
            MockEffect::InstallPackage(name) => {
                self.packages.insert(name.clone());
            }
            MockEffect::WriteFile { path, content } => {
                self.files.insert(
                    path.clone(),
                    MockFile {
                        content: content.clone(),
                        modified: SystemTime::now(),
                    },
                );
            }
            MockEffect::SetCapture { script, output } => {
                self.captures.push((script.clone(), output.clone()));
            }
        }
    }
}

/// In-memory system used by tests.
#[derive(Debug, Default)]
pub struct MockSystem {
    state: RefCell<MockState>,
}

impl MockSystem {
    /// An empty host: no users, packages, services or files.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account with home `/home/<name>` and a set password.
    pub fn add_user(&self, name: &str) {
        self.add_user_with_home(name, &format!("/home/{}", name));
    }

    /// Add an account with a custom home and a set password.
    pub fn add_user_with_home(&self, name: &str, home: &str) {
        self.state.borrow_mut().users.insert(
            name.to_string(),
            MockUser {
                groups: BTreeSet::from([name.to_string()]),
                password: PasswordStatus::Set,
                home: PathBuf::from(home),
            },
        );
    }

    /// Override an account's password state.
    pub fn set_password_status(&self, name: &str, status: PasswordStatus) {
        if let Some(user) = self.state.borrow_mut().users.get_mut(name) {
            user.password = status;
        }
    }

    /// Add an account to a group.
    pub fn add_group(&self, name: &str, group: &str) {
        if let Some(user) = self.state.borrow_mut().users.get_mut(name) {
            user.groups.insert(group.to_string());
        }
    }

    /// Mark a package installed.
    pub fn add_package(&self, package: &str) {
        self.state.borrow_mut().packages.insert(package.to_string());
    }

    /// Put a program on PATH.
    pub fn add_command(&self, program: &str) {
        self.state.borrow_mut().commands.insert(program.to_string());
    }

    /// Mark a service active.
    pub fn activate_service(&self, service: &str) {
        self.state.borrow_mut().services.insert(service.to_string());
    }

    /// Create a file modified just now.
    pub fn add_file(&self, path: impl Into<PathBuf>, content: &str) {
        self.add_file_aged(path, content, Duration::ZERO);
    }

    /// Create a file last modified `age` ago.
    pub fn add_file_aged(&self, path: impl Into<PathBuf>, content: &str, age: Duration) {
        let modified = SystemTime::now()
            .checked_sub(age)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        self.state.borrow_mut().files.insert(
            path.into(),
            MockFile {
                content: content.to_string(),
                modified,
            },
        );
    }

    /// Make reads of `path` fail with permission denied.
    pub fn make_unreadable(&self, path: impl Into<PathBuf>) {
        self.state.borrow_mut().unreadable.insert(path.into());
    }

    /// Make inspection scripts containing `script` print `output`.
    pub fn add_capture(&self, script: &str, output: &str) {
        self.state
            .borrow_mut()
            .captures
            .push((script.to_string(), output.to_string()));
    }

    /// Apply `effects` whenever a successful call's label contains `pattern`.
    pub fn on_call(&self, pattern: &str, effects: Vec<MockEffect>) {
        self.state
            .borrow_mut()
            .hooks
            .push((pattern.to_string(), effects));
    }

    /// Fail every call whose label contains `pattern`.
    pub fn fail_on(&self, pattern: &str) {
        self.state.borrow_mut().failures.push(pattern.to_string());
    }

    /// Labels of every mutating call, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    /// Content of a file.
    pub fn file(&self, path: impl AsRef<Path>) -> Option<String> {
        self.state
            .borrow()
            .files
            .get(path.as_ref())
            .map(|f| f.content.clone())
    }

    /// Paths of all files.
    pub fn file_paths(&self) -> Vec<PathBuf> {
        self.state.borrow().files.keys().cloned().collect()
    }

    /// Whether a package is installed.
    pub fn has_package(&self, package: &str) -> bool {
        self.state.borrow().packages.contains(package)
    }

    /// Whether an account exists.
    pub fn has_user(&self, name: &str) -> bool {
        self.state.borrow().users.contains_key(name)
    }

    /// Groups of an account.
    pub fn groups_of(&self, name: &str) -> Vec<String> {
        self.state
            .borrow()
            .users
            .get(name)
            .map(|u| u.groups.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Password last set for an account.
    pub fn password_of(&self, name: &str) -> Option<String> {
        self.state.borrow().passwords.get(name).cloned()
    }

    /// Record a call, honoring injected failures, then run `op` and hooks.
    fn record<T>(
        &self,
        label: String,
        op: impl FnOnce(&mut MockState) -> Result<T, StepError>,
    ) -> Result<T, StepError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(label.clone());

        if state.failures.iter().any(|p| label.contains(p.as_str())) {
            return Err(StepError::CommandFailed {
                command: label,
                code: Some(1),
                stderr: "injected failure".to_string(),
            });
        }

        let value = op(&mut *state)?;

        let effects: Vec<MockEffect> = state
            .hooks
            .iter()
            .filter(|(pattern, _)| label.contains(pattern.as_str()))
            .flat_map(|(_, effects)| effects.clone())
            .collect();
        for effect in &effects {
            state.apply(effect);
        }

        Ok(value)
    }

    fn readable(state: &MockState, path: &Path) -> Result<(), ProbeError> {
        if state.unreadable.contains(path) {
            return Err(ProbeError::Unreadable {
                path: path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "permission denied",
                ),
            });
        }
        Ok(())
    }
}

fn no_such_user(command: &str, user: &str) -> StepError {
    StepError::CommandFailed {
        command: command.to_string(),
        code: Some(6),
        stderr: format!("user '{}' does not exist", user),
    }
}

impl StateProbe for MockSystem {
    fn user_exists(&self, name: &str) -> Result<bool, ProbeError> {
        Ok(self.state.borrow().users.contains_key(name))
    }

    fn user_groups(&self, name: &str) -> Result<Vec<String>, ProbeError> {
        Ok(self.groups_of(name))
    }

    fn password_status(&self, name: &str) -> Result<Option<PasswordStatus>, ProbeError> {
        Ok(self.state.borrow().users.get(name).map(|u| u.password))
    }

    fn user_home(&self, name: &str) -> Result<Option<PathBuf>, ProbeError> {
        Ok(self.state.borrow().users.get(name).map(|u| u.home.clone()))
    }

    fn package_installed(&self, package: &str) -> Result<bool, ProbeError> {
        Ok(self.has_package(package))
    }

    fn command_exists(&self, program: &str) -> Result<bool, ProbeError> {
        Ok(self.state.borrow().commands.contains(program))
    }

    fn service_active(&self, service: &str) -> Result<bool, ProbeError> {
        Ok(self.state.borrow().services.contains(service))
    }

    fn read_file(&self, path: &Path) -> Result<Option<String>, ProbeError> {
        let state = self.state.borrow();
        Self::readable(&state, path)?;
        Ok(state.files.get(path).map(|f| f.content.clone()))
    }

    fn file_age(&self, path: &Path) -> Result<Option<Duration>, ProbeError> {
        let state = self.state.borrow();
        Self::readable(&state, path)?;
        Ok(state.files.get(path).map(|f| {
            SystemTime::now()
                .duration_since(f.modified)
                .unwrap_or(Duration::ZERO)
        }))
    }

    fn capture(&self, _run_as: &RunAs, script: &str) -> Result<Option<String>, ProbeError> {
        Ok(self
            .state
            .borrow()
            .captures
            .iter()
            .rev()
            .find(|(pattern, _)| script.contains(pattern.as_str()))
            .map(|(_, output)| output.clone()))
    }
}

impl SystemOps for MockSystem {
    fn update_packages(&self) -> Result<(), StepError> {
        self.record("update_packages".to_string(), |state| {
            state.apply(&MockEffect::WriteFile {
                path: PathBuf::from(APT_PKGCACHE),
                content: String::new(),
            });
            Ok(())
        })
    }

    fn install_packages(&self, packages: &[String]) -> Result<(), StepError> {
        let label = format!("install_packages {}", packages.join(" "));
        self.record(label, |state| {
            state.packages.extend(packages.iter().cloned());
            Ok(())
        })
    }

    fn create_user(&self, name: &str, _shell: &str) -> Result<(), StepError> {
        self.record(format!("create_user {}", name), |state| {
            if state.users.contains_key(name) {
                return Err(StepError::CommandFailed {
                    command: format!("useradd {}", name),
                    code: Some(9),
                    stderr: format!("user '{}' already exists", name),
                });
            }
            state.users.insert(
                name.to_string(),
                MockUser {
                    groups: BTreeSet::from([name.to_string()]),
                    password: PasswordStatus::Locked,
                    home: PathBuf::from("/home").join(name),
                },
            );
            Ok(())
        })
    }

    fn add_to_group(&self, user: &str, group: &str) -> Result<(), StepError> {
        self.record(format!("add_to_group {} {}", user, group), |state| {
            let account = state
                .users
                .get_mut(user)
                .ok_or_else(|| no_such_user("usermod", user))?;
            account.groups.insert(group.to_string());
            Ok(())
        })
    }

    fn set_password(&self, user: &str, password: &str) -> Result<(), StepError> {
        self.record(format!("set_password {}", user), |state| {
            let account = state
                .users
                .get_mut(user)
                .ok_or_else(|| no_such_user("chpasswd", user))?;
            account.password = PasswordStatus::Set;
            state
                .passwords
                .insert(user.to_string(), password.to_string());
            Ok(())
        })
    }

    fn enable_service(&self, service: &str) -> Result<(), StepError> {
        self.record(format!("enable_service {}", service), |state| {
            state.services.insert(service.to_string());
            Ok(())
        })
    }

    fn restart_service(&self, service: &str) -> Result<(), StepError> {
        self.record(format!("restart_service {}", service), |state| {
            state.services.insert(service.to_string());
            Ok(())
        })
    }

    fn run_installer(&self, run_as: &RunAs, url: &str, args: &[String]) -> Result<(), StepError> {
        let label = format!("run_installer {} {} {}", run_as, url, args.join(" "));
        self.record(label.trim_end().to_string(), |_| Ok(()))
    }

    fn run_script(&self, run_as: &RunAs, script: &str) -> Result<(), StepError> {
        self.record(format!("run_script {}: {}", run_as, script), |_| Ok(()))
    }

    fn run_command(&self, program: &str, args: &[String]) -> Result<(), StepError> {
        let label = format!("run_command {} {}", program, args.join(" "));
        self.record(label.trim_end().to_string(), |_| Ok(()))
    }

    fn write_file(&self, path: &Path, content: &str, _owner: &FileOwner) -> Result<(), StepError> {
        self.record(format!("write_file {}", path.display()), |state| {
            state.apply(&MockEffect::WriteFile {
                path: path.to_path_buf(),
                content: content.to_string(),
            });
            Ok(())
        })
    }

    fn backup_file(&self, path: &Path) -> Result<PathBuf, StepError> {
        self.record(format!("backup_file {}", path.display()), |state| {
            let original = state.files.get(path).cloned().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such file")
            })?;
            let target = backup_path(path, Local::now(), |p| state.files.contains_key(p));
            state.files.insert(target.clone(), original);
            Ok(target)
        })
    }

    fn upsert_block(
        &self,
        path: &Path,
        block: &ProfileBlock,
        _owner: &FileOwner,
    ) -> Result<bool, StepError> {
        let label = format!("upsert_block {} {}", path.display(), block.key);
        self.record(label, |state| {
            let current = state
                .files
                .get(path)
                .map(|f| f.content.clone())
                .unwrap_or_default();
            match upsert_block(&current, block) {
                Some(updated) => {
                    state.apply(&MockEffect::WriteFile {
                        path: path.to_path_buf(),
                        content: updated,
                    });
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }
}
