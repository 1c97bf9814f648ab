use std::path::{Path, PathBuf};

use crate::config::{ConfigSnapshot, OptionKey};
use crate::error::{ProbeError, StepError};
use crate::probe::StateProbe;
use crate::steps::{ApplyContext, FailurePolicy, Step};
use crate::system::sshd::{SSHD_CONFIG, SSHD_EFFECTIVE_SCRIPT, SSHD_HARDENING_DROPIN};
use crate::system::{
    harden_sshd_config, hardening_dropin, EffectiveSshd, FileOwner, RunAs, SshdSettings,
};

use super::target_home;

const ROOT_AUTHORIZED_KEYS: &str = "/root/.ssh/authorized_keys";

fn user_authorized_keys(
    config: &ConfigSnapshot,
    probe: &dyn StateProbe,
) -> Result<PathBuf, ProbeError> {
    Ok(target_home(config, probe)?.join(".ssh").join("authorized_keys"))
}

fn has_keys(probe: &dyn StateProbe, path: &Path) -> Result<bool, ProbeError> {
    Ok(probe
        .read_file(path)?
        .is_some_and(|content| !content.trim().is_empty()))
}

/// Let root's authorized keys log in as the user.
pub struct CopySshKeys;

impl Step for CopySshKeys {
    fn id(&self) -> &'static str {
        "copy-ssh-keys"
    }

    fn title(&self) -> &'static str {
        "Copy root SSH keys to user"
    }

    fn prerequisites(&self) -> &'static [&'static str] {
        &["create-user"]
    }

    fn enabled(&self, config: &ConfigSnapshot) -> bool {
        config.bool(OptionKey::CopyRootSshKeys)
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Tolerated
    }

    fn is_satisfied(
        &self,
        config: &ConfigSnapshot,
        probe: &dyn StateProbe,
    ) -> Result<bool, ProbeError> {
        has_keys(probe, &user_authorized_keys(config, probe)?)
    }

    fn apply(&self, config: &ConfigSnapshot, ctx: &mut ApplyContext<'_>) -> Result<(), StepError> {
        let keys = ctx
            .probe
            .read_file(Path::new(ROOT_AUTHORIZED_KEYS))?
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                StepError::Precondition(format!("{} has no keys to copy", ROOT_AUTHORIZED_KEYS))
            })?;

        let target = user_authorized_keys(config, ctx.probe)?;
        ctx.system
            .write_file(&target, &keys, &FileOwner::user(config.username(), 0o600))
    }
}

/// Disable root and password logins, and move sshd to `SSH_PORT`.
///
/// Refuses to run unless the user can already log in with a key. The
/// previous config is backed up. Both files are restored if `sshd -t`
/// rejects the result or `sshd -T` shows another file still winning.
pub struct HardenSsh;

fn effective_sshd(probe: &dyn StateProbe) -> Result<Option<EffectiveSshd>, ProbeError> {
    Ok(probe
        .capture(&RunAs::Root, SSHD_EFFECTIVE_SCRIPT)?
        .map(|output| EffectiveSshd::parse(&output)))
}

impl Step for HardenSsh {
    fn id(&self) -> &'static str {
        "harden-ssh"
    }

    fn title(&self) -> &'static str {
        "Harden SSH server"
    }

    fn prerequisites(&self) -> &'static [&'static str] {
        &["user-sudo", "copy-ssh-keys"]
    }

    fn enabled(&self, config: &ConfigSnapshot) -> bool {
        config.bool(OptionKey::HardenSsh)
    }

    fn is_satisfied(
        &self,
        config: &ConfigSnapshot,
        probe: &dyn StateProbe,
    ) -> Result<bool, ProbeError> {
        let settings = SshdSettings::hardened(config.ssh_port());
        let main_hardened = probe
            .read_file(Path::new(SSHD_CONFIG))?
            .is_some_and(|current| harden_sshd_config(&current, &settings) == current);
        if !main_hardened {
            return Ok(false);
        }

        let dropin_written = probe
            .read_file(Path::new(SSHD_HARDENING_DROPIN))?
            .is_some_and(|content| content == hardening_dropin(&settings));

        // The files alone are not enough: another sshd_config.d file may win.
        Ok(dropin_written
            && effective_sshd(probe)?.is_some_and(|effective| effective.satisfies(&settings)))
    }

    fn apply(&self, config: &ConfigSnapshot, ctx: &mut ApplyContext<'_>) -> Result<(), StepError> {
        let keys = user_authorized_keys(config, ctx.probe)?;
        if !has_keys(ctx.probe, &keys)? {
            return Err(StepError::Precondition(format!(
                "Refusing to disable password login: {} has no keys",
                keys.display()
            )));
        }

        let path = Path::new(SSHD_CONFIG);
        let current = ctx
            .probe
            .read_file(path)?
            .ok_or_else(|| StepError::Precondition(format!("{} not found", SSHD_CONFIG)))?;
        let settings = SshdSettings::hardened(config.ssh_port());
        let updated = harden_sshd_config(&current, &settings);

        let dropin = Path::new(SSHD_HARDENING_DROPIN);
        // an empty drop-in is a no-op for sshd
        let previous_dropin = ctx.probe.read_file(dropin)?.unwrap_or_default();

        let backup = ctx.system.backup_file(path)?;
        tracing::info!("Saved {} to {}", SSHD_CONFIG, backup.display());

        let owner = FileOwner::root(0o644);
        ctx.system.write_file(path, &updated, &owner)?;
        ctx.system
            .write_file(dropin, &hardening_dropin(&settings), &owner)?;

        let restore = |ctx: &mut ApplyContext<'_>| -> Result<(), StepError> {
            ctx.system.write_file(path, &current, &owner)?;
            ctx.system.write_file(dropin, &previous_dropin, &owner)
        };

        if let Err(e) = ctx.system.run_command("sshd", &["-t".to_string()]) {
            tracing::warn!("sshd rejected the new config; restoring {}", SSHD_CONFIG);
            restore(ctx)?;
            return Err(e);
        }

        match effective_sshd(ctx.probe)? {
            Some(effective) if effective.satisfies(&settings) => {}
            other => {
                tracing::warn!("sshd -T does not show the hardened settings; restoring");
                restore(ctx)?;
                return Err(StepError::Precondition(match other {
                    Some(effective) => format!(
                        "sshd would still run with port {:?}, PermitRootLogin {}, PasswordAuthentication {}; \
                         another file under /etc/ssh overrides {}",
                        effective.ports,
                        effective.permit_root_login,
                        effective.password_authentication,
                        SSHD_CONFIG
                    ),
                    None => "sshd -T failed; cannot confirm the hardened settings".to_string(),
                }));
            }
        }

        ctx.system.restart_service("ssh")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::builtin::testing::{apply, config, satisfied};
    use crate::system::{MockEffect, MockSystem};

    const KEY: &str = "ssh-ed25519 AAAAC3Nza dev@laptop\n";
    const STOCK: &str = "#Port 22\nPermitRootLogin yes\n#PasswordAuthentication yes\n";

    fn host_with_keys() -> MockSystem {
        let mock = MockSystem::new();
        mock.add_user("dev");
        mock.add_file("/home/dev/.ssh/authorized_keys", KEY);
        mock.add_file(SSHD_CONFIG, STOCK);
        mock
    }

    /// Once `sshd -t` passes, `sshd -T` reports `effective`.
    fn effective_after_check(mock: &MockSystem, effective: &EffectiveSshd) {
        mock.on_call(
            "run_command sshd -t",
            vec![MockEffect::SetCapture {
                script: SSHD_EFFECTIVE_SCRIPT.into(),
                output: effective.render(),
            }],
        );
    }

    #[test]
    fn copies_root_keys() {
        let mock = MockSystem::new();
        mock.add_user("dev");
        mock.add_file(ROOT_AUTHORIZED_KEYS, KEY);
        let config = config(&[]);

        assert!(!satisfied(&CopySshKeys, &config, &mock));
        apply(&CopySshKeys, &config, &mock).unwrap();
        assert_eq!(mock.file("/home/dev/.ssh/authorized_keys").as_deref(), Some(KEY));
        assert!(satisfied(&CopySshKeys, &config, &mock));
    }

    #[test]
    fn copy_without_root_keys_fails_and_is_tolerated() {
        let mock = MockSystem::new();
        mock.add_user("dev");

        let err = apply(&CopySshKeys, &config(&[]), &mock).unwrap_err();
        assert!(matches!(err, StepError::Precondition(_)));
        assert_eq!(CopySshKeys.failure_policy(), FailurePolicy::Tolerated);
    }

    #[test]
    fn harden_is_off_by_default() {
        assert!(!HardenSsh.enabled(&config(&[])));
        assert!(HardenSsh.enabled(&config(&[("HARDEN_SSH", "true")])));
    }

    #[test]
    fn hardens_backs_up_and_restarts() {
        let mock = host_with_keys();
        let config = config(&[("HARDEN_SSH", "true"), ("SSH_PORT", "2222")]);
        effective_after_check(&mock, &EffectiveSshd::from(&SshdSettings::hardened(2222)));

        assert!(!satisfied(&HardenSsh, &config, &mock));
        apply(&HardenSsh, &config, &mock).unwrap();

        let written = mock.file(SSHD_CONFIG).unwrap();
        assert!(written.contains("Port 2222\n"));
        assert!(written.contains("PermitRootLogin no\n"));
        assert!(written.contains("PasswordAuthentication no\n"));
        let dropin = mock.file(SSHD_HARDENING_DROPIN).unwrap();
        assert!(dropin.contains("PasswordAuthentication no\n"));
        assert!(satisfied(&HardenSsh, &config, &mock));

        let backups: Vec<_> = mock
            .file_paths()
            .into_iter()
            .filter(|p| p.to_string_lossy().contains(".vpsup-"))
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(mock.file(&backups[0]).as_deref(), Some(STOCK));
        assert_eq!(mock.calls().last().unwrap(), "restart_service ssh");
    }

    #[test]
    fn refuses_without_user_keys() {
        let mock = MockSystem::new();
        mock.add_user("dev");
        mock.add_file(SSHD_CONFIG, STOCK);

        let err = apply(&HardenSsh, &config(&[("HARDEN_SSH", "true")]), &mock).unwrap_err();
        assert!(matches!(err, StepError::Precondition(_)));
        assert_eq!(mock.file(SSHD_CONFIG).as_deref(), Some(STOCK));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn overriding_dropin_keeps_step_pending() {
        let mock = host_with_keys();
        let config = config(&[("HARDEN_SSH", "true")]);
        let settings = SshdSettings::hardened(22);
        mock.add_file(SSHD_CONFIG, &harden_sshd_config(STOCK, &settings));
        mock.add_file(SSHD_HARDENING_DROPIN, &hardening_dropin(&settings));
        mock.add_file(
            "/etc/ssh/sshd_config.d/50-cloud-init.conf",
            "PasswordAuthentication yes\n",
        );
        mock.add_capture(
            SSHD_EFFECTIVE_SCRIPT,
            "port 22\npermitrootlogin no\npasswordauthentication yes\n",
        );

        assert!(!satisfied(&HardenSsh, &config, &mock));

        mock.add_capture(SSHD_EFFECTIVE_SCRIPT, &EffectiveSshd::from(&settings).render());
        assert!(satisfied(&HardenSsh, &config, &mock));
    }

    #[test]
    fn hardened_files_without_dropin_are_pending() {
        let mock = host_with_keys();
        let settings = SshdSettings::hardened(22);
        mock.add_file(SSHD_CONFIG, &harden_sshd_config(STOCK, &settings));
        mock.add_capture(SSHD_EFFECTIVE_SCRIPT, &EffectiveSshd::from(&settings).render());

        assert!(!satisfied(&HardenSsh, &config(&[("HARDEN_SSH", "true")]), &mock));
    }

    #[test]
    fn apply_fails_and_restores_when_another_file_wins() {
        let mock = host_with_keys();
        effective_after_check(
            &mock,
            &EffectiveSshd {
                ports: vec![22],
                permit_root_login: "no".into(),
                password_authentication: "yes".into(),
            },
        );

        let err = apply(&HardenSsh, &config(&[("HARDEN_SSH", "true")]), &mock).unwrap_err();

        assert!(matches!(err, StepError::Precondition(ref m) if m.contains("PasswordAuthentication yes")));
        assert_eq!(mock.file(SSHD_CONFIG).as_deref(), Some(STOCK));
        assert_eq!(mock.file(SSHD_HARDENING_DROPIN).as_deref(), Some(""));
        assert!(!mock.calls().iter().any(|c| c.starts_with("restart_service")));
    }

    #[test]
    fn rejected_config_is_restored() {
        let mock = host_with_keys();
        mock.fail_on("run_command sshd -t");

        let err = apply(&HardenSsh, &config(&[("HARDEN_SSH", "true")]), &mock).unwrap_err();
        assert!(matches!(err, StepError::CommandFailed { .. }));
        assert_eq!(mock.file(SSHD_CONFIG).as_deref(), Some(STOCK));
        assert!(!mock.calls().iter().any(|c| c.starts_with("restart_service")));
    }
}
