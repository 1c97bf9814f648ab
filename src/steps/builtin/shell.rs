use crate::config::{ConfigSnapshot, OptionKey};
use crate::error::{ProbeError, StepError};
use crate::probe::StateProbe;
use crate::steps::{ApplyContext, Step};
use crate::system::{ExecIdentity, FileOwner, ProfileBlock};

use super::{shell_quote, target_home};

/// Attach to a named tmux session on SSH login.
pub struct TmuxProfile;

impl TmuxProfile {
    fn block(config: &ConfigSnapshot) -> ProfileBlock {
        let session = shell_quote(config.string(OptionKey::TmuxSession));
        ProfileBlock::new(
            "tmux",
            format!(
                r#"if command -v tmux >/dev/null 2>&1 && [ -n "$SSH_CONNECTION" ] && [ -z "$TMUX" ]; then
  case $- in
    *i*) tmux new-session -A -s {} ;;
  esac
fi"#,
                session
            ),
        )
    }
}

impl Step for TmuxProfile {
    fn id(&self) -> &'static str {
        "tmux-profile"
    }

    fn title(&self) -> &'static str {
        "Auto-attach tmux on login"
    }

    fn prerequisites(&self) -> &'static [&'static str] {
        &["create-user", "base-packages"]
    }

    fn identity(&self) -> ExecIdentity {
        ExecIdentity::TargetUser
    }

    fn enabled(&self, config: &ConfigSnapshot) -> bool {
        config.bool(OptionKey::SetupTmux)
    }

    fn is_satisfied(
        &self,
        config: &ConfigSnapshot,
        probe: &dyn StateProbe,
    ) -> Result<bool, ProbeError> {
        let profile = target_home(config, probe)?.join(config.string(OptionKey::ShellProfile));
        Ok(probe
            .read_file(&profile)?
            .is_some_and(|content| Self::block(config).is_present_in(&content)))
    }

    fn apply(&self, config: &ConfigSnapshot, ctx: &mut ApplyContext<'_>) -> Result<(), StepError> {
        let profile = target_home(config, ctx.probe)?.join(config.string(OptionKey::ShellProfile));
        let owner = FileOwner::user(config.username(), 0o644);
        if !ctx.system.upsert_block(&profile, &Self::block(config), &owner)? {
            tracing::debug!("{} already has the tmux block", profile.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::builtin::testing::{apply, config, satisfied};
    use crate::system::MockSystem;

    #[test]
    fn appends_block_once() {
        let mock = MockSystem::new();
        mock.add_user("dev");
        mock.add_file("/home/dev/.bashrc", "alias ll='ls -l'\n");
        let config = config(&[]);

        assert!(!satisfied(&TmuxProfile, &config, &mock));
        apply(&TmuxProfile, &config, &mock).unwrap();
        assert!(satisfied(&TmuxProfile, &config, &mock));
        apply(&TmuxProfile, &config, &mock).unwrap();

        let content = mock.file("/home/dev/.bashrc").unwrap();
        assert!(content.starts_with("alias ll='ls -l'\n"));
        assert_eq!(content.matches("# >>> vpsup:tmux >>>").count(), 1);
        assert!(content.contains("tmux new-session -A -s main"));
    }

    #[test]
    fn honors_profile_and_session_options() {
        let mock = MockSystem::new();
        mock.add_user("dev");
        let config = config(&[("SHELL_PROFILE", ".zshrc"), ("TMUX_SESSION", "work")]);

        apply(&TmuxProfile, &config, &mock).unwrap();

        let content = mock.file("/home/dev/.zshrc").unwrap();
        assert!(content.contains("tmux new-session -A -s work"));
        assert!(mock.file("/home/dev/.bashrc").is_none());
    }

    #[test]
    fn missing_profile_is_not_satisfied() {
        let mock = MockSystem::new();
        mock.add_user("dev");
        assert!(!satisfied(&TmuxProfile, &config(&[]), &mock));
    }
}
