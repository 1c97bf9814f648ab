use regex::Regex;
use std::sync::LazyLock;

use crate::config::{ConfigSnapshot, OptionKey};
use crate::error::{ProbeError, StepError};
use crate::probe::StateProbe;
use crate::steps::{ApplyContext, Step};

/// Group that grants sudo on Debian and Ubuntu.
const SUDO_GROUP: &str = "sudo";

/// Login names `useradd` accepts without `--badname`.
static USERNAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z_][a-z0-9_-]{0,31}$").expect("USERNAME must compile")
});

fn valid_username(name: &str) -> bool {
    USERNAME.is_match(name)
}

/// Create the login user.
pub struct CreateUser;

impl Step for CreateUser {
    fn id(&self) -> &'static str {
        "create-user"
    }

    fn title(&self) -> &'static str {
        "Create login user"
    }

    fn is_satisfied(
        &self,
        config: &ConfigSnapshot,
        probe: &dyn StateProbe,
    ) -> Result<bool, ProbeError> {
        probe.user_exists(config.username())
    }

    fn apply(&self, config: &ConfigSnapshot, ctx: &mut ApplyContext<'_>) -> Result<(), StepError> {
        let name = config.username();
        if !valid_username(name) {
            return Err(StepError::Precondition(format!(
                "USERNAME '{}' is not a valid login name",
                name
            )));
        }
        ctx.system
            .create_user(name, config.string(OptionKey::UserShell))
    }
}

/// Grant the user sudo.
pub struct UserSudo;

impl Step for UserSudo {
    fn id(&self) -> &'static str {
        "user-sudo"
    }

    fn title(&self) -> &'static str {
        "Add user to sudo group"
    }

    fn prerequisites(&self) -> &'static [&'static str] {
        &["create-user"]
    }

    fn is_satisfied(
        &self,
        config: &ConfigSnapshot,
        probe: &dyn StateProbe,
    ) -> Result<bool, ProbeError> {
        Ok(probe
            .user_groups(config.username())?
            .iter()
            .any(|g| g == SUDO_GROUP))
    }

    fn apply(&self, config: &ConfigSnapshot, ctx: &mut ApplyContext<'_>) -> Result<(), StepError> {
        ctx.system.add_to_group(config.username(), SUDO_GROUP)
    }
}

/// Give the user a usable password.
///
/// The password comes from `USER_PASSWORD`, or from the prompt when the
/// option is empty. A user that already has a password is left alone.
pub struct UserPassword;

impl Step for UserPassword {
    fn id(&self) -> &'static str {
        "user-password"
    }

    fn title(&self) -> &'static str {
        "Set user password"
    }

    fn prerequisites(&self) -> &'static [&'static str] {
        &["create-user"]
    }

    fn is_satisfied(
        &self,
        config: &ConfigSnapshot,
        probe: &dyn StateProbe,
    ) -> Result<bool, ProbeError> {
        Ok(probe
            .password_status(config.username())?
            .is_some_and(|status| !status.needs_password()))
    }

    fn apply(&self, config: &ConfigSnapshot, ctx: &mut ApplyContext<'_>) -> Result<(), StepError> {
        let user = config.username();
        let configured = config.string(OptionKey::UserPassword);

        let password = if configured.is_empty() {
            ctx.prompt
                .read_secret(&format!("Password for {}", user))?
                .filter(|p| !p.is_empty())
                .ok_or_else(|| {
                    StepError::Precondition(
                        "USER_PASSWORD is empty and no terminal is available to ask for one"
                            .to_string(),
                    )
                })?
        } else {
            configured.to_string()
        };

        ctx.system.set_password(user, &password)
    }
}
