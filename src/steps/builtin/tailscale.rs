use crate::config::{ConfigSnapshot, OptionKey};
use crate::error::{ProbeError, StepError};
use crate::probe::{parse_tailscale_running, StateProbe};
use crate::steps::{ApplyContext, Step};
use crate::system::RunAs;

/// Tailscale's install script.
pub const TAILSCALE_INSTALL_URL: &str = "https://tailscale.com/install.sh";

const STATUS_SCRIPT: &str = "tailscale status --json";

/// Install Tailscale and start its daemon.
pub struct InstallTailscale;

impl Step for InstallTailscale {
    fn id(&self) -> &'static str {
        "install-tailscale"
    }

    fn title(&self) -> &'static str {
        "Install Tailscale"
    }

    fn prerequisites(&self) -> &'static [&'static str] {
        &["base-packages"]
    }

    fn enabled(&self, config: &ConfigSnapshot) -> bool {
        config.bool(OptionKey::InstallTailscale)
    }

    fn is_satisfied(
        &self,
        _config: &ConfigSnapshot,
        probe: &dyn StateProbe,
    ) -> Result<bool, ProbeError> {
        Ok(probe.command_exists("tailscale")? && probe.service_active("tailscaled")?)
    }

    fn apply(&self, _config: &ConfigSnapshot, ctx: &mut ApplyContext<'_>) -> Result<(), StepError> {
        if !ctx.probe.command_exists("tailscale")? {
            ctx.system
                .run_installer(&RunAs::Root, TAILSCALE_INSTALL_URL, &[])?;
        }
        ctx.system.enable_service("tailscaled")
    }
}

/// Join the tailnet with the configured auth key.
///
/// Only enabled when a key is configured; without one, joining is left to
/// an interactive `tailscale up`.
pub struct TailscaleUp;

impl Step for TailscaleUp {
    fn id(&self) -> &'static str {
        "tailscale-up"
    }

    fn title(&self) -> &'static str {
        "Connect to tailnet"
    }

    fn prerequisites(&self) -> &'static [&'static str] {
        &["install-tailscale"]
    }

    fn enabled(&self, config: &ConfigSnapshot) -> bool {
        config.bool(OptionKey::InstallTailscale)
            && !config.string(OptionKey::TailscaleAuthKey).is_empty()
    }

    fn is_satisfied(
        &self,
        _config: &ConfigSnapshot,
        probe: &dyn StateProbe,
    ) -> Result<bool, ProbeError> {
        // `tailscale status` exits non-zero while logged out
        let Some(output) = probe.capture(&RunAs::Root, STATUS_SCRIPT)? else {
            return Ok(false);
        };
        parse_tailscale_running(&output).ok_or_else(|| ProbeError::UnexpectedOutput {
            command: STATUS_SCRIPT.to_string(),
            output: output.trim().chars().take(200).collect(),
        })
    }

    fn apply(&self, config: &ConfigSnapshot, ctx: &mut ApplyContext<'_>) -> Result<(), StepError> {
        let key = config.string(OptionKey::TailscaleAuthKey);
        let args = vec!["up".to_string(), format!("--auth-key={}", key)];
        ctx.system
            .run_command("tailscale", &args)
            .map_err(|e| mask_secret(e, key))
    }
}

/// Replace `secret` in an error's text.
fn mask_secret(error: StepError, secret: &str) -> StepError {
    match error {
        StepError::CommandFailed {
            command,
            code,
            stderr,
        } => StepError::CommandFailed {
            command: command.replace(secret, "********"),
            code,
            stderr: stderr.replace(secret, "********"),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::builtin::testing::{apply, config, satisfied};
    use crate::system::{MockEffect, MockSystem};

    const RUNNING: &str = r#"{"BackendState":"Running","Self":{}}"#;

    #[test]
    fn installs_tailscale() {
        let mock = MockSystem::new();
        mock.on_call(
            TAILSCALE_INSTALL_URL,
            vec![MockEffect::AddCommand("tailscale".into())],
        );
        let config = config(&[]);

        assert!(!satisfied(&InstallTailscale, &config, &mock));
        apply(&InstallTailscale, &config, &mock).unwrap();
        assert!(satisfied(&InstallTailscale, &config, &mock));
    }

    #[test]
    fn up_needs_an_auth_key() {
        assert!(!TailscaleUp.enabled(&config(&[])));
        assert!(TailscaleUp.enabled(&config(&[("TAILSCALE_AUTH_KEY", "tskey-abc")])));
        assert!(!TailscaleUp.enabled(&config(&[
            ("TAILSCALE_AUTH_KEY", "tskey-abc"),
            ("INSTALL_TAILSCALE", "false"),
        ])));
    }

    #[test]
    fn running_backend_is_satisfied() {
        let mock = MockSystem::new();
        let config = config(&[]);
        assert!(!satisfied(&TailscaleUp, &config, &mock));

        mock.add_capture(STATUS_SCRIPT, r#"{"BackendState":"NeedsLogin"}"#);
        assert!(!satisfied(&TailscaleUp, &config, &mock));

        mock.add_capture(STATUS_SCRIPT, RUNNING);
        assert!(satisfied(&TailscaleUp, &config, &mock));
    }

    #[test]
    fn garbage_status_is_a_probe_error() {
        let mock = MockSystem::new();
        mock.add_capture(STATUS_SCRIPT, "not json");
        let err = TailscaleUp.is_satisfied(&config(&[]), &mock).unwrap_err();
        assert!(matches!(err, ProbeError::UnexpectedOutput { .. }));
    }

    #[test]
    fn up_runs_with_key() {
        let mock = MockSystem::new();
        mock.on_call(
            "run_command tailscale up",
            vec![MockEffect::SetCapture {
                script: STATUS_SCRIPT.into(),
                output: RUNNING.into(),
            }],
        );
        let config = config(&[("TAILSCALE_AUTH_KEY", "tskey-abc")]);

        apply(&TailscaleUp, &config, &mock).unwrap();
        assert_eq!(mock.calls(), vec!["run_command tailscale up --auth-key=tskey-abc"]);
        assert!(satisfied(&TailscaleUp, &config, &mock));
    }

    #[test]
    fn failure_does_not_leak_key() {
        let mock = MockSystem::new();
        mock.fail_on("tailscale up");
        let config = config(&[("TAILSCALE_AUTH_KEY", "tskey-secret")]);

        let err = apply(&TailscaleUp, &config, &mock).unwrap_err();
        let message = err.to_string();
        assert!(!message.contains("tskey-secret"));
        assert!(message.contains("--auth-key=********"));
    }
}
