use crate::config::{ConfigSnapshot, OptionKey};
use crate::error::{ProbeError, StepError};
use crate::probe::StateProbe;
use crate::steps::{ApplyContext, Step};
use crate::system::firewall::{expected_rules, plan_commands};
use crate::system::{FirewallStatus, RunAs};

/// Install fail2ban and start it.
pub struct InstallFail2ban;

impl Step for InstallFail2ban {
    fn id(&self) -> &'static str {
        "install-fail2ban"
    }

    fn title(&self) -> &'static str {
        "Install fail2ban"
    }

    fn enabled(&self, config: &ConfigSnapshot) -> bool {
        config.bool(OptionKey::InstallFail2ban)
    }

    fn is_satisfied(
        &self,
        _config: &ConfigSnapshot,
        probe: &dyn StateProbe,
    ) -> Result<bool, ProbeError> {
        Ok(probe.package_installed("fail2ban")? && probe.service_active("fail2ban")?)
    }

    fn apply(&self, _config: &ConfigSnapshot, ctx: &mut ApplyContext<'_>) -> Result<(), StepError> {
        if !ctx.probe.package_installed("fail2ban")? {
            ctx.system.install_packages(&["fail2ban".to_string()])?;
        }
        ctx.system.enable_service("fail2ban")
    }
}

/// Deny inbound traffic except SSH and `ALLOWED_PORTS`.
///
/// The SSH rule is added before the firewall is enabled, so an active
/// session is never cut off.
pub struct ConfigureFirewall;

const STATUS_SCRIPT: &str = "ufw status";

impl Step for ConfigureFirewall {
    fn id(&self) -> &'static str {
        "configure-firewall"
    }

    fn title(&self) -> &'static str {
        "Configure firewall"
    }

    fn prerequisites(&self) -> &'static [&'static str] {
        &["base-packages"]
    }

    fn enabled(&self, config: &ConfigSnapshot) -> bool {
        config.bool(OptionKey::ConfigureFirewall)
    }

    fn is_satisfied(
        &self,
        config: &ConfigSnapshot,
        probe: &dyn StateProbe,
    ) -> Result<bool, ProbeError> {
        // a bad entry is reported by apply
        let Ok(rules) = expected_rules(config) else {
            return Ok(false);
        };
        Ok(probe
            .capture(&RunAs::Root, STATUS_SCRIPT)?
            .is_some_and(|output| FirewallStatus::parse(&output).satisfies(&rules)))
    }

    fn apply(&self, config: &ConfigSnapshot, ctx: &mut ApplyContext<'_>) -> Result<(), StepError> {
        let rules = expected_rules(config).map_err(|entry| {
            StepError::Precondition(format!(
                "Invalid ALLOWED_PORTS entry '{}': expected PORT, PORT/tcp, PORT/udp or LOW:HIGH/PROTO",
                entry
            ))
        })?;

        for args in plan_commands(&rules) {
            ctx.system.run_command("ufw", &args)?;
        }
        Ok(())
    }
}
