use std::path::Path;
use std::time::Duration;

use crate::config::{ConfigSnapshot, OptionKey};
use crate::error::{ProbeError, StepError};
use crate::probe::StateProbe;
use crate::steps::{ApplyContext, Step};
use crate::system::APT_PKGCACHE;

/// Refresh package lists and upgrade, unless done recently.
pub struct SystemUpdate;

impl Step for SystemUpdate {
    fn id(&self) -> &'static str {
        "system-update"
    }

    fn title(&self) -> &'static str {
        "Update system packages"
    }

    fn enabled(&self, config: &ConfigSnapshot) -> bool {
        config.bool(OptionKey::UpdateSystem)
    }

    fn is_satisfied(
        &self,
        config: &ConfigSnapshot,
        probe: &dyn StateProbe,
    ) -> Result<bool, ProbeError> {
        let hours = config.int(OptionKey::UpdateMaxAgeHours);
        let max_age = Duration::from_secs(hours.saturating_mul(3600));
        Ok(probe
            .file_age(Path::new(APT_PKGCACHE))?
            .is_some_and(|age| age < max_age))
    }

    fn apply(&self, _config: &ConfigSnapshot, ctx: &mut ApplyContext<'_>) -> Result<(), StepError> {
        ctx.system.update_packages()
    }
}

/// Install the base package set.
pub struct BasePackages;

impl BasePackages {
    fn missing(config: &ConfigSnapshot, probe: &dyn StateProbe) -> Result<Vec<String>, ProbeError> {
        let mut missing = Vec::new();
        for package in config.list(OptionKey::BasePackages) {
            if !probe.package_installed(package)? {
                missing.push(package.clone());
            }
        }
        Ok(missing)
    }
}

impl Step for BasePackages {
    fn id(&self) -> &'static str {
        "base-packages"
    }

    fn title(&self) -> &'static str {
        "Install base packages"
    }

    fn is_satisfied(
        &self,
        config: &ConfigSnapshot,
        probe: &dyn StateProbe,
    ) -> Result<bool, ProbeError> {
        Ok(Self::missing(config, probe)?.is_empty())
    }

    fn apply(&self, config: &ConfigSnapshot, ctx: &mut ApplyContext<'_>) -> Result<(), StepError> {
        let missing = Self::missing(config, ctx.probe)?;
        tracing::info!("Installing {}", missing.join(" "));
        ctx.system.install_packages(&missing)
    }
}
