use crate::config::{ConfigSnapshot, OptionKey};
use crate::error::{ProbeError, StepError};
use crate::probe::StateProbe;
use crate::steps::{ApplyContext, FailurePolicy, Step};
use crate::system::RunAs;

/// Docker's convenience install script.
pub const DOCKER_INSTALL_URL: &str = "https://get.docker.com";

/// Install Docker Engine and start it.
pub struct InstallDocker;

impl Step for InstallDocker {
    fn id(&self) -> &'static str {
        "install-docker"
    }

    fn title(&self) -> &'static str {
        "Install Docker"
    }

    fn prerequisites(&self) -> &'static [&'static str] {
        &["base-packages"]
    }

    fn enabled(&self, config: &ConfigSnapshot) -> bool {
        config.bool(OptionKey::InstallDocker)
    }

    fn is_satisfied(
        &self,
        _config: &ConfigSnapshot,
        probe: &dyn StateProbe,
    ) -> Result<bool, ProbeError> {
        Ok(probe.command_exists("docker")? && probe.service_active("docker")?)
    }

    fn apply(&self, _config: &ConfigSnapshot, ctx: &mut ApplyContext<'_>) -> Result<(), StepError> {
        if !ctx.probe.command_exists("docker")? {
            ctx.system.run_installer(&RunAs::Root, DOCKER_INSTALL_URL, &[])?;
        }
        ctx.system.enable_service("docker")
    }
}

/// Let the user run docker without sudo.
///
/// Failure is tolerated: the rest of the machine is still useful.
pub struct DockerGroup;

impl Step for DockerGroup {
    fn id(&self) -> &'static str {
        "docker-group"
    }

    fn title(&self) -> &'static str {
        "Add user to docker group"
    }

    fn prerequisites(&self) -> &'static [&'static str] {
        &["create-user", "install-docker"]
    }

    fn enabled(&self, config: &ConfigSnapshot) -> bool {
        config.bool(OptionKey::InstallDocker)
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Tolerated
    }

    fn is_satisfied(
        &self,
        config: &ConfigSnapshot,
        probe: &dyn StateProbe,
    ) -> Result<bool, ProbeError> {
        Ok(probe
            .user_groups(config.username())?
            .iter()
            .any(|g| g == "docker"))
    }

    fn apply(&self, config: &ConfigSnapshot, ctx: &mut ApplyContext<'_>) -> Result<(), StepError> {
        ctx.system.add_to_group(config.username(), "docker")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::builtin::testing::{apply, config, satisfied};
    use crate::system::{MockEffect, MockSystem};

    fn docker_installer(mock: &MockSystem) {
        mock.on_call(
            DOCKER_INSTALL_URL,
            vec![MockEffect::AddCommand("docker".into())],
        );
    }

    #[test]
    fn installs_and_enables_docker() {
        let mock = MockSystem::new();
        docker_installer(&mock);
        let config = config(&[]);

        assert!(!satisfied(&InstallDocker, &config, &mock));
        apply(&InstallDocker, &config, &mock).unwrap();

        assert_eq!(
            mock.calls(),
            vec![
                "run_installer root https://get.docker.com",
                "enable_service docker"
            ]
        );
        assert!(satisfied(&InstallDocker, &config, &mock));
    }

    #[test]
    fn installed_but_stopped_docker_is_only_enabled() {
        let mock = MockSystem::new();
        mock.add_command("docker");
        let config = config(&[]);

        assert!(!satisfied(&InstallDocker, &config, &mock));
        apply(&InstallDocker, &config, &mock).unwrap();
        assert_eq!(mock.calls(), vec!["enable_service docker"]);
    }

    #[test]
    fn disabled_by_flag() {
        let config = config(&[("INSTALL_DOCKER", "false")]);
        assert!(!InstallDocker.enabled(&config));
        assert!(!DockerGroup.enabled(&config));
    }

    #[test]
    fn group_membership_is_tolerated() {
        assert_eq!(DockerGroup.failure_policy(), FailurePolicy::Tolerated);

        let mock = MockSystem::new();
        mock.add_user("dev");
        let config = config(&[]);
        assert!(!satisfied(&DockerGroup, &config, &mock));

        apply(&DockerGroup, &config, &mock).unwrap();
        assert!(satisfied(&DockerGroup, &config, &mock));
    }
}
