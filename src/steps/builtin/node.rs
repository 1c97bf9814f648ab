use crate::config::{ConfigSnapshot, OptionKey};
use crate::error::{ProbeError, StepError};
use crate::probe::{npm_spec_name, parse_node_major, parse_npm_global_packages, StateProbe};
use crate::steps::{ApplyContext, Step};
use crate::system::ExecIdentity;

use super::{shell_quote, target_home};

/// Loads nvm into a non-interactive shell.
const NVM_LOAD: &str = r#"export NVM_DIR="$HOME/.nvm"; . "$NVM_DIR/nvm.sh""#;

fn nvm_install_url(version: &str) -> String {
    format!(
        "https://raw.githubusercontent.com/nvm-sh/nvm/{}/install.sh",
        version
    )
}

fn node_version_script() -> String {
    format!("{} && node --version", NVM_LOAD)
}

fn npm_list_script() -> String {
    format!("{} && npm ls -g --depth=0 --json", NVM_LOAD)
}

/// Install nvm and the configured Node.js major for the user.
pub struct InstallNode;

impl Step for InstallNode {
    fn id(&self) -> &'static str {
        "install-node"
    }

    fn title(&self) -> &'static str {
        "Install Node.js"
    }

    fn prerequisites(&self) -> &'static [&'static str] {
        &["create-user", "base-packages"]
    }

    fn identity(&self) -> ExecIdentity {
        ExecIdentity::TargetUser
    }

    fn enabled(&self, config: &ConfigSnapshot) -> bool {
        config.bool(OptionKey::InstallNode)
    }

    fn is_satisfied(
        &self,
        config: &ConfigSnapshot,
        probe: &dyn StateProbe,
    ) -> Result<bool, ProbeError> {
        let run_as = self.identity().resolve(config);
        let wanted = config.int(OptionKey::NodeVersion);
        Ok(probe
            .capture(&run_as, &node_version_script())?
            .and_then(|output| parse_node_major(&output))
            .is_some_and(|major| major == wanted))
    }

    fn apply(&self, config: &ConfigSnapshot, ctx: &mut ApplyContext<'_>) -> Result<(), StepError> {
        let nvm_script = target_home(config, ctx.probe)?.join(".nvm").join("nvm.sh");
        if ctx.probe.file_age(&nvm_script)?.is_none() {
            let url = nvm_install_url(config.string(OptionKey::NvmVersion));
            ctx.system.run_installer(&ctx.run_as, &url, &[])?;
        }

        let version = config.int(OptionKey::NodeVersion);
        ctx.run_script(&format!(
            "{} && nvm install {v} && nvm alias default {v}",
            NVM_LOAD,
            v = version
        ))
    }
}

/// Install the AI command-line tools globally with npm.
pub struct InstallAiClis;

impl Step for InstallAiClis {
    fn id(&self) -> &'static str {
        "install-ai-clis"
    }

    fn title(&self) -> &'static str {
        "Install AI CLIs"
    }

    fn prerequisites(&self) -> &'static [&'static str] {
        &["install-node"]
    }

    fn identity(&self) -> ExecIdentity {
        ExecIdentity::TargetUser
    }

    fn enabled(&self, config: &ConfigSnapshot) -> bool {
        config.bool(OptionKey::InstallNode)
            && config.bool(OptionKey::InstallAiClis)
            && !config.list(OptionKey::AiCliPackages).is_empty()
    }

    fn is_satisfied(
        &self,
        config: &ConfigSnapshot,
        probe: &dyn StateProbe,
    ) -> Result<bool, ProbeError> {
        let run_as = self.identity().resolve(config);
        let script = npm_list_script();
        let Some(output) = probe.capture(&run_as, &script)? else {
            return Ok(false);
        };
        let installed =
            parse_npm_global_packages(&output).ok_or_else(|| ProbeError::UnexpectedOutput {
                command: "npm ls -g --depth=0 --json".to_string(),
                output: output.trim().chars().take(200).collect(),
            })?;

        Ok(config
            .list(OptionKey::AiCliPackages)
            .iter()
            .all(|spec| installed.iter().any(|name| name == npm_spec_name(spec))))
    }

    fn apply(&self, config: &ConfigSnapshot, ctx: &mut ApplyContext<'_>) -> Result<(), StepError> {
        let packages: Vec<String> = config
            .list(OptionKey::AiCliPackages)
            .iter()
            .map(|p| shell_quote(p))
            .collect();
        ctx.run_script(&format!(
            "{} && npm install -g {}",
            NVM_LOAD,
            packages.join(" ")
        ))
    }
}
