//! The provisioning steps vpsup ships with.
//!
//! Each step reads everything it needs from the [`ConfigSnapshot`] and
//! checks its effect through the probe, never through its own history.

mod docker;
mod node;
mod packages;
mod security;
mod shell;
mod ssh;
mod tailscale;
mod user;

pub use docker::{DockerGroup, InstallDocker};
pub use node::{InstallAiClis, InstallNode};
pub use packages::{BasePackages, SystemUpdate};
pub use security::{ConfigureFirewall, InstallFail2ban};
pub use shell::TmuxProfile;
pub use ssh::{CopySshKeys, HardenSsh};
pub use tailscale::{InstallTailscale, TailscaleUp};
pub use user::{CreateUser, UserPassword, UserSudo};

use std::path::PathBuf;

use crate::config::ConfigSnapshot;
use crate::error::ProbeError;
use crate::probe::{home_of, StateProbe};

/// Home directory of the configured user.
fn target_home(config: &ConfigSnapshot, probe: &dyn StateProbe) -> Result<PathBuf, ProbeError> {
    home_of(probe, config.username())
}

/// Quote a word for `sh`.
fn shell_quote(word: &str) -> String {
    if !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@/._-=:+".contains(c))
    {
        return word.to_string();
    }
    format!("'{}'", word.replace('\'', r"'\''"))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_words_are_not_quoted() {
        assert_eq!(shell_quote("@anthropic-ai/claude-code"), "@anthropic-ai/claude-code");
        assert_eq!(shell_quote("typescript@5.4"), "typescript@5.4");
    }

    #[test]
    fn unsafe_words_are_single_quoted() {
        assert_eq!(shell_quote("a b"), "'a b'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }
}
