//! The closed set of recognized options.
//!
//! Every option has a type, a default and a documented effect. Defaults are
//! written as strings and parsed with the same rules as user input, so a
//! snapshot built from defaults alone is always total.

use serde::Serialize;
use std::fmt;

/// Prefix for environment variables that override options.
pub const ENV_PREFIX: &str = "VPSUP_";

/// A recognized configuration option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionKey {
    Username,
    UserPassword,
    UserShell,
    UpdateSystem,
    UpdateMaxAgeHours,
    BasePackages,
    InstallDocker,
    InstallTailscale,
    TailscaleAuthKey,
    InstallFail2ban,
    ConfigureFirewall,
    SshPort,
    AllowedPorts,
    InstallNode,
    NodeVersion,
    NvmVersion,
    InstallAiClis,
    AiCliPackages,
    SetupTmux,
    TmuxSession,
    ShellProfile,
    CopyRootSshKeys,
    HardenSsh,
}

/// Type of an option's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Str,
    Bool,
    Int,
    /// A TCP/UDP port, 1 to 65535. Stored as an int.
    Port,
    List,
}

impl OptionKind {
    /// Human-readable expectation used in error messages.
    pub fn expected(&self) -> &'static str {
        match self {
            OptionKind::Str => "a string",
            OptionKind::Bool => "a boolean (true/false, yes/no, 1/0, on/off)",
            OptionKind::Int => "a non-negative integer",
            OptionKind::Port => "a port number between 1 and 65535",
            OptionKind::List => "a comma or space separated list",
        }
    }
}

/// Static definition of an option.
pub struct OptionSpec {
    pub key: OptionKey,
    pub name: &'static str,
    pub kind: OptionKind,
    pub default: &'static str,
    pub secret: bool,
    pub description: &'static str,
}

/// All recognized options, in display order.
pub const OPTIONS: &[OptionSpec] = &[
    OptionSpec {
        key: OptionKey::Username,
        name: "USERNAME",
        kind: OptionKind::Str,
        default: "dev",
        secret: false,
        description: "Login user to create and configure",
    },
    OptionSpec {
        key: OptionKey::UserPassword,
        name: "USER_PASSWORD",
        kind: OptionKind::Str,
        default: "",
        secret: true,
        description: "Password for the user (empty prompts interactively)",
    },
    OptionSpec {
        key: OptionKey::UserShell,
        name: "USER_SHELL",
        kind: OptionKind::Str,
        default: "/bin/bash",
        secret: false,
        description: "Login shell for a newly created user",
    },
    OptionSpec {
        key: OptionKey::UpdateSystem,
        name: "UPDATE_SYSTEM",
        kind: OptionKind::Bool,
        default: "true",
        secret: false,
        description: "Refresh package lists and upgrade installed packages",
    },
    OptionSpec {
        key: OptionKey::UpdateMaxAgeHours,
        name: "UPDATE_MAX_AGE_HOURS",
        kind: OptionKind::Int,
        default: "24",
        secret: false,
        description: "Package lists younger than this are considered fresh",
    },
    OptionSpec {
        key: OptionKey::BasePackages,
        name: "BASE_PACKAGES",
        kind: OptionKind::List,
        default: "curl,ca-certificates,git,tmux,ufw,gnupg",
        secret: false,
        description: "Base apt packages",
    },
    OptionSpec {
        key: OptionKey::InstallDocker,
        name: "INSTALL_DOCKER",
        kind: OptionKind::Bool,
        default: "true",
        secret: false,
        description: "Install the Docker engine",
    },
    OptionSpec {
        key: OptionKey::InstallTailscale,
        name: "INSTALL_TAILSCALE",
        kind: OptionKind::Bool,
        default: "true",
        secret: false,
        description: "Install Tailscale",
    },
    OptionSpec {
        key: OptionKey::TailscaleAuthKey,
        name: "TAILSCALE_AUTH_KEY",
        kind: OptionKind::Str,
        default: "",
        secret: true,
        description: "Auth key used to bring the node up non-interactively",
    },
    OptionSpec {
        key: OptionKey::InstallFail2ban,
        name: "INSTALL_FAIL2BAN",
        kind: OptionKind::Bool,
        default: "true",
        secret: false,
        description: "Install and enable fail2ban",
    },
    OptionSpec {
        key: OptionKey::ConfigureFirewall,
        name: "CONFIGURE_FIREWALL",
        kind: OptionKind::Bool,
        default: "true",
        secret: false,
        description: "Reset and configure the UFW firewall",
    },
    OptionSpec {
        key: OptionKey::SshPort,
        name: "SSH_PORT",
        kind: OptionKind::Port,
        default: "22",
        secret: false,
        description: "SSH port allowed through the firewall",
    },
    OptionSpec {
        key: OptionKey::AllowedPorts,
        name: "ALLOWED_PORTS",
        kind: OptionKind::List,
        default: "",
        secret: false,
        description: "Extra firewall rules as port[/proto]",
    },
    OptionSpec {
        key: OptionKey::InstallNode,
        name: "INSTALL_NODE",
        kind: OptionKind::Bool,
        default: "true",
        secret: false,
        description: "Install nvm and Node.js for the user",
    },
    OptionSpec {
        key: OptionKey::NodeVersion,
        name: "NODE_VERSION",
        kind: OptionKind::Int,
        default: "22",
        secret: false,
        description: "Node.js major version",
    },
    OptionSpec {
        key: OptionKey::NvmVersion,
        name: "NVM_VERSION",
        kind: OptionKind::Str,
        default: "v0.40.1",
        secret: false,
        description: "nvm release tag",
    },
    OptionSpec {
        key: OptionKey::InstallAiClis,
        name: "INSTALL_AI_CLIS",
        kind: OptionKind::Bool,
        default: "true",
        secret: false,
        description: "Install AI CLI npm packages",
    },
    OptionSpec {
        key: OptionKey::AiCliPackages,
        name: "AI_CLI_PACKAGES",
        kind: OptionKind::List,
        default: "@anthropic-ai/claude-code",
        secret: false,
        description: "npm packages installed globally for the user",
    },
    OptionSpec {
        key: OptionKey::SetupTmux,
        name: "SETUP_TMUX",
        kind: OptionKind::Bool,
        default: "true",
        secret: false,
        description: "Attach SSH logins to a tmux session",
    },
    OptionSpec {
        key: OptionKey::TmuxSession,
        name: "TMUX_SESSION",
        kind: OptionKind::Str,
        default: "main",
        secret: false,
        description: "tmux session name",
    },
    OptionSpec {
        key: OptionKey::ShellProfile,
        name: "SHELL_PROFILE",
        kind: OptionKind::Str,
        default: ".bashrc",
        secret: false,
        description: "Shell profile, relative to the user's home",
    },
    OptionSpec {
        key: OptionKey::CopyRootSshKeys,
        name: "COPY_ROOT_SSH_KEYS",
        kind: OptionKind::Bool,
        default: "true",
        secret: false,
        description: "Copy root's authorized_keys to the user",
    },
    OptionSpec {
        key: OptionKey::HardenSsh,
        name: "HARDEN_SSH",
        kind: OptionKind::Bool,
        default: "false",
        secret: false,
        description: "Disable root login and password authentication",
    },
];

impl OptionKey {
    /// Static definition of this option.
    pub fn spec(&self) -> &'static OptionSpec {
        OPTIONS
            .iter()
            .find(|spec| spec.key == *self)
            .unwrap_or(&OPTIONS[0])
    }

    /// Name used in override files (`USERNAME`).
    pub fn name(&self) -> &'static str {
        self.spec().name
    }

    /// Environment variable that overrides this option (`VPSUP_USERNAME`).
    pub fn env_var(&self) -> String {
        format!("{}{}", ENV_PREFIX, self.name())
    }

    /// Look up an option by file key, accepting the env prefix too.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        let name = name.strip_prefix(ENV_PREFIX).unwrap_or(name);
        OPTIONS
            .iter()
            .find(|spec| spec.name.eq_ignore_ascii_case(name))
            .map(|spec| spec.key)
    }

    /// All options in display order.
    pub fn all() -> impl Iterator<Item = OptionKey> {
        OPTIONS.iter().map(|spec| spec.key)
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A resolved option value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Str(String),
    Bool(bool),
    Int(u64),
    List(Vec<String>),
}

impl OptionValue {
    /// Parse a raw string as the given kind.
    ///
    /// Returns `None` when the string does not fit the kind.
    pub fn parse(kind: OptionKind, raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match kind {
            OptionKind::Str => Some(OptionValue::Str(raw.to_string())),
            OptionKind::Bool => parse_bool(raw).map(OptionValue::Bool),
            OptionKind::Int => raw.parse::<u64>().ok().map(OptionValue::Int),
            OptionKind::Port => raw
                .parse::<u16>()
                .ok()
                .filter(|port| *port > 0)
                .map(|port| OptionValue::Int(port.into())),
            OptionKind::List => Some(OptionValue::List(
                raw.split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|item| !item.is_empty())
                    .map(String::from)
                    .collect(),
            )),
        }
    }

    /// Render the value as it would appear in an override file.
    pub fn display_value(&self) -> String {
        match self {
            OptionValue::Str(s) => s.clone(),
            OptionValue::Bool(b) => b.to_string(),
            OptionValue::Int(n) => n.to_string(),
            OptionValue::List(items) => items.join(","),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}
