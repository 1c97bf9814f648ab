//! Host platform detection.

use std::path::Path;

use crate::config::EnvFileParser;

/// Path to the os-release file.
pub const OS_RELEASE: &str = "/etc/os-release";

/// Distribution identity from os-release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsRelease {
    /// `ID` (e.g. "ubuntu").
    pub id: String,
    /// `ID_LIKE` entries (e.g. ["debian"]).
    pub id_like: Vec<String>,
    /// `PRETTY_NAME`, when present.
    pub pretty_name: Option<String>,
}

impl OsRelease {
    /// Parse os-release content.
    pub fn parse(content: &str) -> Option<Self> {
        let vars = EnvFileParser::parse(content).ok()?;
        let id = vars.get("ID")?.to_lowercase();
        let id_like = vars
            .get("ID_LIKE")
            .map(|v| v.split_whitespace().map(str::to_lowercase).collect())
            .unwrap_or_default();

        Some(Self {
            id,
            id_like,
            pretty_name: vars.get("PRETTY_NAME").cloned(),
        })
    }

    /// Read and parse an os-release file.
    pub fn load(path: &Path) -> Option<Self> {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|c| Self::parse(&c))
    }

    /// Whether this is Debian or a Debian derivative (apt, dpkg, systemd).
    pub fn is_debian_family(&self) -> bool {
        self.id == "debian"
            || self.id == "ubuntu"
            || self.id_like.iter().any(|l| l == "debian" || l == "ubuntu")
    }

    /// Display name for headers.
    pub fn display_name(&self) -> &str {
        self.pretty_name.as_deref().unwrap_or(&self.id)
    }
}

/// Check if running in a CI environment.
///
/// Used to force non-interactive mode in `main()`. Checks common CI
/// environment variables: `CI`, `GITHUB_ACTIONS`, `GITLAB_CI`, `CIRCLECI`,
/// `TRAVIS`, `JENKINS_URL`.
pub fn is_ci() -> bool {
    std::env::var("CI").is_ok()
        || std::env::var("GITHUB_ACTIONS").is_ok()
        || std::env::var("GITLAB_CI").is_ok()
        || std::env::var("CIRCLECI").is_ok()
        || std::env::var("TRAVIS").is_ok()
        || std::env::var("JENKINS_URL").is_ok()
}

/// Check if running as root.
pub fn is_elevated() -> bool {
    #[cfg(unix)]
    {
        // SAFETY: geteuid() is a simple syscall that returns the effective user ID
        unsafe { libc::geteuid() == 0 }
    }

    #[cfg(not(unix))]
    {
        false
    }
}
