//! Rewriting `sshd_config` for hardening.
//!
//! The rewrite is a pure function of the current file and the desired
//! settings, so "already hardened" is simply `rewrite(current) == current`.

use regex::Regex;
use std::sync::LazyLock;

/// Path of the OpenSSH server configuration.
pub const SSHD_CONFIG: &str = "/etc/ssh/sshd_config";

/// Drop-in holding the hardened login settings.
///
/// Debian and Ubuntu include `sshd_config.d/*.conf` at the top of
/// `sshd_config`, in name order, and sshd keeps the first value it reads.
/// The `00-` prefix puts this file ahead of drop-ins such as cloud-init's
/// `50-cloud-init.conf`.
pub const SSHD_HARDENING_DROPIN: &str = "/etc/ssh/sshd_config.d/00-vpsup-hardening.conf";

/// Prints the configuration sshd would actually run with.
pub const SSHD_EFFECTIVE_SCRIPT: &str = "sshd -T";

/// A directive line, active or commented out: "Port 22", "#Port 22",
/// "# PermitRootLogin prohibit-password".
static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*#?\s*([A-Za-z]+)\s+\S").expect("DIRECTIVE must compile")
});

/// Directives enforced by hardening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshdSettings {
    pub port: u64,
    pub permit_root_login: bool,
    pub password_authentication: bool,
}

impl SshdSettings {
    /// Hardened settings on `port`.
    pub fn hardened(port: u64) -> Self {
        Self {
            port,
            permit_root_login: false,
            password_authentication: false,
        }
    }

    fn directives(&self) -> [(&'static str, String); 3] {
        [
            ("Port", self.port.to_string()),
            ("PermitRootLogin", yes_no(self.permit_root_login).to_string()),
            (
                "PasswordAuthentication",
                yes_no(self.password_authentication).to_string(),
            ),
        ]
    }
}

/// Contents of [`SSHD_HARDENING_DROPIN`].
///
/// `Port` stays in `sshd_config`: sshd listens on every `Port` it reads, so
/// repeating it here would add a listener instead of overriding one.
pub fn hardening_dropin(settings: &SshdSettings) -> String {
    let mut out = String::from("# Managed by vpsup. Overrides later sshd_config.d files.\n");
    for (name, value) in settings.directives().iter().skip(1) {
        out.push_str(&format!("{} {}\n", name, value));
    }
    out
}

/// The settings hardening cares about, as reported by `sshd -T`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveSshd {
    pub ports: Vec<u64>,
    pub permit_root_login: String,
    pub password_authentication: String,
}

impl EffectiveSshd {
    /// Parse `sshd -T` output (lowercase `keyword value` lines).
    pub fn parse(output: &str) -> Self {
        let mut effective = EffectiveSshd::default();
        for line in output.lines() {
            let Some((keyword, value)) = line.trim().split_once(char::is_whitespace) else {
                continue;
            };
            let value = value.trim();
            match keyword {
                "port" => effective.ports.extend(value.parse::<u64>().ok()),
                "permitrootlogin" => effective.permit_root_login = value.to_string(),
                "passwordauthentication" => effective.password_authentication = value.to_string(),
                _ => {}
            }
        }
        effective
    }

    /// Whether sshd runs with `settings`.
    pub fn satisfies(&self, settings: &SshdSettings) -> bool {
        self.ports.contains(&settings.port)
            && self.permit_root_login == yes_no(settings.permit_root_login)
            && self.password_authentication == yes_no(settings.password_authentication)
    }

    /// Render in `sshd -T` layout.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for port in &self.ports {
            out.push_str(&format!("port {}\n", port));
        }
        out.push_str(&format!("permitrootlogin {}\n", self.permit_root_login));
        out.push_str(&format!(
            "passwordauthentication {}\n",
            self.password_authentication
        ));
        out
    }
}

impl From<&SshdSettings> for EffectiveSshd {
    fn from(settings: &SshdSettings) -> Self {
        Self {
            ports: vec![settings.port],
            permit_root_login: yes_no(settings.permit_root_login).to_string(),
            password_authentication: yes_no(settings.password_authentication).to_string(),
        }
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// Apply `settings` to `content`.
///
/// Each directive's first occurrence in the global section (commented out
/// or not) is replaced in place; later duplicates are dropped. Directives
/// that never appear are inserted before the first `Match` block, or
/// appended, because sshd ignores global keywords after a `Match`.
pub fn harden_sshd_config(content: &str, settings: &SshdSettings) -> String {
    let directives = settings.directives();
    let mut written = [false; 3];
    let mut lines: Vec<String> = Vec::new();
    let mut match_index: Option<usize> = None;

    for line in content.lines() {
        if match_index.is_none() && is_match_block(line) {
            match_index = Some(lines.len());
        }

        if match_index.is_some() {
            lines.push(line.to_string());
            continue;
        }

        match directive_index(line, &directives) {
            Some(i) if !written[i] => {
                let (name, value) = &directives[i];
                lines.push(format!("{} {}", name, value));
                written[i] = true;
            }
            Some(i) if is_active(line) => {
                tracing::debug!("Dropping duplicate {} directive", directives[i].0);
            }
            _ => lines.push(line.to_string()),
        }
    }

    let missing: Vec<String> = directives
        .iter()
        .zip(written)
        .filter(|(_, done)| !done)
        .map(|((name, value), _)| format!("{} {}", name, value))
        .collect();

    match match_index {
        Some(index) => {
            for (offset, line) in missing.into_iter().enumerate() {
                lines.insert(index + offset, line);
            }
        }
        None => lines.extend(missing),
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn is_match_block(line: &str) -> bool {
    line.trim_start()
        .split_whitespace()
        .next()
        .is_some_and(|word| word.eq_ignore_ascii_case("match"))
}

fn is_active(line: &str) -> bool {
    !line.trim_start().starts_with('#')
}

fn directive_index(line: &str, directives: &[(&'static str, String); 3]) -> Option<usize> {
    let name = DIRECTIVE.captures(line)?.get(1)?.as_str();
    directives
        .iter()
        .position(|(directive, _)| directive.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    const UBUNTU_DEFAULT: &str = "\
Include /etc/ssh/sshd_config.d/*.conf

#Port 22
#AddressFamily any

#PermitRootLogin prohibit-password
#StrictModes yes

# To disable tunneled clear text passwords, change to no here!
#PasswordAuthentication yes
#PermitEmptyPasswords no

KbdInteractiveAuthentication no
UsePAM yes
Subsystem sftp /usr/lib/openssh/sftp-server
";

    #[test]
    fn replaces_commented_defaults_in_place() {
        let out = harden_sshd_config(UBUNTU_DEFAULT, &SshdSettings::hardened(22));
        assert!(out.contains("\nPort 22\n"));
        assert!(out.contains("\nPermitRootLogin no\n"));
        assert!(out.contains("\nPasswordAuthentication no\n"));
        assert!(!out.contains("#PermitRootLogin"));
        assert!(out.contains("UsePAM yes"));
    }

    #[test]
    fn rewrite_is_idempotent() {
        let settings = SshdSettings::hardened(2222);
        let once = harden_sshd_config(UBUNTU_DEFAULT, &settings);
        let twice = harden_sshd_config(&once, &settings);
        assert_eq!(once, twice);
    }

    #[test]
    fn sets_custom_port() {
        let out = harden_sshd_config("Port 22\n", &SshdSettings::hardened(2222));
        assert!(out.starts_with("Port 2222\n"));
    }

    #[test]
    fn appends_missing_directives() {
        let out = harden_sshd_config("UsePAM yes\n", &SshdSettings::hardened(22));
        assert_eq!(
            out,
            "UsePAM yes\nPort 22\nPermitRootLogin no\nPasswordAuthentication no\n"
        );
    }

    #[test]
    fn inserts_before_match_block() {
        let content = "UsePAM yes\nMatch User backup\n    PasswordAuthentication yes\n";
        let out = harden_sshd_config(content, &SshdSettings::hardened(22));
        let match_pos = out.find("Match User backup").unwrap();
        let root_pos = out.find("PermitRootLogin no").unwrap();
        assert!(root_pos < match_pos);
        assert!(out.contains("    PasswordAuthentication yes"));
    }

    #[test]
    fn drops_active_duplicates() {
        let content = "PermitRootLogin yes\nPermitRootLogin without-password\n";
        let out = harden_sshd_config(content, &SshdSettings::hardened(22));
        assert_eq!(out.matches("PermitRootLogin").count(), 1);
    }

    #[test]
    fn indented_and_spaced_comments_are_directives() {
        let directives = SshdSettings::hardened(22).directives();
        assert_eq!(directive_index("  # PermitRootLogin prohibit-password", &directives), Some(1));
        assert_eq!(directive_index("\tpasswordauthentication yes", &directives), Some(2));
        assert_eq!(directive_index("# To disable tunneled passwords", &directives), None);
        assert_eq!(directive_index("UsePAM yes", &directives), None);
    }

    #[test]
    fn dropin_carries_login_settings_only() {
        let dropin = hardening_dropin(&SshdSettings::hardened(2222));
        assert!(dropin.contains("\nPermitRootLogin no\n"));
        assert!(dropin.contains("\nPasswordAuthentication no\n"));
        assert!(!dropin.contains("Port"));
        assert!(SSHD_HARDENING_DROPIN < "/etc/ssh/sshd_config.d/50-cloud-init.conf");
    }

    #[test]
    fn effective_config_reflects_overriding_dropin() {
        // main file hardened, 50-cloud-init.conf still says yes
        let output = "port 22\naddressfamily any\npermitrootlogin no\npasswordauthentication yes\n";
        let effective = EffectiveSshd::parse(output);
        assert_eq!(effective.ports, vec![22]);
        assert_eq!(effective.password_authentication, "yes");
        assert!(!effective.satisfies(&SshdSettings::hardened(22)));
    }

    #[test]
    fn effective_config_matches_hardened_settings() {
        let settings = SshdSettings::hardened(2222);
        let effective = EffectiveSshd::parse(&EffectiveSshd::from(&settings).render());
        assert!(effective.satisfies(&settings));
        assert!(!effective.satisfies(&SshdSettings::hardened(22)));
        assert!(!EffectiveSshd::parse("").satisfies(&settings));
    }

    #[test]
    fn already_hardened_config_is_unchanged() {
        let hardened = "Port 22\nPermitRootLogin no\nPasswordAuthentication no\n";
        assert_eq!(
            harden_sshd_config(hardened, &SshdSettings::hardened(22)),
            hardened
        );
    }
}
