//! UFW rule planning and status parsing.

use std::fmt;

use crate::config::{ConfigSnapshot, OptionKey};

/// A single inbound allow rule (`port[/proto]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallRule {
    /// Port or `low:high` range.
    pub port: String,
    /// `tcp` or `udp`; `None` allows both.
    pub proto: Option<String>,
}

impl FirewallRule {
    /// Parse `22`, `443/tcp`, or `60000:61000/udp`.
    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        let (port, proto) = match spec.split_once('/') {
            Some((port, proto)) => (port, Some(proto.to_lowercase())),
            None => (spec, None),
        };

        if let Some(proto) = &proto {
            if proto != "tcp" && proto != "udp" {
                return None;
            }
        }

        let valid_port = |p: &str| p.parse::<u16>().is_ok_and(|n| n > 0);
        let port_ok = match port.split_once(':') {
            // ufw only accepts ranges with an explicit protocol
            Some((low, high)) => valid_port(low) && valid_port(high) && proto.is_some(),
            None => valid_port(port),
        };

        port_ok.then(|| Self {
            port: port.to_string(),
            proto,
        })
    }

    /// TCP rule for the SSH port.
    pub fn ssh(port: u64) -> Self {
        Self {
            port: port.to_string(),
            proto: Some("tcp".to_string()),
        }
    }
}

impl fmt::Display for FirewallRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.proto {
            Some(proto) => write!(f, "{}/{}", self.port, proto),
            None => write!(f, "{}", self.port),
        }
    }
}

/// Port sshd listens on until hardening moves it.
pub const DEFAULT_SSH_PORT: u64 = 22;

/// Rules the firewall must allow: the SSH port plus `ALLOWED_PORTS`.
///
/// Only the hardening step moves sshd to `SSH_PORT`. Without it sshd stays
/// on port 22, which is then allowed too so logins keep working.
///
/// Returns the offending entry if one does not parse.
pub fn expected_rules(config: &ConfigSnapshot) -> Result<Vec<FirewallRule>, String> {
    let mut rules = vec![FirewallRule::ssh(config.ssh_port())];
    if config.ssh_port() != DEFAULT_SSH_PORT && !config.bool(OptionKey::HardenSsh) {
        tracing::warn!(
            "SSH_PORT is {} but HARDEN_SSH is off, so sshd stays on {}; allowing both",
            config.ssh_port(),
            DEFAULT_SSH_PORT
        );
        rules.push(FirewallRule::ssh(DEFAULT_SSH_PORT));
    }
    for entry in config.list(OptionKey::AllowedPorts) {
        let rule = FirewallRule::parse(entry).ok_or_else(|| entry.clone())?;
        if !rules.contains(&rule) {
            rules.push(rule);
        }
    }
    Ok(rules)
}

/// `ufw` invocations that bring the firewall to exactly `rules`.
///
/// Starts from a reset so stale rules never survive a reapply.
pub fn plan_commands(rules: &[FirewallRule]) -> Vec<Vec<String>> {
    let args = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    let mut commands = vec![
        args(&["--force", "reset"]),
        args(&["default", "deny", "incoming"]),
        args(&["default", "allow", "outgoing"]),
    ];
    for rule in rules {
        commands.push(vec!["allow".to_string(), rule.to_string()]);
    }
    commands.push(args(&["--force", "enable"]));
    commands
}

/// Parsed `ufw status` output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FirewallStatus {
    pub active: bool,
    /// IPv4 allow targets in listing order (e.g. `22/tcp`).
    pub allowed: Vec<String>,
}

impl FirewallStatus {
    /// Parse the output of `ufw status`.
    pub fn parse(output: &str) -> Self {
        let mut status = FirewallStatus::default();
        let mut in_table = false;

        for line in output.lines() {
            let trimmed = line.trim();
            if let Some(state) = trimmed.strip_prefix("Status:") {
                status.active = state.trim() == "active";
                continue;
            }
            if trimmed.starts_with("--") {
                in_table = true;
                continue;
            }
            if !in_table || trimmed.is_empty() || trimmed.contains("(v6)") {
                continue;
            }

            let mut fields = trimmed.split_whitespace();
            if let (Some(target), Some(action)) = (fields.next(), fields.next()) {
                if action == "ALLOW" {
                    status.allowed.push(target.to_string());
                }
            }
        }

        status
    }

    /// Whether the firewall is active and allows every rule.
    pub fn satisfies(&self, rules: &[FirewallRule]) -> bool {
        self.active
            && rules
                .iter()
                .all(|rule| self.allowed.iter().any(|a| *a == rule.to_string()))
    }

    /// Render status text in `ufw status` layout.
    pub fn render(&self) -> String {
        if !self.active {
            return "Status: inactive\n".to_string();
        }
        let mut out = String::from("Status: active\n\n");
        out.push_str(&format!("{:<27}{:<12}{}\n", "To", "Action", "From"));
        out.push_str(&format!("{:<27}{:<12}{}\n", "--", "------", "----"));
        for target in &self.allowed {
            out.push_str(&format!("{:<27}{:<12}{}\n", target, "ALLOW", "Anywhere"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigResolver;
    use std::collections::HashMap;

    const ACTIVE: &str = "\
Status: active

To                         Action      From
--                         ------      ----
22/tcp                     ALLOW       Anywhere
8080                       ALLOW       Anywhere
3000/tcp                   DENY        Anywhere
22/tcp (v6)                ALLOW       Anywhere (v6)
8080 (v6)                  ALLOW       Anywhere (v6)
";

    #[test]
    fn parses_rules() {
        assert_eq!(
            FirewallRule::parse("443/TCP"),
            Some(FirewallRule {
                port: "443".into(),
                proto: Some("tcp".into())
            })
        );
        assert_eq!(FirewallRule::parse("8080").unwrap().to_string(), "8080");
        assert!(FirewallRule::parse("60000:61000/udp").is_some());
        assert!(FirewallRule::parse("60000:61000").is_none());
        assert!(FirewallRule::parse("0").is_none());
        assert!(FirewallRule::parse("http").is_none());
        assert!(FirewallRule::parse("53/icmp").is_none());
    }

    #[test]
    fn parses_active_status() {
        let status = FirewallStatus::parse(ACTIVE);
        assert!(status.active);
        assert_eq!(status.allowed, vec!["22/tcp", "8080"]);
    }

    #[test]
    fn parses_inactive_status() {
        let status = FirewallStatus::parse("Status: inactive\n");
        assert!(!status.active);
        assert!(status.allowed.is_empty());
    }

    #[test]
    fn satisfies_requires_every_rule() {
        let status = FirewallStatus::parse(ACTIVE);
        assert!(status.satisfies(&[FirewallRule::ssh(22)]));
        assert!(status.satisfies(&[
            FirewallRule::ssh(22),
            FirewallRule::parse("8080").unwrap()
        ]));
        assert!(!status.satisfies(&[FirewallRule::parse("3000/tcp").unwrap()]));
        assert!(!FirewallStatus::parse("Status: inactive").satisfies(&[]));
    }

    #[test]
    fn render_round_trips_through_parse() {
        let status = FirewallStatus {
            active: true,
            allowed: vec!["22/tcp".into(), "443/tcp".into()],
        };
        assert_eq!(FirewallStatus::parse(&status.render()), status);
    }

    fn rules_for(pairs: &[(&str, &str)]) -> Vec<String> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let config = ConfigResolver::new().with_env(env).resolve().unwrap();
        expected_rules(&config)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn moved_port_without_hardening_keeps_port_22_open() {
        assert_eq!(
            rules_for(&[("VPSUP_SSH_PORT", "2222")]),
            vec!["2222/tcp", "22/tcp"]
        );
        assert_eq!(
            rules_for(&[("VPSUP_SSH_PORT", "2222"), ("VPSUP_HARDEN_SSH", "true")]),
            vec!["2222/tcp"]
        );
        assert_eq!(rules_for(&[]), vec!["22/tcp"]);
    }

    #[test]
    fn expected_rules_include_ssh_and_extras() {
        let env = HashMap::from([
            ("VPSUP_HARDEN_SSH".to_string(), "true".to_string()),
            ("VPSUP_SSH_PORT".to_string(), "2222".to_string()),
            ("VPSUP_ALLOWED_PORTS".to_string(), "80/tcp, 443/tcp".to_string()),
        ]);
        let config = ConfigResolver::new().with_env(env).resolve().unwrap();
        let rules: Vec<String> = expected_rules(&config)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(rules, vec!["2222/tcp", "80/tcp", "443/tcp"]);
    }

    #[test]
    fn expected_rules_report_bad_entry() {
        let env = HashMap::from([("VPSUP_ALLOWED_PORTS".to_string(), "80,web".to_string())]);
        let config = ConfigResolver::new().with_env(env).resolve().unwrap();
        assert_eq!(expected_rules(&config).unwrap_err(), "web");
    }

    #[test]
    fn plan_resets_then_enables() {
        let commands = plan_commands(&[FirewallRule::ssh(22)]);
        assert_eq!(commands.first().unwrap(), &vec!["--force", "reset"]);
        assert!(commands.contains(&vec!["allow".to_string(), "22/tcp".to_string()]));
        assert_eq!(commands.last().unwrap(), &vec!["--force", "enable"]);
    }
}
