//! The immutable, fully resolved configuration for one run.

use serde::Serialize;
use std::collections::BTreeMap;

use super::env_layer::ConfigSource;
use super::options::{OptionKey, OptionValue};

/// A resolved option value and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedOption {
    pub value: OptionValue,
    pub source: ConfigSource,
}

/// Fully resolved configuration, total over [`OptionKey`].
///
/// Built once by [`ConfigResolver`](super::ConfigResolver) and only read
/// afterwards; there are no mutating methods.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSnapshot {
    values: BTreeMap<OptionKey, ResolvedOption>,
}

impl ConfigSnapshot {
    pub(crate) fn from_values(values: BTreeMap<OptionKey, ResolvedOption>) -> Self {
        Self { values }
    }

    /// Snapshot of built-in defaults only.
    pub fn defaults() -> Self {
        let values = OptionKey::all()
            .map(|key| {
                let spec = key.spec();
                let value = OptionValue::parse(spec.kind, spec.default)
                    .unwrap_or_else(|| OptionValue::Str(spec.default.to_string()));
                (
                    key,
                    ResolvedOption {
                        value,
                        source: ConfigSource::Default,
                    },
                )
            })
            .collect();
        Self { values }
    }

    /// Resolved entry for an option.
    pub fn get(&self, key: OptionKey) -> Option<&ResolvedOption> {
        self.values.get(&key)
    }

    /// All entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&OptionKey, &ResolvedOption)> {
        self.values.iter()
    }

    /// Boolean option value (`false` if the option is not boolean).
    pub fn bool(&self, key: OptionKey) -> bool {
        matches!(
            self.get(key).map(|o| &o.value),
            Some(OptionValue::Bool(true))
        )
    }

    /// String option value (empty if the option is not a string).
    pub fn string(&self, key: OptionKey) -> &str {
        match self.get(key).map(|o| &o.value) {
            Some(OptionValue::Str(s)) => s,
            _ => "",
        }
    }

    /// Integer option value (`0` if the option is not an integer).
    pub fn int(&self, key: OptionKey) -> u64 {
        match self.get(key).map(|o| &o.value) {
            Some(OptionValue::Int(n)) => *n,
            _ => 0,
        }
    }

    /// List option value (empty if the option is not a list).
    pub fn list(&self, key: OptionKey) -> &[String] {
        match self.get(key).map(|o| &o.value) {
            Some(OptionValue::List(items)) => items,
            _ => &[],
        }
    }

    /// Login user to create and configure.
    pub fn username(&self) -> &str {
        self.string(OptionKey::Username)
    }

    /// SSH port.
    pub fn ssh_port(&self) -> u64 {
        self.int(OptionKey::SshPort)
    }

    /// Home directory of the target user.
    ///
    /// Steps probe the account directory when the user exists; this is the
    /// conventional location used for a user the run is about to create.
    pub fn default_home(&self) -> std::path::PathBuf {
        std::path::PathBuf::from("/home").join(self.username())
    }

    /// Render the value for display, masking secrets.
    pub fn display_value(&self, key: OptionKey) -> String {
        let Some(resolved) = self.get(key) else {
            return String::new();
        };
        let raw = resolved.value.display_value();
        if key.spec().secret && !raw.is_empty() {
            "********".to_string()
        } else {
            raw
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_total() {
        let snapshot = ConfigSnapshot::defaults();
        for key in OptionKey::all() {
            assert!(snapshot.get(key).is_some(), "{} missing", key);
        }
    }

    #[test]
    fn typed_accessors_read_defaults() {
        let snapshot = ConfigSnapshot::defaults();
        assert_eq!(snapshot.username(), "dev");
        assert_eq!(snapshot.ssh_port(), 22);
        assert!(snapshot.bool(OptionKey::InstallDocker));
        assert!(!snapshot.bool(OptionKey::HardenSsh));
        assert!(snapshot
            .list(OptionKey::BasePackages)
            .contains(&"tmux".to_string()));
        assert!(snapshot.list(OptionKey::AllowedPorts).is_empty());
    }

    #[test]
    fn mismatched_accessor_returns_neutral_value() {
        let snapshot = ConfigSnapshot::defaults();
        assert_eq!(snapshot.int(OptionKey::Username), 0);
        assert_eq!(snapshot.string(OptionKey::SshPort), "");
        assert!(!snapshot.bool(OptionKey::Username));
    }

    #[test]
    fn default_home_uses_username() {
        let snapshot = ConfigSnapshot::defaults();
        assert_eq!(
            snapshot.default_home(),
            std::path::PathBuf::from("/home/dev")
        );
    }

    #[test]
    fn empty_secret_is_not_masked() {
        let snapshot = ConfigSnapshot::defaults();
        assert_eq!(snapshot.display_value(OptionKey::UserPassword), "");
    }
}
