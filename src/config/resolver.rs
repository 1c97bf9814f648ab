//! Builds the [`ConfigSnapshot`] from defaults, an override file and the
//! environment.
//!
//! Precedence: environment variable > override file > built-in default.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::env_layer::{ConfigLayer, ConfigSource, LayerStack};
use super::loader::{discover_override_file, load_override_file};
use super::options::{OptionKey, OptionValue, ENV_PREFIX};
use super::snapshot::{ConfigSnapshot, ResolvedOption};

/// Resolves the configuration for one run.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use vpsup::config::{ConfigResolver, OptionKey};
///
/// let env = HashMap::from([("VPSUP_USERNAME".to_string(), "alice".to_string())]);
/// let snapshot = ConfigResolver::new().with_env(env).resolve().unwrap();
///
/// assert_eq!(snapshot.username(), "alice");
/// assert!(snapshot.bool(OptionKey::InstallDocker));
/// ```
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    override_file: Option<PathBuf>,
    env: HashMap<String, String>,
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigResolver {
    /// Resolver with no override file and an empty environment.
    pub fn new() -> Self {
        Self {
            override_file: None,
            env: HashMap::new(),
        }
    }

    /// Resolver for the CLI: the explicit `--config` path if given, else the
    /// first discovered override file, plus the process environment.
    pub fn for_process(explicit: Option<&Path>, cwd: &Path) -> Self {
        let override_file = explicit
            .map(Path::to_path_buf)
            .or_else(|| discover_override_file(cwd));

        Self {
            override_file,
            env: std::env::vars().collect(),
        }
    }

    /// Use the given override file. It must exist when resolving.
    pub fn with_override_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_file = Some(path.into());
        self
    }

    /// Use the given environment instead of the process environment.
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// The override file that will be read, if any.
    pub fn override_file(&self) -> Option<&Path> {
        self.override_file.as_deref()
    }

    /// Resolve into an immutable snapshot.
    ///
    /// # Errors
    ///
    /// Fails if the override file is unreadable or malformed, names an
    /// unknown option, or any value does not parse as its option's type.
    pub fn resolve(&self) -> Result<ConfigSnapshot, ConfigError> {
        let mut stack = LayerStack::new();
        stack.push(ConfigLayer::defaults());

        if let Some(path) = &self.override_file {
            stack.push(self.file_layer(path)?);
        }

        stack.push(self.env_layer());

        let mut values = BTreeMap::new();
        for key in OptionKey::all() {
            let spec = key.spec();
            let (raw, source) = match stack.get(key) {
                Some((raw, source)) => (raw.to_string(), source.clone()),
                None => (spec.default.to_string(), ConfigSource::Default),
            };

            let value =
                OptionValue::parse(spec.kind, &raw).ok_or_else(|| ConfigError::InvalidValue {
                    key: spec.name.to_string(),
                    value: raw.clone(),
                    origin: source.to_string(),
                    expected: spec.kind.expected(),
                })?;

            if source != ConfigSource::Default {
                tracing::debug!("{} resolved from {}", spec.name, source);
            }

            values.insert(key, ResolvedOption { value, source });
        }

        Ok(ConfigSnapshot::from_values(values))
    }

    fn file_layer(&self, path: &Path) -> Result<ConfigLayer, ConfigError> {
        tracing::debug!("Loading override file {}", path.display());
        let raw = load_override_file(path)?;
        let source = ConfigSource::File(path.to_path_buf());
        let mut layer = ConfigLayer::new(source.clone());

        for (name, value) in raw {
            let key = OptionKey::from_name(&name).ok_or_else(|| ConfigError::UnknownOption {
                key: name.clone(),
                origin: source.to_string(),
            })?;
            layer.set(key, value);
        }

        Ok(layer)
    }

    fn env_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::new(ConfigSource::Env("environment".to_string()));

        for (var, value) in &self.env {
            let Some(name) = var.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match OptionKey::from_name(name) {
                Some(key) => layer.set_from(key, value.clone(), ConfigSource::Env(var.clone())),
                None => tracing::debug!("Ignoring unrecognized variable {}", var),
            }
        }

        layer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn write_override(content: &str) -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("vpsup.conf");
        fs::write(&path, content).unwrap();
        (temp, path)
    }

    #[test]
    fn defaults_apply_without_sources() {
        let snapshot = ConfigResolver::new().resolve().unwrap();
        assert_eq!(snapshot.username(), "dev");
        assert_eq!(
            snapshot.get(OptionKey::Username).unwrap().source,
            ConfigSource::Default
        );
    }

    #[test]
    fn file_overrides_default() {
        let (_temp, path) = write_override("USERNAME=alice\n");
        let snapshot = ConfigResolver::new()
            .with_override_file(&path)
            .resolve()
            .unwrap();

        assert_eq!(snapshot.username(), "alice");
        assert_eq!(
            snapshot.get(OptionKey::Username).unwrap().source,
            ConfigSource::File(path)
        );
    }

    #[test]
    fn env_overrides_file_and_default() {
        let (_temp, path) = write_override("USERNAME=alice\nSSH_PORT=2200\n");
        let snapshot = ConfigResolver::new()
            .with_override_file(&path)
            .with_env(env(&[("VPSUP_USERNAME", "bob")]))
            .resolve()
            .unwrap();

        assert_eq!(snapshot.username(), "bob");
        assert_eq!(
            snapshot.get(OptionKey::Username).unwrap().source,
            ConfigSource::Env("VPSUP_USERNAME".into())
        );
        assert_eq!(snapshot.ssh_port(), 2200);
    }

    #[test]
    fn env_overrides_default_without_file() {
        let snapshot = ConfigResolver::new()
            .with_env(env(&[("VPSUP_HARDEN_SSH", "yes")]))
            .resolve()
            .unwrap();
        assert!(snapshot.bool(OptionKey::HardenSsh));
    }

    #[test]
    fn unprefixed_env_vars_are_ignored() {
        let snapshot = ConfigResolver::new()
            .with_env(env(&[("USERNAME", "root"), ("VPSUP_UNKNOWN", "x")]))
            .resolve()
            .unwrap();
        assert_eq!(snapshot.username(), "dev");
    }

    #[test]
    fn missing_explicit_file_is_config_error() {
        let temp = TempDir::new().unwrap();
        let err = ConfigResolver::new()
            .with_override_file(temp.path().join("absent.conf"))
            .resolve()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Unreadable { .. }));
    }

    #[test]
    fn unknown_file_key_is_config_error() {
        let (_temp, path) = write_override("INSTALL_EVERYTHING=yes\n");
        let err = ConfigResolver::new()
            .with_override_file(&path)
            .resolve()
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownOption { .. }));
    }

    #[test]
    fn invalid_env_value_is_config_error() {
        let err = ConfigResolver::new()
            .with_env(env(&[("VPSUP_SSH_PORT", "twenty-two")]))
            .resolve()
            .unwrap_err();
        match err {
            ConfigError::InvalidValue { key, origin, .. } => {
                assert_eq!(key, "SSH_PORT");
                assert_eq!(origin, "env VPSUP_SSH_PORT");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn out_of_range_ssh_port_is_config_error() {
        for raw in ["0", "70000"] {
            let err = ConfigResolver::new()
                .with_env(env(&[("VPSUP_SSH_PORT", raw)]))
                .resolve()
                .unwrap_err();
            match err {
                ConfigError::InvalidValue {
                    key,
                    value,
                    expected,
                    ..
                } => {
                    assert_eq!(key, "SSH_PORT");
                    assert_eq!(value, raw);
                    assert!(expected.contains("65535"));
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        let (_temp, path) = write_override("SSH_PORT=65536\n");
        assert!(ConfigResolver::new()
            .with_override_file(&path)
            .resolve()
            .is_err());
    }

    #[test]
    fn invalid_env_value_wins_over_valid_file_value() {
        let (_temp, path) = write_override("INSTALL_DOCKER=false\n");
        let result = ConfigResolver::new()
            .with_override_file(&path)
            .with_env(env(&[("VPSUP_INSTALL_DOCKER", "perhaps")]))
            .resolve();
        assert!(result.is_err());
    }

    #[test]
    fn prefixed_keys_in_file_are_accepted() {
        let (_temp, path) = write_override("VPSUP_INSTALL_DOCKER=false\n");
        let snapshot = ConfigResolver::new()
            .with_override_file(&path)
            .resolve()
            .unwrap();
        assert!(!snapshot.bool(OptionKey::InstallDocker));
    }

    #[test]
    fn for_process_prefers_explicit_path() {
        let temp = TempDir::new().unwrap();
        let explicit = temp.path().join("explicit.conf");
        let resolver = ConfigResolver::for_process(Some(&explicit), temp.path());
        assert_eq!(resolver.override_file(), Some(explicit.as_path()));
    }
}
