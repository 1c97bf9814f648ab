//! Layered option sources.
//!
//! Each source of raw option values (built-in defaults, the override file,
//! the process environment) becomes a [`ConfigLayer`]. Layers are pushed onto
//! a [`LayerStack`] from lowest to highest priority, and lookups return the
//! value together with the layer it came from.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use super::options::{OptionKey, OPTIONS};

/// Where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "origin", rename_all = "snake_case")]
pub enum ConfigSource {
    /// Built-in default.
    Default,
    /// Override file.
    File(PathBuf),
    /// Environment variable.
    Env(String),
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File(path) => write!(f, "file {}", path.display()),
            ConfigSource::Env(var) => write!(f, "env {}", var),
        }
    }
}

/// Raw option values from a single source.
///
/// # Example
///
/// ```
/// use vpsup::config::{ConfigLayer, ConfigSource, OptionKey};
///
/// let mut layer = ConfigLayer::new(ConfigSource::Env("VPSUP_USERNAME".into()));
/// layer.set(OptionKey::Username, "alice");
///
/// assert!(layer.contains(OptionKey::Username));
/// assert_eq!(layer.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    values: HashMap<OptionKey, (String, ConfigSource)>,
    source: ConfigSource,
}

impl ConfigLayer {
    /// Create an empty layer attributed to `source`.
    pub fn new(source: ConfigSource) -> Self {
        Self {
            values: HashMap::new(),
            source,
        }
    }

    /// A layer holding every option's built-in default.
    pub fn defaults() -> Self {
        let mut layer = Self::new(ConfigSource::Default);
        for spec in OPTIONS {
            layer.set(spec.key, spec.default);
        }
        layer
    }

    /// Set a raw value attributed to the layer's own source.
    pub fn set(&mut self, key: OptionKey, value: impl Into<String>) {
        let source = self.source.clone();
        self.values.insert(key, (value.into(), source));
    }

    /// Set a raw value with a more specific source (e.g. the exact env var).
    pub fn set_from(&mut self, key: OptionKey, value: impl Into<String>, source: ConfigSource) {
        self.values.insert(key, (value.into(), source));
    }

    /// Check if this layer has a value for the option.
    pub fn contains(&self, key: OptionKey) -> bool {
        self.values.contains_key(&key)
    }

    /// Number of options set in this layer.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if this layer is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The layer's source.
    pub fn source(&self) -> &ConfigSource {
        &self.source
    }
}

/// Layers from lowest to highest priority.
///
/// # Example
///
/// ```
/// use vpsup::config::{ConfigLayer, ConfigSource, LayerStack, OptionKey};
///
/// let mut stack = LayerStack::new();
/// stack.push(ConfigLayer::defaults());
///
/// let mut env = ConfigLayer::new(ConfigSource::Env("VPSUP_SSH_PORT".into()));
/// env.set(OptionKey::SshPort, "2222");
/// stack.push(env);
///
/// assert_eq!(stack.get(OptionKey::SshPort).map(|(v, _)| v), Some("2222"));
/// assert_eq!(stack.get(OptionKey::Username).map(|(v, _)| v), Some("dev"));
/// ```
#[derive(Debug, Default)]
pub struct LayerStack {
    layers: Vec<ConfigLayer>,
}

impl LayerStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self { layers: vec![] }
    }

    /// Add a layer. Later layers have higher priority.
    pub fn push(&mut self, layer: ConfigLayer) {
        self.layers.push(layer);
    }

    /// Resolve an option to its raw value and source.
    pub fn get(&self, key: OptionKey) -> Option<(&str, &ConfigSource)> {
        self.layers
            .iter()
            .rev()
            .find_map(|layer| layer.values.get(&key))
            .map(|(value, source)| (value.as_str(), source))
    }

    /// Get the number of layers.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_layers_override_lower() {
        let mut stack = LayerStack::new();
        stack.push(ConfigLayer::defaults());

        let mut file = ConfigLayer::new(ConfigSource::File(PathBuf::from("vpsup.conf")));
        file.set(OptionKey::Username, "alice");
        stack.push(file);

        let mut env = ConfigLayer::new(ConfigSource::Env("VPSUP_USERNAME".into()));
        env.set(OptionKey::Username, "bob");
        stack.push(env);

        let (value, source) = stack.get(OptionKey::Username).unwrap();
        assert_eq!(value, "bob");
        assert_eq!(source, &ConfigSource::Env("VPSUP_USERNAME".into()));
    }

    #[test]
    fn falls_through_to_lower_layer() {
        let mut stack = LayerStack::new();
        stack.push(ConfigLayer::defaults());
        stack.push(ConfigLayer::new(ConfigSource::Env("env".into())));

        let (value, source) = stack.get(OptionKey::SshPort).unwrap();
        assert_eq!(value, "22");
        assert_eq!(source, &ConfigSource::Default);
    }

    #[test]
    fn defaults_layer_is_total() {
        let layer = ConfigLayer::defaults();
        assert_eq!(layer.len(), OPTIONS.len());
        for key in OptionKey::all() {
            assert!(layer.contains(key));
        }
    }

    #[test]
    fn set_from_keeps_specific_source() {
        let mut layer = ConfigLayer::new(ConfigSource::Env("environment".into()));
        layer.set_from(
            OptionKey::HardenSsh,
            "yes",
            ConfigSource::Env("VPSUP_HARDEN_SSH".into()),
        );

        let mut stack = LayerStack::new();
        stack.push(layer);
        let (_, source) = stack.get(OptionKey::HardenSsh).unwrap();
        assert_eq!(source.to_string(), "env VPSUP_HARDEN_SSH");
    }

    #[test]
    fn empty_stack_returns_none() {
        let stack = LayerStack::default();
        assert!(stack.get(OptionKey::Username).is_none());
        assert_eq!(stack.layer_count(), 0);
    }

    #[test]
    fn source_display() {
        assert_eq!(ConfigSource::Default.to_string(), "default");
        assert_eq!(
            ConfigSource::File(PathBuf::from("/etc/vpsup/vpsup.conf")).to_string(),
            "file /etc/vpsup/vpsup.conf"
        );
    }
}
