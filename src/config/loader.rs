//! Override file discovery and loading.
//!
//! An override file is optional. When `--config` names one it must exist;
//! otherwise the first existing file from the discovery list is used.

use crate::config::env_file::EnvFileParser;
use crate::error::ConfigError;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the working directory.
pub const LOCAL_CONFIG: &str = "vpsup.conf";

/// System-wide override file.
pub const SYSTEM_CONFIG: &str = "/etc/vpsup/vpsup.conf";

/// Candidate override files in priority order (first existing wins).
///
/// 1. `./vpsup.conf`
/// 2. `/etc/vpsup/vpsup.conf`
pub fn discover_override_file(cwd: &Path) -> Option<PathBuf> {
    [cwd.join(LOCAL_CONFIG), PathBuf::from(SYSTEM_CONFIG)]
        .into_iter()
        .find(|path| path.is_file())
}

/// Load an override file as raw key/value pairs.
///
/// `.yml`/`.yaml` files are parsed as a flat YAML mapping; anything else
/// as KEY=value lines.
///
/// # Errors
///
/// Returns `ConfigError::Unreadable` if the file cannot be read (including
/// when it does not exist), and `ConfigError::Malformed` if it cannot be
/// parsed.
pub fn load_override_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    if is_yaml(path) {
        parse_yaml(&content, path)
    } else {
        EnvFileParser::parse(&content).map_err(|e| ConfigError::Malformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    )
}

/// Parse a flat YAML mapping of option names to scalars or sequences.
fn parse_yaml(content: &str, path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let malformed = |message: String| ConfigError::Malformed {
        path: path.to_path_buf(),
        message,
    };

    let value: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| malformed(e.to_string()))?;

    let mapping = match value {
        serde_yaml::Value::Mapping(mapping) => mapping,
        serde_yaml::Value::Null => return Ok(HashMap::new()),
        _ => return Err(malformed("expected a mapping of option names".to_string())),
    };

    let mut vars = HashMap::new();
    for (key, value) in mapping {
        let key = match key {
            serde_yaml::Value::String(key) => key,
            other => return Err(malformed(format!("non-string key: {:?}", other))),
        };
        let raw = yaml_scalar(&value)
            .ok_or_else(|| malformed(format!("{} must be a scalar or a list", key)))?;
        vars.insert(key, raw);
    }

    Ok(vars)
}

fn yaml_scalar(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Null => Some(String::new()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Sequence(items) => items
            .iter()
            .map(yaml_scalar)
            .collect::<Option<Vec<_>>>()
            .map(|items| items.join(",")),
        _ => None,
    }
}
