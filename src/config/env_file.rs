//! KEY=value override file parsing.
//!
//! Override files are written in the same shape as a sourced shell config:
//! one assignment per line, optional `export`, optional quotes.

use anyhow::{bail, Result};
use std::collections::HashMap;
use std::path::Path;

/// Parses KEY=value override files into a map of raw values.
///
/// # Supported Formats
///
/// - Simple: `KEY=value`
/// - Exported: `export KEY=value`
/// - Quoted: `KEY="value with spaces"` or `KEY='single quoted'`
/// - Empty: `KEY=`
/// - Comments: `# This is a comment`, and trailing ` # comment` on unquoted values
/// - Whitespace around equals: `KEY = value`
///
/// A non-blank, non-comment line without `=` is an error, not silently
/// skipped.
///
/// # Example
///
/// ```
/// use vpsup::config::EnvFileParser;
///
/// let content = r#"
/// ## Who to create
/// USERNAME=alice
/// export HARDEN_SSH="yes"
/// ALLOWED_PORTS=
/// "#;
///
/// let vars = EnvFileParser::parse(content).unwrap();
/// assert_eq!(vars.get("USERNAME"), Some(&"alice".to_string()));
/// assert_eq!(vars.get("HARDEN_SSH"), Some(&"yes".to_string()));
/// assert_eq!(vars.get("ALLOWED_PORTS"), Some(&"".to_string()));
/// ```
pub struct EnvFileParser;

impl EnvFileParser {
    /// Parse file content into a map of variables.
    pub fn parse(content: &str) -> Result<HashMap<String, String>> {
        let mut vars = HashMap::new();

        for (index, line) in content.lines().enumerate() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match Self::parse_line(line) {
                Some((key, value)) => {
                    vars.insert(key, value);
                }
                None => bail!("line {}: expected KEY=value, got '{}'", index + 1, line),
            }
        }

        Ok(vars)
    }

    /// Parse a single assignment.
    fn parse_line(line: &str) -> Option<(String, String)> {
        let line = line.strip_prefix("export ").unwrap_or(line);
        let eq_pos = line.find('=')?;
        let key = line[..eq_pos].trim();

        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return None;
        }

        let value = Self::unquote(line[eq_pos + 1..].trim());
        Some((key.to_string(), value))
    }

    /// Remove surrounding quotes, or a trailing comment from a bare value.
    fn unquote(value: &str) -> String {
        let quoted = (value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\''));

        if quoted && value.len() >= 2 {
            return value[1..value.len() - 1].to_string();
        }

        match value.find(" #") {
            Some(pos) => value[..pos].trim_end().to_string(),
            None => value.to_string(),
        }
    }

    /// Load and parse an override file from a path.
    pub fn load(path: &Path) -> Result<HashMap<String, String>> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }
}
