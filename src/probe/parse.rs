//! Parsers for inspection command output.

use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use super::PasswordStatus;

/// Parse the output of `passwd -S <user>`.
///
/// The second field is the status code. Codes other than the known ones
/// are returned as `Err` with the code, never guessed.
pub fn parse_passwd_status(output: &str) -> Result<PasswordStatus, String> {
    let code = output.split_whitespace().nth(1).unwrap_or("");
    match code {
        "P" | "PS" => Ok(PasswordStatus::Set),
        "NP" => Ok(PasswordStatus::NoPassword),
        "L" | "LK" => Ok(PasswordStatus::Locked),
        other => Err(other.to_string()),
    }
}

static NODE_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"v?(\d+)\.\d+\.\d+").expect("NODE_VERSION must compile"));

/// Extract the major version from `node --version` output (`v22.11.0`).
pub fn parse_node_major(output: &str) -> Option<u64> {
    NODE_VERSION
        .captures(output.trim())?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

#[derive(Debug, Deserialize)]
struct NpmTree {
    #[serde(default)]
    dependencies: BTreeMap<String, serde_json::Value>,
}

/// Package names from `npm ls -g --depth=0 --json`.
///
/// Returns `None` when the output is not npm's JSON tree.
pub fn parse_npm_global_packages(output: &str) -> Option<Vec<String>> {
    let tree: NpmTree = serde_json::from_str(output).ok()?;
    Some(tree.dependencies.into_keys().collect())
}

/// Package name of an install spec (`pkg@1.2` is `pkg`).
pub fn npm_spec_name(spec: &str) -> &str {
    // "@scope/pkg@1.0" keeps its leading '@'
    match spec.char_indices().skip(1).find(|(_, c)| *c == '@') {
        Some((index, _)) => &spec[..index],
        None => spec,
    }
}

#[derive(Debug, Deserialize)]
struct TailscaleStatus {
    #[serde(rename = "BackendState", default)]
    backend_state: String,
}

/// Whether `tailscale status --json` reports a running backend.
pub fn parse_tailscale_running(output: &str) -> Option<bool> {
    let status: TailscaleStatus = serde_json::from_str(output).ok()?;
    Some(status.backend_state == "Running")
}

/// Parse a `getent passwd` line into the home directory.
pub fn parse_passwd_home(line: &str) -> Option<String> {
    let home = line.trim().split(':').nth(5)?;
    (!home.is_empty()).then(|| home.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passwd_status_codes() {
        assert_eq!(
            parse_passwd_status("dev P 03/14/2026 0 99999 7 -1"),
            Ok(PasswordStatus::Set)
        );
        assert_eq!(
            parse_passwd_status("dev NP 03/14/2026 0 99999 7 -1"),
            Ok(PasswordStatus::NoPassword)
        );
        assert_eq!(
            parse_passwd_status("dev L 03/14/2026 0 99999 7 -1\n"),
            Ok(PasswordStatus::Locked)
        );
    }

    #[test]
    fn passwd_unknown_code_is_error() {
        assert_eq!(parse_passwd_status("dev X 0 0"), Err("X".to_string()));
        assert_eq!(parse_passwd_status(""), Err(String::new()));
    }

    #[test]
    fn node_major_from_version() {
        assert_eq!(parse_node_major("v22.11.0\n"), Some(22));
        assert_eq!(parse_node_major("18.20.4"), Some(18));
        assert_eq!(parse_node_major("command not found"), None);
    }

    #[test]
    fn npm_tree_lists_top_level_names() {
        let json = r#"{
            "name": "lib",
            "dependencies": {
                "@anthropic-ai/claude-code": { "version": "1.0.0" },
                "npm": { "version": "10.9.0" }
            }
        }"#;
        assert_eq!(
            parse_npm_global_packages(json).unwrap(),
            vec!["@anthropic-ai/claude-code", "npm"]
        );
    }

    #[test]
    fn npm_tree_without_dependencies_is_empty() {
        assert_eq!(parse_npm_global_packages("{}").unwrap(), Vec::<String>::new());
        assert!(parse_npm_global_packages("npm ERR!").is_none());
    }

    #[test]
    fn npm_spec_strips_version() {
        assert_eq!(npm_spec_name("typescript@5.6"), "typescript");
        assert_eq!(npm_spec_name("@openai/codex@latest"), "@openai/codex");
        assert_eq!(npm_spec_name("@google/gemini-cli"), "@google/gemini-cli");
    }

    #[test]
    fn tailscale_backend_state() {
        assert_eq!(
            parse_tailscale_running(r#"{"BackendState":"Running","Self":{}}"#),
            Some(true)
        );
        assert_eq!(
            parse_tailscale_running(r#"{"BackendState":"NeedsLogin"}"#),
            Some(false)
        );
        assert_eq!(parse_tailscale_running("not json"), None);
    }

    #[test]
    fn passwd_home_field() {
        assert_eq!(
            parse_passwd_home("dev:x:1000:1000:,,,:/home/dev:/bin/bash"),
            Some("/home/dev".to_string())
        );
        assert_eq!(parse_passwd_home("broken"), None);
    }
}
