//! Keyed text blocks in shell profiles.
//!
//! A block is delimited by marker comments:
//!
//! ```text
//! # >>> vpsup:tmux >>>
//! ...
//! # <<< vpsup:tmux <<<
//! ```
//!
//! The opening marker is the sentinel. If it is present the file is left
//! untouched, so reapplying a block is a no-op.

/// A marker-delimited block of shell text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileBlock {
    /// Unique key used in the markers.
    pub key: String,
    /// Block body, without markers.
    pub body: String,
}

impl ProfileBlock {
    /// Create a block.
    pub fn new(key: &str, body: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            body: body.into(),
        }
    }

    /// Opening marker line.
    pub fn open_marker(&self) -> String {
        format!("# >>> vpsup:{} >>>", self.key)
    }

    /// Closing marker line.
    pub fn close_marker(&self) -> String {
        format!("# <<< vpsup:{} <<<", self.key)
    }

    /// Whether `content` already contains this block's opening marker.
    pub fn is_present_in(&self, content: &str) -> bool {
        let marker = self.open_marker();
        content.lines().any(|line| line.trim_end() == marker)
    }

    /// Full block text including markers and a trailing newline.
    pub fn render(&self) -> String {
        format!(
            "{}\n{}\n{}\n",
            self.open_marker(),
            self.body.trim_end_matches('\n'),
            self.close_marker()
        )
    }
}

/// Append `block` to `content` unless it is already present.
///
/// Returns `None` when nothing changes.
pub fn upsert_block(content: &str, block: &ProfileBlock) -> Option<String> {
    if block.is_present_in(content) {
        return None;
    }

    let mut updated = content.to_string();
    if !updated.is_empty() {
        if !updated.ends_with('\n') {
            updated.push('\n');
        }
        updated.push('\n');
    }
    updated.push_str(&block.render());
    Some(updated)
}
