//! Timestamped backup naming.

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// Backup path for `original` taken at `now`.
///
/// The name is `<file>.vpsup-<YYYYmmddHHMMSS>.bak`. If `exists` reports
/// that name as taken, a numeric suffix is appended (`.bak.1`, `.bak.2`, ...)
/// so earlier backups are never overwritten.
pub fn backup_path<F>(original: &Path, now: DateTime<Local>, exists: F) -> PathBuf
where
    F: Fn(&Path) -> bool,
{
    let file_name = original
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "backup".to_string());
    let stamp = now.format("%Y%m%d%H%M%S");
    let base = original.with_file_name(format!("{}.vpsup-{}.bak", file_name, stamp));

    if !exists(&base) {
        return base;
    }

    let mut n = 1u32;
    loop {
        let candidate = PathBuf::from(format!("{}.{}", base.display(), n));
        if !exists(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
