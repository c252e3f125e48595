//! PHP `memory_limit` query
//!
//! Invokes the PHP binary to read its configured memory ceiling. Used by
//! the CLI layer as a fallback sizing source when no worker processes are
//! running; any failure simply yields `None`.

use std::process::Command;
use tracing::debug;

/// Query the PHP binary for `memory_limit`, in MB. `Some(-1)` means
/// unlimited; `None` means the value could not be determined.
pub fn memory_limit_mb() -> Option<i64> {
    let output = Command::new("php")
        .args(["-r", "echo ini_get('memory_limit');"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    let limit = parse_memory_limit(raw.trim());
    debug!(raw = %raw.trim(), ?limit, "queried php memory_limit");
    limit
}

/// Parse a php.ini memory size string into MB. Accepts `-1` (unlimited),
/// `G`/`M`/`K` suffixes (case-insensitive) and bare numbers, which are
/// treated as MB.
pub fn parse_memory_limit(limit: &str) -> Option<i64> {
    let limit = limit.trim().to_uppercase();

    if limit == "-1" {
        return Some(-1);
    }

    if let Some(value) = limit.strip_suffix('G') {
        return value.parse::<i64>().ok().map(|v| v * 1024);
    }
    if let Some(value) = limit.strip_suffix('M') {
        return value.parse::<i64>().ok();
    }
    if let Some(value) = limit.strip_suffix('K') {
        return value.parse::<i64>().ok().map(|v| v / 1024);
    }

    limit.parse::<i64>().ok()
}
