//! Pure pool-config patching
//!
//! Rewrites `pm.*` lines in an existing PHP-FPM pool file without
//! disturbing anything else: unrelated lines, comments and blank lines
//! pass through untouched. Commented-out settings count as match
//! candidates, so a `;pm.max_children = 5` line is uncommented in place
//! rather than duplicated at the end of the file.

use crate::calculator::PreforkConfig;
use crate::config::PoolType;

/// Result of patching a config file's contents.
#[derive(Debug, Clone)]
pub struct PatchOutcome {
    /// The rewritten file contents
    pub updated: String,
    /// Human-readable change log, one entry per modified or added key
    pub changes: Vec<String>,
}

/// Rewrite `content` so every relevant `pm.*` setting reflects `cfg`.
///
/// Settings are applied in the order the config block is printed in.
/// For each key, the first line that defines it (commented out or not)
/// is rewritten to `key = value`; keys with no existing line are
/// inserted after the first `[section]` header, or appended at the end
/// of the file when there is none. Applying the same config twice
/// yields no changes.
pub fn patch(content: &str, cfg: &PreforkConfig) -> PatchOutcome {
    let mut lines: Vec<String> = content.split('\n').map(str::to_string).collect();
    let mut changes = Vec::new();
    // Advances past each inserted line so added keys keep the same
    // order as the change log
    let mut insert_at: Option<usize> = None;

    for (key, value) in setting_values(cfg) {
        let mut found = false;

        for line in lines.iter_mut() {
            if !line_defines_key(line, key) {
                continue;
            }
            let replacement = format!("{} = {}", key, value);
            if *line != replacement {
                changes.push(format!("{}: {} -> {}", key, describe_value(line), value));
                *line = replacement;
            }
            found = true;
            break;
        }

        if !found {
            let pos = insert_at.unwrap_or_else(|| initial_insert_pos(&lines));
            lines.insert(pos, format!("{} = {}", key, value));
            insert_at = Some(pos + 1);
            changes.push(format!("{}: (added) {}", key, value));
        }
    }

    PatchOutcome {
        updated: lines.join("\n"),
        changes,
    }
}

/// Relevant settings, ordered the way the config block prints them.
fn setting_values(cfg: &PreforkConfig) -> Vec<(&'static str, String)> {
    let all = [
        ("pm", cfg.pool_type.to_string()),
        ("pm.max_children", cfg.max_workers.to_string()),
        ("pm.process_idle_timeout", cfg.idle_timeout.clone()),
        ("pm.start_servers", cfg.start_workers.to_string()),
        ("pm.min_spare_servers", cfg.min_spare_workers.to_string()),
        ("pm.max_spare_servers", cfg.max_spare_workers.to_string()),
        ("pm.max_requests", cfg.max_requests_per_worker.to_string()),
    ];
    all.into_iter()
        .filter(|(key, _)| is_setting_relevant(key, cfg.pool_type))
        .collect()
}

/// Whether a key applies under the given pool type. Irrelevant keys are
/// neither rewritten nor inserted, and existing lines for them are left
/// alone.
fn is_setting_relevant(key: &str, pool_type: PoolType) -> bool {
    match key {
        "pm" | "pm.max_children" | "pm.max_requests" => true,
        "pm.process_idle_timeout" => {
            matches!(pool_type, PoolType::Dynamic | PoolType::OnDemand)
        }
        "pm.start_servers" | "pm.min_spare_servers" | "pm.max_spare_servers" => {
            pool_type == PoolType::Dynamic
        }
        _ => false,
    }
}

/// True when the line assigns `key`, allowing leading whitespace and a
/// single comment marker. `pm` must not match `pm.max_children`.
fn line_defines_key(line: &str, key: &str) -> bool {
    let trimmed = line.trim();
    let rest = trimmed.strip_prefix(';').map(str::trim_start).unwrap_or(trimmed);
    match rest.strip_prefix(key) {
        Some(after) => after.trim_start().starts_with('='),
        None => false,
    }
}

/// The previous value for the change log.
fn describe_value(line: &str) -> String {
    if line.trim_start().starts_with(';') {
        return "(commented out)".to_string();
    }
    match line.split_once('=') {
        Some((_, value)) => value.trim().to_string(),
        None => "(unknown)".to_string(),
    }
}

/// Where the first added key goes: after the first `[section]` header,
/// else at the end of the file (before a trailing newline's empty
/// segment, so the file still ends with a newline).
fn initial_insert_pos(lines: &[String]) -> usize {
    if let Some(pos) = lines.iter().position(|line| is_section_header(line)) {
        return pos + 1;
    }
    if lines.last().is_some_and(|l| l.is_empty()) {
        lines.len() - 1
    } else {
        lines.len()
    }
}

fn is_section_header(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 2 && trimmed.starts_with('[') && trimmed.ends_with(']')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dynamic_cfg() -> PreforkConfig {
        PreforkConfig {
            pool_type: PoolType::Dynamic,
            max_workers: 46,
            start_workers: 16,
            min_spare_workers: 8,
            max_spare_workers: 16,
            max_requests_per_worker: 500,
            idle_timeout: "10s".to_string(),
            reserved_memory_mb: 1126,
            available_memory_mb: 2970,
            process_memory_mb: 64.0,
            warnings: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    #[test]
    fn test_rewrites_existing_settings_in_place() {
        let input = "[www]\nuser = www-data\npm = static\npm.max_children = 10\n";
        let out = patch(input, &dynamic_cfg());

        assert!(out.updated.contains("pm = dynamic"));
        assert!(out.updated.contains("pm.max_children = 46"));
        assert!(out.updated.contains("user = www-data"));
        assert!(out.changes.contains(&"pm: static -> dynamic".to_string()));
        assert!(out.changes.contains(&"pm.max_children: 10 -> 46".to_string()));
    }

    #[test]
    fn test_commented_setting_is_uncommented_not_duplicated() {
        let input = "[www]\n;pm.max_requests = 200\npm = dynamic\n";
        let out = patch(input, &dynamic_cfg());

        assert_eq!(out.updated.matches("pm.max_requests").count(), 1);
        assert!(out.updated.contains("pm.max_requests = 500"));
        assert!(out
            .changes
            .contains(&"pm.max_requests: (commented out) -> 500".to_string()));
    }

    #[test]
    fn test_missing_settings_inserted_after_section_header() {
        let input = "[www]\nuser = www-data\n";
        let out = patch(input, &dynamic_cfg());

        let lines: Vec<&str> = out.updated.split('\n').collect();
        assert_eq!(lines[0], "[www]");
        // All seven dynamic-pool settings land under the header, in the
        // same order as the change log
        assert_eq!(
            &lines[1..8],
            &[
                "pm = dynamic",
                "pm.max_children = 46",
                "pm.process_idle_timeout = 10s",
                "pm.start_servers = 16",
                "pm.min_spare_servers = 8",
                "pm.max_spare_servers = 16",
                "pm.max_requests = 500",
            ]
        );
        assert!(out.changes.iter().all(|c| c.contains("(added)")));
        assert_eq!(out.changes.len(), 7);
        for (line, change) in lines[1..8].iter().zip(&out.changes) {
            assert!(change.starts_with(line.split(" = ").next().unwrap()));
        }
    }

    #[test]
    fn test_append_at_eof_without_section_header() {
        let input = "user = www-data\n";
        let out = patch(input, &dynamic_cfg());

        assert_eq!(
            out.updated,
            "user = www-data\n\
             pm = dynamic\n\
             pm.max_children = 46\n\
             pm.process_idle_timeout = 10s\n\
             pm.start_servers = 16\n\
             pm.min_spare_servers = 8\n\
             pm.max_spare_servers = 16\n\
             pm.max_requests = 500\n"
        );
    }

    #[test]
    fn test_idempotent() {
        let input = "[www]\npm = ondemand\n";
        let first = patch(input, &dynamic_cfg());
        assert!(!first.changes.is_empty());

        let second = patch(&first.updated, &dynamic_cfg());
        assert!(second.changes.is_empty());
        assert_eq!(second.updated, first.updated);
    }

    #[test]
    fn test_static_pool_skips_spare_and_idle_settings() {
        let mut cfg = dynamic_cfg();
        cfg.pool_type = PoolType::Static;
        let input = "[www]\npm.min_spare_servers = 3\n";
        let out = patch(input, &cfg);

        // Existing spare-server line is left untouched, not rewritten
        assert!(out.updated.contains("pm.min_spare_servers = 3"));
        assert!(!out.updated.contains("pm.process_idle_timeout"));
        assert!(!out.updated.contains("pm.start_servers"));
        assert!(out.updated.contains("pm = static"));
    }

    #[test]
    fn test_ondemand_gets_idle_timeout_but_no_spares() {
        let mut cfg = dynamic_cfg();
        cfg.pool_type = PoolType::OnDemand;
        cfg.idle_timeout = "5s".to_string();
        let out = patch("[www]\n", &cfg);

        assert!(out.updated.contains("pm.process_idle_timeout = 5s"));
        assert!(!out.updated.contains("pm.start_servers"));
        assert!(!out.updated.contains("pm.max_spare_servers"));
    }

    #[test]
    fn test_pm_key_does_not_match_dotted_keys() {
        assert!(line_defines_key("pm = dynamic", "pm"));
        assert!(line_defines_key(";pm=dynamic", "pm"));
        assert!(line_defines_key("  ; pm.max_children = 4", "pm.max_children"));
        assert!(!line_defines_key("pm.max_children = 4", "pm"));
        assert!(!line_defines_key("pmx = 1", "pm"));
        assert!(!line_defines_key("; just a comment about pm", "pm"));
    }

    #[test]
    fn test_unrelated_lines_preserved_verbatim() {
        let input = "[www]\n; keep this comment\n\nlisten = /run/php.sock\npm = dynamic\n";
        let out = patch(input, &dynamic_cfg());

        assert!(out.updated.contains("; keep this comment"));
        assert!(out.updated.contains("\n\n"));
        assert!(out.updated.contains("listen = /run/php.sock"));
    }
}
