//! Applying calculated settings to a live PHP-FPM install
//!
//! Locates the pool config file and the running service, patches the
//! config with a backup written first, and optionally restarts the
//! service. A restart failure is reported but never rolled back: the
//! patched config stays in place so the operator can retry the restart
//! by hand.

mod patcher;

pub use patcher::{patch, PatchOutcome};

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::calculator::PreforkConfig;
use crate::error::{Result, TunerError};

/// Pool config locations checked in order, most specific first.
pub const CONFIG_PATH_CANDIDATES: &[&str] = &[
    // Debian/Ubuntu
    "/etc/php/8.3/fpm/pool.d/www.conf",
    "/etc/php/8.2/fpm/pool.d/www.conf",
    "/etc/php/8.1/fpm/pool.d/www.conf",
    "/etc/php/8.0/fpm/pool.d/www.conf",
    "/etc/php/7.4/fpm/pool.d/www.conf",
    // RHEL/CentOS/Fedora
    "/etc/php-fpm.d/www.conf",
    // Generic
    "/etc/php-fpm.conf",
    // macOS (Homebrew)
    "/opt/homebrew/etc/php/8.3/php-fpm.d/www.conf",
    "/opt/homebrew/etc/php/8.2/php-fpm.d/www.conf",
    "/usr/local/etc/php/8.3/php-fpm.d/www.conf",
    "/usr/local/etc/php/8.2/php-fpm.d/www.conf",
];

/// Service names probed when looking for the running PHP-FPM unit.
pub const SERVICE_NAME_CANDIDATES: &[&str] = &[
    "php-fpm",
    "php8.3-fpm",
    "php8.2-fpm",
    "php8.1-fpm",
    "php8.0-fpm",
    "php7.4-fpm",
];

/// Outcome of an apply operation.
#[derive(Debug, Clone)]
pub struct ApplyResult {
    /// The config file that was patched
    pub config_path: PathBuf,
    /// Where the pre-change backup was written
    pub backup_path: PathBuf,
    /// The service that was restarted, when one was
    pub service_name: Option<String>,
    /// Whether the service restart succeeded
    pub restarted: bool,
    /// Change log from the patcher
    pub changes: Vec<String>,
}

/// Return the first candidate path that exists on disk.
pub fn find_config_file(candidates: &[&str]) -> Result<PathBuf> {
    for path in candidates {
        if Path::new(path).is_file() {
            debug!(path, "found pool configuration");
            return Ok(PathBuf::from(path));
        }
    }
    Err(TunerError::ConfigNotFound {
        candidates: candidates.iter().map(|s| s.to_string()).collect(),
    })
}

/// Check that a user-supplied path is plausible as a pool config: it
/// must exist, be a regular file, and carry a `.conf` extension or none.
pub fn validate_config_path(path: &Path) -> Result<()> {
    let meta = fs::metadata(path).map_err(|_| TunerError::InvalidConfigPath {
        path: path.to_path_buf(),
        reason: "file not found".to_string(),
    })?;

    if meta.is_dir() {
        return Err(TunerError::InvalidConfigPath {
            path: path.to_path_buf(),
            reason: "path is a directory, not a file".to_string(),
        });
    }

    match path.extension() {
        None => Ok(()),
        Some(ext) if ext == "conf" => Ok(()),
        Some(_) => Err(TunerError::InvalidConfigPath {
            path: path.to_path_buf(),
            reason: "does not look like a pool config (expected .conf extension)".to_string(),
        }),
    }
}

/// Find the active PHP-FPM service, if any. Returns `None` when no
/// candidate is running or the platform has no supported service
/// manager.
pub fn find_service(candidates: &[&str]) -> Option<String> {
    match std::env::consts::OS {
        "linux" => candidates
            .iter()
            .find(|name| {
                Command::new("systemctl")
                    .args(["is-active", "--quiet", name])
                    .status()
                    .map(|s| s.success())
                    .unwrap_or(false)
            })
            .map(|s| s.to_string()),
        "macos" => {
            let output = Command::new("brew").args(["services", "list"]).output().ok()?;
            let listing = String::from_utf8_lossy(&output.stdout);
            listing
                .lines()
                .find(|line| line.contains("php") && line.contains("started"))
                .and_then(|line| line.split_whitespace().next())
                .map(|s| s.to_string())
        }
        _ => None,
    }
}

/// Patch `config_path` with the calculated settings, writing a backup
/// next to it first. When `restart` is set and a service is found, the
/// service is restarted after the write.
pub fn apply(cfg: &PreforkConfig, config_path: &Path, restart: bool) -> Result<ApplyResult> {
    let content = fs::read_to_string(config_path).map_err(|source| TunerError::ConfigRead {
        path: config_path.to_path_buf(),
        source,
    })?;

    let mut backup_path = config_path.as_os_str().to_owned();
    backup_path.push(".backup");
    let backup_path = PathBuf::from(backup_path);
    fs::write(&backup_path, &content).map_err(|source| TunerError::BackupWrite {
        path: backup_path.clone(),
        source,
    })?;

    let outcome = patch(&content, cfg);
    fs::write(config_path, &outcome.updated).map_err(|source| TunerError::ConfigWrite {
        path: config_path.to_path_buf(),
        source,
    })?;
    info!(path = %config_path.display(), changes = outcome.changes.len(), "pool configuration written");

    let mut result = ApplyResult {
        config_path: config_path.to_path_buf(),
        backup_path,
        service_name: None,
        restarted: false,
        changes: outcome.changes,
    };

    if restart {
        if let Some(service) = find_service(SERVICE_NAME_CANDIDATES) {
            restart_service(&service)?;
            result.service_name = Some(service);
            result.restarted = true;
        }
    }

    Ok(result)
}

fn restart_service(name: &str) -> Result<()> {
    let mut cmd = match std::env::consts::OS {
        "linux" => {
            let mut c = Command::new("sudo");
            c.args(["systemctl", "restart", name]);
            c
        }
        "macos" => {
            let mut c = Command::new("brew");
            c.args(["services", "restart", name]);
            c
        }
        os => {
            return Err(TunerError::RestartFailed {
                service: name.to_string(),
                message: format!("no service manager support on {}", os),
            })
        }
    };

    let status = cmd.status().map_err(|e| TunerError::RestartFailed {
        service: name.to_string(),
        message: e.to_string(),
    })?;

    if !status.success() {
        return Err(TunerError::RestartFailed {
            service: name.to_string(),
            message: format!("restart command exited with {}", status),
        });
    }
    Ok(())
}

/// Ask a yes/no question on stdout and read one line from stdin.
/// Anything other than `y` or `yes` (case-insensitive) declines.
pub fn confirm(prompt: &str) -> bool {
    print!("{} [y/N]: ", prompt);
    let _ = io::stdout().flush();

    let mut response = String::new();
    if io::stdin().lock().read_line(&mut response).is_err() {
        return false;
    }
    matches!(response.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolType;
    use std::fs;

    fn sample_cfg() -> PreforkConfig {
        PreforkConfig {
            pool_type: PoolType::Dynamic,
            max_workers: 20,
            start_workers: 8,
            min_spare_workers: 4,
            max_spare_workers: 8,
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
    fn test_find_config_file_uses_first_existing_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.conf");
        let present = dir.path().join("www.conf");
        fs::write(&present, "[www]\n").unwrap();

        let missing_s = missing.to_str().unwrap().to_string();
        let present_s = present.to_str().unwrap().to_string();
        let candidates = [missing_s.as_str(), present_s.as_str()];

        let found = find_config_file(&candidates).unwrap();
        assert_eq!(found, present);
    }

    #[test]
    fn test_find_config_file_reports_all_candidates() {
        let err = find_config_file(&["/nonexistent/a.conf", "/nonexistent/b.conf"]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("/nonexistent/a.conf"));
        assert!(msg.contains("/nonexistent/b.conf"));
    }

    #[test]
    fn test_validate_config_path() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("www.conf");
        fs::write(&conf, "[www]\n").unwrap();
        assert!(validate_config_path(&conf).is_ok());

        let bare = dir.path().join("php-fpm");
        fs::write(&bare, "[global]\n").unwrap();
        assert!(validate_config_path(&bare).is_ok());

        assert!(validate_config_path(&dir.path().join("absent.conf")).is_err());
        assert!(validate_config_path(dir.path()).is_err());

        let wrong = dir.path().join("notes.txt");
        fs::write(&wrong, "hello").unwrap();
        assert!(matches!(
            validate_config_path(&wrong),
            Err(TunerError::InvalidConfigPath { .. })
        ));
    }

    #[test]
    fn test_apply_writes_backup_and_patched_config() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("www.conf");
        let original = "[www]\npm = static\npm.max_children = 5\n";
        fs::write(&conf, original).unwrap();

        let result = apply(&sample_cfg(), &conf, false).unwrap();

        assert_eq!(result.backup_path, dir.path().join("www.conf.backup"));
        assert_eq!(fs::read_to_string(&result.backup_path).unwrap(), original);

        let patched = fs::read_to_string(&conf).unwrap();
        assert!(patched.contains("pm = dynamic"));
        assert!(patched.contains("pm.max_children = 20"));
        assert!(!result.changes.is_empty());
        assert!(result.service_name.is_none());
        assert!(!result.restarted);
    }

    #[test]
    fn test_apply_leaves_config_untouched_when_backup_fails() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("www.conf");
        let original = "[www]\npm = static\npm.max_children = 5\n";
        fs::write(&conf, original).unwrap();

        // A directory squatting on the backup path makes the backup
        // write fail before any patching happens
        fs::create_dir(dir.path().join("www.conf.backup")).unwrap();

        let err = apply(&sample_cfg(), &conf, false).unwrap_err();
        assert!(matches!(err, TunerError::BackupWrite { .. }));
        assert_eq!(fs::read_to_string(&conf).unwrap(), original);
    }

    #[test]
    fn test_apply_second_run_reports_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("www.conf");
        fs::write(&conf, "[www]\npm = static\n").unwrap();

        apply(&sample_cfg(), &conf, false).unwrap();
        let second = apply(&sample_cfg(), &conf, false).unwrap();
        assert!(second.changes.is_empty());
    }

    #[test]
    fn test_apply_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = apply(&sample_cfg(), &dir.path().join("nope.conf"), false).unwrap_err();
        assert!(matches!(err, TunerError::ConfigRead { .. }));
    }
}
