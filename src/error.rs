//! Error types for php-tuner
//!
//! All failures surface as one-line messages on stderr and a non-zero exit;
//! no operation is ever retried.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for php-tuner operations
#[derive(Error, Debug)]
pub enum TunerError {
    /// The host platform is not supported by the probes
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// A required OS metric source could not be read
    #[error("Failed to probe system resources: {0}")]
    Probe(String),

    /// No pool configuration file exists at any known location
    #[error(
        "could not auto-detect a pool configuration file (searched: {}); use --config to specify the path",
        .candidates.join(", ")
    )]
    ConfigNotFound {
        /// Every candidate path that was checked
        candidates: Vec<String>,
    },

    /// The user-supplied config path is unusable
    #[error("Invalid config path '{path}': {reason}")]
    InvalidConfigPath {
        /// The rejected path
        path: PathBuf,
        /// Why the path was rejected
        reason: String,
    },

    /// Reading the existing config file failed
    #[error("Failed to read config file '{path}': {source}")]
    ConfigRead {
        /// The config file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Writing the pre-change backup failed; the original is left untouched
    #[error("Failed to create backup at '{path}': {source}")]
    BackupWrite {
        /// The backup path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Writing the patched config failed
    #[error("Failed to write config file '{path}': {source}")]
    ConfigWrite {
        /// The config file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The config was written but the service restart failed; no rollback
    #[error("configuration applied but failed to restart service '{service}': {message}")]
    RestartFailed {
        /// The service that failed to restart
        service: String,
        /// Restart command failure detail
        message: String,
    },
}

/// Result type alias for php-tuner operations
pub type Result<T> = std::result::Result<T, TunerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_not_found_lists_candidates() {
        let err = TunerError::ConfigNotFound {
            candidates: vec!["/etc/a.conf".to_string(), "/etc/b.conf".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("/etc/a.conf"));
        assert!(msg.contains("/etc/b.conf"));
        assert!(msg.contains("--config"));
    }

    #[test]
    fn test_restart_failed_mentions_applied_config() {
        let err = TunerError::RestartFailed {
            service: "php8.3-fpm".to_string(),
            message: "exit status 1".to_string(),
        };
        assert!(err.to_string().contains("configuration applied"));
        assert!(err.to_string().contains("php8.3-fpm"));
    }
}
