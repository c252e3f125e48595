//! Host system snapshot
//!
//! Reads logical CPU count and memory totals once per invocation.
//! Byte values from the OS are converted to whole megabytes with
//! truncating division.

use serde::{Deserialize, Serialize};
use sysinfo::System;
use tracing::debug;

use crate::error::{Result, TunerError};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Immutable snapshot of host resources, produced once per invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemMetrics {
    /// OS identifier (e.g. "linux", "macos")
    pub platform: String,
    /// Number of logical processors visible to the process
    pub cpu_cores: usize,
    /// Total physical memory in MB
    pub total_memory_mb: u64,
    /// Memory currently available in MB
    pub available_memory_mb: u64,
    /// Memory currently in use in MB
    pub used_memory_mb: u64,
}

impl SystemMetrics {
    /// Probe the host. Fails when the platform is unsupported or the
    /// memory accounting source is unreadable; no retries.
    pub fn collect() -> Result<Self> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(TunerError::UnsupportedPlatform(
                std::env::consts::OS.to_string(),
            ));
        }

        let mut sys = System::new();
        sys.refresh_memory();

        let total = sys.total_memory();
        if total == 0 {
            return Err(TunerError::Probe(
                "memory accounting reported zero total memory".to_string(),
            ));
        }

        let available = sys.available_memory();
        let metrics = SystemMetrics {
            platform: std::env::consts::OS.to_string(),
            cpu_cores: num_cpus::get(),
            total_memory_mb: total / BYTES_PER_MB,
            available_memory_mb: available / BYTES_PER_MB,
            used_memory_mb: total.saturating_sub(available) / BYTES_PER_MB,
        };

        debug!(
            cores = metrics.cpu_cores,
            total_mb = metrics.total_memory_mb,
            available_mb = metrics.available_memory_mb,
            "collected system metrics"
        );

        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect() {
        let metrics = SystemMetrics::collect().unwrap();
        assert!(metrics.cpu_cores >= 1);
        assert!(metrics.total_memory_mb > 0);
        assert!(metrics.used_memory_mb <= metrics.total_memory_mb);
    }
}
