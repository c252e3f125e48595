//! PHP worker process enumeration
//!
//! Walks the process table for PHP-FPM worker family names and aggregates
//! resident memory. Finding no workers is a valid zero-valued result, not
//! an error.

use serde::{Deserialize, Serialize};
use sysinfo::System;
use tracing::debug;

use crate::error::{Result, TunerError};

/// A single matched PHP worker process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerProcess {
    /// Process ID
    pub pid: u32,
    /// Resident memory in KB
    pub memory_kb: u64,
    /// Process name as reported by the OS
    pub name: String,
}

/// Aggregated metrics over matched PHP worker processes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessMetrics {
    /// Number of matched processes
    pub count: usize,
    /// Average resident memory per process in MB
    pub avg_memory_mb: f64,
    /// Total resident memory across all processes in MB
    pub total_memory_mb: f64,
    /// The matched processes
    pub processes: Vec<WorkerProcess>,
}

impl ProcessMetrics {
    /// Enumerate the process table and aggregate PHP worker memory.
    pub fn collect() -> Result<Self> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(TunerError::UnsupportedPlatform(
                std::env::consts::OS.to_string(),
            ));
        }

        let sys = System::new_all();

        let mut workers = Vec::new();
        for (pid, process) in sys.processes() {
            let name = process.name().to_string_lossy().to_string();
            if !is_php_worker(&name) {
                continue;
            }
            let memory_kb = process.memory() / 1024;
            if memory_kb == 0 {
                continue;
            }
            workers.push(WorkerProcess {
                pid: pid.as_u32(),
                memory_kb,
                name,
            });
        }

        let metrics = Self::from_processes(workers);
        debug!(
            count = metrics.count,
            avg_mb = metrics.avg_memory_mb,
            "enumerated PHP worker processes"
        );
        Ok(metrics)
    }

    /// Aggregate count/average/total from an explicit process list.
    pub fn from_processes(processes: Vec<WorkerProcess>) -> Self {
        let total_memory_mb: f64 = processes
            .iter()
            .map(|p| p.memory_kb as f64 / 1024.0)
            .sum();
        let count = processes.len();
        let avg_memory_mb = if count > 0 {
            total_memory_mb / count as f64
        } else {
            0.0
        };

        ProcessMetrics {
            count,
            avg_memory_mb,
            total_memory_mb,
            processes,
        }
    }
}

/// Matches the PHP worker binary name family: `php-fpm` (any suffix)
/// and versioned forms like `php8.3-fpm`.
fn is_php_worker(name: &str) -> bool {
    if name.contains("php-fpm") {
        return true;
    }
    name.match_indices("php").any(|(i, _)| {
        name[i + 3..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_name_matching() {
        assert!(is_php_worker("php-fpm"));
        assert!(is_php_worker("php-fpm: pool www"));
        assert!(is_php_worker("php8.3-fpm"));
        assert!(is_php_worker("php7.4-fpm"));
        assert!(!is_php_worker("php"));
        assert!(!is_php_worker("phpstorm"));
        assert!(!is_php_worker("apache2"));
        assert!(!is_php_worker("grep"));
    }

    #[test]
    fn test_aggregation() {
        let metrics = ProcessMetrics::from_processes(vec![
            WorkerProcess {
                pid: 100,
                memory_kb: 64 * 1024,
                name: "php-fpm".to_string(),
            },
            WorkerProcess {
                pid: 101,
                memory_kb: 32 * 1024,
                name: "php-fpm".to_string(),
            },
        ]);

        assert_eq!(metrics.count, 2);
        assert!((metrics.total_memory_mb - 96.0).abs() < f64::EPSILON);
        assert!((metrics.avg_memory_mb - 48.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_is_zero_valued_not_error() {
        let metrics = ProcessMetrics::from_processes(Vec::new());
        assert_eq!(metrics.count, 0);
        assert_eq!(metrics.avg_memory_mb, 0.0);
        assert_eq!(metrics.total_memory_mb, 0.0);
    }
}
