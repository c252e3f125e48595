//! Worker-server (FrankenPHP) sizing calculator
//!
//! Threads share memory with the host process, so the per-thread estimate
//! is fixed at 30MB rather than probed, and the reservation is smaller
//! than the prefork variant's.

use serde::{Deserialize, Serialize};

use super::Setting;
use crate::config::TrafficProfile;
use crate::system::SystemMetrics;

/// Per-thread estimate when no override is given, in MB
const DEFAULT_THREAD_MB: f64 = 30.0;
/// Base memory reserved for the OS and the server itself, in MB
const RESERVED_BASE_MB: u64 = 256;
/// Extra reservation as a percentage of total memory
const RESERVED_PCT: u64 = 10;
/// Reservation ceiling, in MB
const RESERVED_CAP_MB: u64 = 2048;
/// Minimum memory left for PHP threads, in MB
const AVAILABLE_FLOOR_MB: u64 = 128;
/// Hard lower bound on the thread count
const MIN_THREADS: i64 = 2;
/// Hard upper bound on the thread count
const MAX_THREADS_CAP: i64 = 1000;

/// Calculation inputs beyond the probed system snapshot
#[derive(Debug, Clone)]
pub struct Options {
    /// Memory reserved for OS/other services, in MB
    pub reserved_memory_mb: Setting<u64>,
    /// Per-thread memory override, in MB
    pub thread_memory_mb: Setting<f64>,
    /// Expected traffic level
    pub traffic: TrafficProfile,
    /// Worker mode keeps the application resident between requests
    pub worker_mode: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            reserved_memory_mb: Setting::Auto,
            thread_memory_mb: Setting::Auto,
            traffic: TrafficProfile::Medium,
            worker_mode: true,
        }
    }
}

/// Calculated worker-server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerServerConfig {
    /// Threads started at boot
    pub num_threads: u32,
    /// Auto-scaling ceiling; always >= `num_threads`
    pub max_threads: u32,
    /// Persistent worker count; 0 when worker mode is disabled
    pub worker_count: u32,
    /// Queue wait timeout; empty means disabled
    pub max_wait_time: String,

    /// Memory reserved for OS/services, in MB
    pub reserved_memory_mb: u64,
    /// Memory available to PHP threads, in MB
    pub available_memory_mb: u64,
    /// Per-thread memory the calculation used, in MB
    pub thread_memory_mb: f64,
    /// Ordered, append-only warnings
    pub warnings: Vec<String>,
    /// Ordered, append-only recommendations
    pub recommendations: Vec<String>,
}

/// Compute worker-server thread settings from the system snapshot.
pub fn calculate(system: &SystemMetrics, opts: &Options) -> WorkerServerConfig {
    let mut warnings = Vec::new();

    let thread_memory_mb = match opts.thread_memory_mb.override_value() {
        Some(mb) if mb > 0.0 => mb,
        _ => {
            warnings.push(
                "Using estimated 30MB per thread. Use --thread-mem to override if known."
                    .to_string(),
            );
            DEFAULT_THREAD_MB
        }
    };

    let reserved_memory_mb = match opts.reserved_memory_mb.override_value() {
        Some(mb) if mb > 0 => mb,
        _ => (RESERVED_BASE_MB + system.total_memory_mb * RESERVED_PCT / 100).min(RESERVED_CAP_MB),
    };

    let mut available_memory_mb = system.total_memory_mb.saturating_sub(reserved_memory_mb);
    if available_memory_mb < AVAILABLE_FLOOR_MB {
        available_memory_mb = AVAILABLE_FLOOR_MB;
        warnings.push("Very low available memory, using minimum of 128MB".to_string());
    }

    let cpu_cores = system.cpu_cores as i64;
    let max_by_memory = (available_memory_mb as f64 / thread_memory_mb) as i64;

    let mut num_threads = cpu_cores * 2;
    if max_by_memory < num_threads {
        num_threads = max_by_memory;
        warnings.push("Thread count limited by available memory".to_string());
    }

    if num_threads < MIN_THREADS {
        num_threads = MIN_THREADS;
    }
    if num_threads > MAX_THREADS_CAP {
        num_threads = MAX_THREADS_CAP;
        warnings.push("num_threads capped at 1000".to_string());
    }

    // Auto-scaling headroom: up to 4x cores, bounded by memory, but
    // never below the starting thread count
    let mut max_threads = cpu_cores * 4;
    if max_threads > max_by_memory {
        max_threads = max_by_memory;
    }
    if max_threads < num_threads {
        max_threads = num_threads;
    }

    let worker_count = if opts.worker_mode { num_threads as u32 } else { 0 };

    let max_wait_time = match opts.traffic {
        TrafficProfile::Low => "", // disabled for low traffic
        TrafficProfile::High => "5s",
        TrafficProfile::Medium => "10s",
    }
    .to_string();

    let mut cfg = WorkerServerConfig {
        num_threads: num_threads as u32,
        max_threads: max_threads as u32,
        worker_count,
        max_wait_time,
        reserved_memory_mb,
        available_memory_mb,
        thread_memory_mb,
        warnings,
        recommendations: Vec::new(),
    };

    add_recommendations(&mut cfg, system, opts);
    cfg
}

fn add_recommendations(cfg: &mut WorkerServerConfig, system: &SystemMetrics, opts: &Options) {
    if opts.worker_mode {
        cfg.recommendations
            .push("Worker mode keeps your app in memory for faster responses.".to_string());
    } else {
        cfg.recommendations
            .push("Consider enabling worker mode for significant performance gains.".to_string());
    }

    if system.total_memory_mb < 1024 {
        cfg.recommendations
            .push("Low memory system detected. Monitor memory usage closely.".to_string());
    }

    cfg.recommendations.push(
        "FrankenPHP threads share memory, so they're more efficient than FPM processes."
            .to_string(),
    );
    cfg.recommendations
        .push("Use the 'watch' directive in development for hot reloading.".to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system(total_mb: u64, cores: usize) -> SystemMetrics {
        SystemMetrics {
            platform: "linux".to_string(),
            cpu_cores: cores,
            total_memory_mb: total_mb,
            available_memory_mb: total_mb / 2,
            used_memory_mb: total_mb / 2,
        }
    }

    #[test]
    fn test_defaults_use_30mb_estimate_with_warning() {
        let cfg = calculate(&system(4096, 4), &Options::default());
        assert_eq!(cfg.thread_memory_mb, 30.0);
        assert!(cfg.warnings.iter().any(|w| w.contains("30MB per thread")));
    }

    #[test]
    fn test_reserved_memory_formula_and_cap() {
        let cfg = calculate(&system(4096, 4), &Options::default());
        assert_eq!(cfg.reserved_memory_mb, 256 + 4096 * 10 / 100);

        let cfg = calculate(&system(65536, 4), &Options::default());
        assert_eq!(cfg.reserved_memory_mb, 2048);
    }

    #[test]
    fn test_thread_counts_4gb_quad_core() {
        let cfg = calculate(&system(4096, 4), &Options::default());
        // reserved = 256 + 409 = 665, available = 3431, by memory = 114
        assert_eq!(cfg.available_memory_mb, 3431);
        assert_eq!(cfg.num_threads, 8); // 2x cores, not memory-limited
        assert_eq!(cfg.max_threads, 16); // 4x cores
        assert_eq!(cfg.worker_count, 8);
        assert!(!cfg
            .warnings
            .iter()
            .any(|w| w.contains("limited by available memory")));
    }

    #[test]
    fn test_memory_limited_thread_count_warns() {
        let opts = Options {
            thread_memory_mb: Setting::Override(500.0),
            ..Options::default()
        };
        let cfg = calculate(&system(2048, 8), &opts);
        // reserved = 460, available = 1588, by memory = 3 < 16
        assert_eq!(cfg.num_threads, 3);
        assert_eq!(cfg.max_threads, 3);
        assert!(cfg
            .warnings
            .iter()
            .any(|w| w.contains("limited by available memory")));
    }

    #[test]
    fn test_thread_floor_has_no_warning() {
        let opts = Options {
            thread_memory_mb: Setting::Override(4000.0),
            ..Options::default()
        };
        let cfg = calculate(&system(512, 1), &opts);
        assert_eq!(cfg.num_threads, 2);
        assert!(cfg.max_threads >= cfg.num_threads);
        assert!(!cfg.warnings.iter().any(|w| w.contains("capped at 1000")));
    }

    #[test]
    fn test_low_memory_floors_available() {
        let cfg = calculate(&system(256, 2), &Options::default());
        assert_eq!(cfg.available_memory_mb, 128);
        assert!(cfg
            .warnings
            .iter()
            .any(|w| w.contains("minimum of 128MB")));
    }

    #[test]
    fn test_worker_mode_toggle() {
        let cfg = calculate(&system(4096, 4), &Options::default());
        assert_eq!(cfg.worker_count, cfg.num_threads);

        let opts = Options {
            worker_mode: false,
            ..Options::default()
        };
        let cfg = calculate(&system(4096, 4), &opts);
        assert_eq!(cfg.worker_count, 0);
        assert!(cfg
            .recommendations
            .iter()
            .any(|r| r.contains("enabling worker mode")));
    }

    #[test]
    fn test_wait_time_per_profile() {
        for (traffic, wait) in [
            (TrafficProfile::Low, ""),
            (TrafficProfile::Medium, "10s"),
            (TrafficProfile::High, "5s"),
        ] {
            let opts = Options {
                traffic,
                ..Options::default()
            };
            let cfg = calculate(&system(4096, 4), &opts);
            assert_eq!(cfg.max_wait_time, wait);
        }
    }

    #[test]
    fn test_max_threads_never_below_num_threads() {
        let opts = Options {
            thread_memory_mb: Setting::Override(1000.0),
            ..Options::default()
        };
        let cfg = calculate(&system(1024, 16), &opts);
        assert!(cfg.max_threads >= cfg.num_threads);
    }
}
