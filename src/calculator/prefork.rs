//! Prefork (PHP-FPM) sizing calculator
//!
//! Derives `pm.*` pool settings from available memory and per-process
//! memory, bounded to sane limits. The per-process memory fallback chain
//! is: explicit override, probed average, half of the runtime's
//! `memory_limit`, then a fixed 64MB estimate.

use serde::{Deserialize, Serialize};

use super::Setting;
use crate::config::{PoolType, TrafficProfile};
use crate::php::ProcessMetrics;
use crate::system::SystemMetrics;

/// Hard lower bound for the worker pool
const MIN_MAX_WORKERS: u32 = 5;
/// Hard upper bound for the worker pool
const MAX_MAX_WORKERS: u32 = 1000;
/// Per-process estimate when nothing could be detected, in MB
const FALLBACK_PROCESS_MB: f64 = 64.0;
/// Base memory reserved for the OS, in MB
const RESERVED_BASE_MB: u64 = 512;
/// Extra reservation as a percentage of total memory
const RESERVED_PCT: u64 = 15;
/// Reservation ceiling for very large hosts, in MB
const RESERVED_CAP_MB: u64 = 4096;
/// Minimum memory left for the pool, in MB
const AVAILABLE_FLOOR_MB: u64 = 256;
/// Requests served before a worker is recycled
const MAX_REQUESTS: u32 = 500;

/// Calculation inputs beyond the probed metrics
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Memory reserved for OS/other services, in MB
    pub reserved_memory_mb: Setting<u64>,
    /// Per-process memory override, in MB
    pub process_memory_mb: Setting<f64>,
    /// Expected traffic level
    pub traffic: TrafficProfile,
    /// Desired pool type; `Auto` selects from the traffic profile
    pub pool_type: Setting<PoolType>,
    /// Runtime `memory_limit` in MB, consulted when no workers were
    /// probed (`Some(-1)` means unlimited and is ignored)
    pub runtime_memory_limit_mb: Option<i64>,
}

/// Calculated prefork pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreforkConfig {
    /// Resolved pool type
    pub pool_type: PoolType,
    /// `pm.max_children`
    pub max_workers: u32,
    /// `pm.start_servers`
    pub start_workers: u32,
    /// `pm.min_spare_servers`
    pub min_spare_workers: u32,
    /// `pm.max_spare_servers`
    pub max_spare_workers: u32,
    /// `pm.max_requests`
    pub max_requests_per_worker: u32,
    /// `pm.process_idle_timeout`
    pub idle_timeout: String,

    /// Memory reserved for OS/services, in MB
    pub reserved_memory_mb: u64,
    /// Memory available to the pool, in MB
    pub available_memory_mb: u64,
    /// Per-process memory the calculation used, in MB (0 when the
    /// 64MB estimate path was taken)
    pub process_memory_mb: f64,
    /// Ordered, append-only warnings
    pub warnings: Vec<String>,
    /// Ordered, append-only recommendations
    pub recommendations: Vec<String>,
}

/// Compute prefork pool settings from probed metrics and options.
pub fn calculate(
    system: &SystemMetrics,
    processes: &ProcessMetrics,
    opts: &Options,
) -> PreforkConfig {
    let mut warnings = Vec::new();
    let mut recommendations = Vec::new();

    let process_memory_mb = resolve_process_memory(processes, opts);
    let reserved_memory_mb = resolve_reserved_memory(system, opts);

    let mut available_memory_mb = system.total_memory_mb.saturating_sub(reserved_memory_mb);
    if available_memory_mb < AVAILABLE_FLOOR_MB {
        available_memory_mb = AVAILABLE_FLOOR_MB;
        warnings.push("Very low available memory, using minimum of 256MB".to_string());
    }

    let pool_type = resolve_pool_type(opts);

    let mut max_workers = if process_memory_mb > 0.0 {
        (available_memory_mb as f64 / process_memory_mb).floor() as u32
    } else {
        warnings.push("Could not detect PHP process memory, using 64MB estimate".to_string());
        (available_memory_mb as f64 / FALLBACK_PROCESS_MB).floor() as u32
    };

    if max_workers < MIN_MAX_WORKERS {
        max_workers = MIN_MAX_WORKERS;
        warnings.push("max_children increased to minimum of 5".to_string());
    }
    if max_workers > MAX_MAX_WORKERS {
        max_workers = MAX_MAX_WORKERS;
        warnings.push("max_children capped at 1000".to_string());
    }

    let cpu_cores = system.cpu_cores as u32;
    let mut start_workers = cpu_cores * 4;
    let mut min_spare_workers = cpu_cores * 2;
    let mut max_spare_workers = cpu_cores * 4;

    // Spare-server counts must never exceed the pool size
    if start_workers > max_workers {
        start_workers = max_workers;
    }
    if min_spare_workers > max_workers {
        min_spare_workers = max_workers / 2;
    }
    if max_spare_workers > max_workers {
        max_spare_workers = max_workers;
    }

    // Reconcile so min <= start <= max holds for spare servers
    if min_spare_workers > start_workers {
        min_spare_workers = start_workers;
    }
    if max_spare_workers < start_workers {
        max_spare_workers = start_workers;
    }

    let idle_timeout = match opts.traffic {
        TrafficProfile::Low => "10s",
        TrafficProfile::High => "3s",
        TrafficProfile::Medium => "5s",
    }
    .to_string();

    let mut cfg = PreforkConfig {
        pool_type,
        max_workers,
        start_workers,
        min_spare_workers,
        max_spare_workers,
        max_requests_per_worker: MAX_REQUESTS,
        idle_timeout,
        reserved_memory_mb,
        available_memory_mb,
        process_memory_mb,
        warnings,
        recommendations: Vec::new(),
    };

    add_recommendations(&mut recommendations, &cfg, system);
    cfg.recommendations = recommendations;
    cfg
}

fn resolve_process_memory(processes: &ProcessMetrics, opts: &Options) -> f64 {
    if let Some(override_mb) = opts.process_memory_mb.override_value() {
        if override_mb > 0.0 {
            return override_mb;
        }
    }

    if processes.avg_memory_mb > 0.0 {
        return processes.avg_memory_mb;
    }

    // Processes rarely use their full memory_limit; half of it is a
    // workable upper-bound estimate
    if let Some(limit) = opts.runtime_memory_limit_mb {
        if limit > 0 {
            return limit as f64 / 2.0;
        }
    }

    0.0 // triggers the fixed-estimate path
}

fn resolve_reserved_memory(system: &SystemMetrics, opts: &Options) -> u64 {
    if let Some(override_mb) = opts.reserved_memory_mb.override_value() {
        if override_mb > 0 {
            return override_mb;
        }
    }

    let reserved = RESERVED_BASE_MB + system.total_memory_mb * RESERVED_PCT / 100;
    reserved.min(RESERVED_CAP_MB)
}

fn resolve_pool_type(opts: &Options) -> PoolType {
    if let Some(pool) = opts.pool_type.override_value() {
        return pool;
    }

    match opts.traffic {
        TrafficProfile::Low => PoolType::OnDemand,
        TrafficProfile::High => PoolType::Static,
        TrafficProfile::Medium => PoolType::Dynamic,
    }
}

fn add_recommendations(out: &mut Vec<String>, cfg: &PreforkConfig, system: &SystemMetrics) {
    match cfg.pool_type {
        PoolType::Static => out.push(
            "Static PM keeps all workers running. Best for high-traffic, dedicated PHP servers."
                .to_string(),
        ),
        PoolType::OnDemand => out.push(
            "Ondemand PM spawns workers only when needed. Best for low-traffic or shared hosting."
                .to_string(),
        ),
        PoolType::Dynamic => out.push(
            "Dynamic PM balances memory usage and response time. Good for most use cases."
                .to_string(),
        ),
    }

    if system.total_memory_mb < 2048 {
        out.push(
            "Consider using 'ondemand' PM on low-memory systems to conserve resources."
                .to_string(),
        );
    }

    if cfg.max_workers > 100 {
        out.push(
            "High max_children value. Monitor for diminishing returns due to context switching."
                .to_string(),
        );
    }

    out.push("Set pm.max_requests to prevent memory leaks from accumulating over time.".to_string());
    out.push(
        "Consider separate pools for frontend/backend with different PM configurations."
            .to_string(),
    );
}
