//! # php-tuner - PHP Runtime Sizing Calculator
//!
//! php-tuner inspects the host it runs on (CPU cores, memory, running
//! PHP worker processes) and derives recommended process/thread pool
//! sizing for two PHP runtimes: the classic PHP-FPM prefork process
//! manager and FrankenPHP-style threaded worker servers.
//!
//! ## Features
//!
//! - **System Probing**: CPU core count and memory via `sysinfo`
//! - **Worker Detection**: Finds running PHP-FPM workers and averages
//!   their resident memory
//! - **Pure Calculators**: Deterministic sizing from probed metrics,
//!   traffic profile and explicit overrides
//! - **Config Patching**: Rewrites `pm.*` lines in an existing pool
//!   file in place, with a backup written first
//! - **Service Restart**: Optionally restarts the detected PHP-FPM
//!   service after applying
//!
//! ## Quick Start
//!
//! ```no_run
//! use php_tuner::calculator::prefork;
//! use php_tuner::php::ProcessMetrics;
//! use php_tuner::system::SystemMetrics;
//!
//! let system = SystemMetrics::collect().unwrap();
//! let processes = ProcessMetrics::collect().unwrap_or_default();
//!
//! let cfg = prefork::calculate(&system, &processes, &prefork::Options::default());
//! println!("pm.max_children = {}", cfg.max_workers);
//! ```

#![warn(missing_docs)]

pub mod apply;
pub mod calculator;
pub mod config;
pub mod error;
pub mod output;
pub mod php;
pub mod system;

pub use error::{Result, TunerError};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
