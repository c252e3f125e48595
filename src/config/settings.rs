//! CLI arguments and shared enumerations for php-tuner
//!
//! Defines the two subcommands (`worker-server` and `prefork`), their flag
//! sets, and the traffic/pool enumerations the calculators consume.

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// php-tuner - PHP runtime sizing calculator
#[derive(Parser, Debug, Clone)]
#[command(name = "php-tuner")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Calculates optimal PHP-FPM and FrankenPHP worker sizing")]
#[command(long_about = r#"
php-tuner inspects your host (CPU cores, memory, running PHP workers) and
derives recommended process/thread pool sizing for two PHP runtimes:

  worker-server, f    FrankenPHP-style threaded worker server (default)
  prefork, fpm        Traditional PHP-FPM prefork process manager

Examples:
  php-tuner                           # worker-server sizing (default)
  php-tuner f --traffic high          # high-traffic worker server
  php-tuner fpm                       # PHP-FPM sizing report
  php-tuner fpm --apply --restart     # write config and restart the service
  php-tuner fpm --config-only > pool.conf
"#)]
pub struct CliArgs {
    /// Subcommand; defaults to `worker-server` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Size a threaded worker server (FrankenPHP-style)
    #[command(name = "worker-server", alias = "f")]
    WorkerServer(WorkerServerArgs),

    /// Size a prefork process manager (PHP-FPM)
    #[command(name = "prefork", alias = "fpm")]
    Prefork(PreforkArgs),
}

/// Flags shared by both subcommands
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Expected traffic profile
    #[arg(long, value_enum, default_value = "medium")]
    pub traffic: TrafficProfile,

    /// Memory to reserve for OS/services in MB (default: auto-calculated)
    #[arg(long, value_name = "MB")]
    pub reserved: Option<u64>,

    /// Output only the configuration block (for piping to a file)
    #[arg(short = 'c', long)]
    pub config_only: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

/// `worker-server` subcommand flags
#[derive(Args, Debug, Clone)]
pub struct WorkerServerArgs {
    /// Shared flags
    #[command(flatten)]
    pub common: CommonArgs,

    /// Override estimated per-thread memory in MB (default: 30)
    #[arg(long, value_name = "MB")]
    pub thread_mem: Option<f64>,

    /// Enable worker mode (long-running scripts kept in memory)
    #[arg(
        long,
        default_value_t = true,
        action = clap::ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub worker: bool,
}

/// `prefork` subcommand flags
#[derive(Args, Debug, Clone)]
pub struct PreforkArgs {
    /// Shared flags
    #[command(flatten)]
    pub common: CommonArgs,

    /// Process manager type (default: auto-selected from traffic profile)
    #[arg(long, value_enum)]
    pub pm: Option<PoolType>,

    /// Override detected per-process memory in MB (default: auto-detect)
    #[arg(long, value_name = "MB")]
    pub process_mem: Option<f64>,

    /// Apply the configuration to the pool config file
    #[arg(long)]
    pub apply: bool,

    /// Path to the pool config file (default: auto-detect)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Restart the PHP-FPM service after applying
    #[arg(long)]
    pub restart: bool,

    /// Skip confirmation prompts
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Expected traffic pattern, selecting timeout defaults and the
/// auto-selected pool type
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficProfile {
    /// Low traffic: conserve memory, relaxed timeouts
    Low,
    /// Medium traffic: balanced defaults
    Medium,
    /// High traffic: keep workers warm, strict timeouts
    High,
}

impl Default for TrafficProfile {
    fn default() -> Self {
        TrafficProfile::Medium
    }
}

impl fmt::Display for TrafficProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Prefork process manager pool type
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolType {
    /// Fixed worker count, all spawned at startup
    Static,
    /// Worker count scales between spare-server bounds
    Dynamic,
    /// Workers spawned only when requests arrive
    OnDemand,
}

impl fmt::Display for PoolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::Dynamic => write!(f, "dynamic"),
            Self::OnDemand => write!(f, "ondemand"),
        }
    }
}
