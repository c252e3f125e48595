//! PHP worker inspection
//!
//! Enumerates running PHP worker processes and their resident memory,
//! and queries the PHP binary for its configured `memory_limit` as a
//! secondary sizing source.

mod ini;
mod processes;

pub use ini::{memory_limit_mb, parse_memory_limit};
pub use processes::{ProcessMetrics, WorkerProcess};
