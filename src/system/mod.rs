//! System resource probing
//!
//! Takes a one-shot snapshot of CPU core count and host memory
//! that the sizing calculators work from.

mod probe;

pub use probe::SystemMetrics;
