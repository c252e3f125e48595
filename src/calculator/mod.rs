//! Sizing calculators
//!
//! Pure functions mapping a system snapshot, worker-process metrics and
//! user overrides to a bounded configuration record for each supported
//! PHP runtime. Warnings and recommendations are informational only and
//! never feed back into the numeric outputs.

pub mod prefork;
pub mod worker_server;

pub use prefork::PreforkConfig;
pub use worker_server::WorkerServerConfig;

/// An option that is either auto-detected or explicitly overridden.
///
/// Replaces "0 means auto" sentinels so that "not supplied" is
/// unambiguous at the calculator boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting<T> {
    /// Derive the value from probed data
    Auto,
    /// Use the supplied value as-is
    Override(T),
}

// Not derived: the derive would demand `T: Default` even though `Auto`
// needs no value
impl<T> Default for Setting<T> {
    fn default() -> Self {
        Setting::Auto
    }
}

impl<T: Copy> Setting<T> {
    /// The override value, if one was supplied.
    pub fn override_value(self) -> Option<T> {
        match self {
            Setting::Auto => None,
            Setting::Override(v) => Some(v),
        }
    }
}

impl<T> From<Option<T>> for Setting<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Setting::Override(v),
            None => Setting::Auto,
        }
    }
}
