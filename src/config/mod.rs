//! Configuration module for php-tuner
//!
//! Provides the CLI argument surface and the shared enumerations
//! (traffic profiles, pool types) used across the calculators.

mod settings;

pub use settings::*;
