//! Interval aggregation of resampled output.
//!
//! Reads a resampled 1 Hz CSV back in, groups rows into fixed windows,
//! keeps first/last counter values, sums increments, takes the per-signal
//! maximum and labels each window with its strongest station.

pub mod aggregate;
pub mod analyzer;
pub mod rooms;
pub mod types;
pub mod utility;
