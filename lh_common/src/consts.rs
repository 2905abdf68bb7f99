//! Protocol dimensions and counter geometry.
//!
//! These are structural constants of the lighthouse system, not tuning
//! parameters — the tunable thresholds live in [`crate::config`].

use static_assertions::const_assert;

/// Sweep axes per base station (x and y).
pub const N_SWEEPS: usize = 2;

/// Base stations a single decoder instance can track.
pub const N_BASE_STATIONS: usize = 2;

/// Light sensors on the receiving body.
pub const N_SENSORS: usize = 4;

/// Per-sensor pulse history depth used by the V1 classifier.
pub const PULSE_HISTORY_LENGTH: usize = 8;

/// Width of the cyclic pulse timestamp counter.
pub const TIMESTAMP_BITWIDTH: u32 = 24;

/// Largest representable timestamp; the counter wraps past this value.
pub const TIMESTAMP_MAX: u32 = (1 << TIMESTAMP_BITWIDTH) - 1;

const_assert!(PULSE_HISTORY_LENGTH.is_power_of_two());
const_assert!(TIMESTAMP_BITWIDTH < 32);
const_assert!(N_BASE_STATIONS <= N_SENSORS);
