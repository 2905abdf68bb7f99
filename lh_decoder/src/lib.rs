//! # Lighthouse Pulse Decoder
//!
//! Turns the raw timestamp/width stream captured from four light sensors
//! into per-base-station, per-axis sweep angles for a downstream pose
//! estimator. Supports the two incompatible beacon protocol generations:
//! V1 stations mark revolutions with periodic sync pulses; V2 stations emit
//! self-describing channel-encoded pulses.
//!
//! ## Real-Time Constraints
//!
//! Every call to [`processor::ProcessPulse::process_pulse`] is bounded-time
//! and allocation-free: all state lives in fixed-size arrays and
//! `heapless` rings sized at construction. A processor instance assumes
//! single-threaded, sequential access — callers with several sensor rigs
//! own one instance each and never share one across threads.

#![deny(clippy::disallowed_types)]

pub mod calibration;
pub mod history;
pub mod ootx;
pub mod processor;
pub mod v1;
pub mod v2;
