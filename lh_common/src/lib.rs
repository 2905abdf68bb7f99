//! Lighthouse Common Library
//!
//! This crate provides the shared types and utilities used by the lighthouse
//! pulse decoding workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - Protocol dimensions and counter geometry
//! - [`timestamp`] - Wraparound-safe arithmetic over the 24-bit pulse counter
//! - [`frame`] - Raw pulse frames as delivered by the sensor driver
//! - [`measurement`] - Per-sensor angle results consumed downstream
//! - [`config`] - Tunable decoder thresholds and TOML loading
//! - [`prelude`] - Common re-exports for convenience

pub mod config;
pub mod consts;
pub mod frame;
pub mod measurement;
pub mod prelude;
pub mod timestamp;
