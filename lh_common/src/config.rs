//! Tunable decoder thresholds and TOML configuration loading.
//!
//! The pulse width bounds, cluster sizes and timing tolerances of the
//! decoder are calibration constants, not protocol invariants — they vary
//! with receiver hardware and must be validated empirically. They therefore
//! live here as configuration fields with working defaults instead of being
//! hard-coded inside the state machines.
//!
//! # TOML Example
//!
//! ```toml
//! [v1]
//! frame_length = 400000
//! min_cluster_size = 2
//!
//! [v2]
//! rotation_period = 480000
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::consts::{N_SENSORS, TIMESTAMP_MAX};

/// Error type for configuration loading and validation.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

/// V1 protocol thresholds.
///
/// The defaults describe the classic rotor timing: a nominal revolution of
/// 400 000 ticks, the second station's sync trailing the first by
/// 10 000 ticks, and sync widths on a base + divider lattice encoding the
/// `(skip, data, axis)` bits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct V1Config {
    /// Nominal revolution period [ticks].
    #[serde(default = "default_frame_length")]
    pub frame_length: u32,
    /// Accepted jitter around expected sync positions [ticks].
    #[serde(default = "default_frame_length_noise")]
    pub frame_length_noise: u32,
    /// Spacing between the two stations' sync pulses in one revolution [ticks].
    #[serde(default = "default_sync_separation")]
    pub sync_separation: u32,
    /// Maximum spread of one station's sync as seen across sensors [ticks].
    #[serde(default = "default_sync_dispersion")]
    pub sync_dispersion: u32,
    /// Shortest sync width: the lattice origin [ticks].
    #[serde(default = "default_sync_base_width")]
    pub sync_base_width: u16,
    /// Width step between adjacent sync bit patterns [ticks].
    #[serde(default = "default_sync_divider")]
    pub sync_divider: u16,
    /// Longest width still classified as a sweep pulse [ticks].
    #[serde(default = "default_sweep_max_width")]
    pub sweep_max_width: u16,
    /// Sweep offset corresponding to angle zero [ticks].
    #[serde(default = "default_sweep_center")]
    pub sweep_center: u32,
    /// Sync timestamps that must agree before a cluster is accepted.
    #[serde(default = "default_min_cluster_size")]
    pub min_cluster_size: u32,
    /// Sync pulses tolerated without forming a cluster before giving up.
    #[serde(default = "default_max_unlocked_sync_pulses")]
    pub max_unlocked_sync_pulses: u32,
}

fn default_frame_length() -> u32 {
    400_000
}
fn default_frame_length_noise() -> u32 {
    400
}
fn default_sync_separation() -> u32 {
    10_000
}
fn default_sync_dispersion() -> u32 {
    40
}
fn default_sync_base_width() -> u16 {
    1_350
}
fn default_sync_divider() -> u16 {
    250
}
fn default_sweep_max_width() -> u16 {
    512
}
fn default_sweep_center() -> u32 {
    192_500
}
fn default_min_cluster_size() -> u32 {
    1
}
fn default_max_unlocked_sync_pulses() -> u32 {
    64
}

impl Default for V1Config {
    fn default() -> Self {
        Self {
            frame_length: default_frame_length(),
            frame_length_noise: default_frame_length_noise(),
            sync_separation: default_sync_separation(),
            sync_dispersion: default_sync_dispersion(),
            sync_base_width: default_sync_base_width(),
            sync_divider: default_sync_divider(),
            sweep_max_width: default_sweep_max_width(),
            sweep_center: default_sweep_center(),
            min_cluster_size: default_min_cluster_size(),
            max_unlocked_sync_pulses: default_max_unlocked_sync_pulses(),
        }
    }
}

impl V1Config {
    /// Shortest width accepted as a sync pulse [ticks].
    #[inline]
    pub fn sync_width_min(&self) -> u16 {
        self.sync_base_width.saturating_sub(self.sync_divider / 2)
    }

    /// Longest width accepted as a sync pulse [ticks].
    ///
    /// The lattice encodes three bits, so eight steps above the base width.
    #[inline]
    pub fn sync_width_max(&self) -> u16 {
        self.sync_base_width
            .saturating_add(self.sync_divider.saturating_mul(7))
            .saturating_add(self.sync_divider / 2)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` when thresholds are zero,
    /// inverted, or would overflow the 24-bit timestamp window arithmetic.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_length == 0 || self.frame_length > TIMESTAMP_MAX / 2 {
            return Err(ConfigError::ValidationError(format!(
                "frame_length must be in 1..={}",
                TIMESTAMP_MAX / 2
            )));
        }
        if self.sync_separation == 0 || self.sync_separation >= self.frame_length {
            return Err(ConfigError::ValidationError(
                "sync_separation must be positive and below frame_length".to_string(),
            ));
        }
        if self.frame_length_noise >= self.sync_separation {
            return Err(ConfigError::ValidationError(
                "frame_length_noise must be below sync_separation".to_string(),
            ));
        }
        if self.sync_divider == 0 {
            return Err(ConfigError::ValidationError(
                "sync_divider must be positive".to_string(),
            ));
        }
        if self.sweep_max_width >= self.sync_width_min() {
            return Err(ConfigError::ValidationError(
                "sweep_max_width must be below the shortest sync width".to_string(),
            ));
        }
        if self.sweep_center >= self.frame_length {
            return Err(ConfigError::ValidationError(
                "sweep_center must be below frame_length".to_string(),
            ));
        }
        if self.min_cluster_size == 0 {
            return Err(ConfigError::ValidationError(
                "min_cluster_size must be at least 1".to_string(),
            ));
        }
        if self.max_unlocked_sync_pulses < self.min_cluster_size {
            return Err(ConfigError::ValidationError(
                "max_unlocked_sync_pulses must be at least min_cluster_size".to_string(),
            ));
        }
        Ok(())
    }
}

/// V2 protocol thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct V2Config {
    /// Rotor revolution period [ticks]; also the staleness window for
    /// workspace entries.
    #[serde(default = "default_rotation_period")]
    pub rotation_period: u32,
    /// Sensors that must contribute before a sweep block is emitted.
    #[serde(default = "default_min_block_sensors")]
    pub min_block_sensors: u8,
}

fn default_rotation_period() -> u32 {
    480_000
}
fn default_min_block_sensors() -> u8 {
    2
}

impl Default for V2Config {
    fn default() -> Self {
        Self {
            rotation_period: default_rotation_period(),
            min_block_sensors: default_min_block_sensors(),
        }
    }
}

impl V2Config {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` when the period is zero or too
    /// large for 24-bit window arithmetic, or the sensor count is out of
    /// range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rotation_period == 0 || self.rotation_period > TIMESTAMP_MAX / 2 {
            return Err(ConfigError::ValidationError(format!(
                "rotation_period must be in 1..={}",
                TIMESTAMP_MAX / 2
            )));
        }
        if self.min_block_sensors == 0 || self.min_block_sensors as usize > N_SENSORS {
            return Err(ConfigError::ValidationError(format!(
                "min_block_sensors must be in 1..={N_SENSORS}"
            )));
        }
        Ok(())
    }
}

/// Complete decoder configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecoderConfig {
    /// V1 protocol thresholds.
    #[serde(default)]
    pub v1: V1Config,
    /// V2 protocol thresholds.
    #[serde(default)]
    pub v2: V2Config,
}

impl DecoderConfig {
    /// Validate both protocol sections.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.v1.validate()?;
        self.v2.validate()
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
