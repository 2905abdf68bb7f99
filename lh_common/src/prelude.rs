//! Common re-exports for decoder crates and their consumers.

pub use crate::config::{ConfigError, ConfigLoader, DecoderConfig, V1Config, V2Config};
pub use crate::consts::{
    N_BASE_STATIONS, N_SENSORS, N_SWEEPS, PULSE_HISTORY_LENGTH, TIMESTAMP_MAX,
};
pub use crate::frame::{
    BaseStationId, ChannelBits, FramePayload, PulseFrame, SensorId, SweepAxis, SweepId,
};
pub use crate::measurement::{BaseStationMeasurement, PulseResult, SensorMeasurement};
pub use crate::timestamp::{ts_add, ts_diff, ts_in_window};
