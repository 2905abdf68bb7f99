//! Raw pulse frames as delivered by the sensor driver.
//!
//! One [`PulseFrame`] describes a single detected pulse edge on one sensor.
//! The payload is protocol specific: V1 base stations only carry a pulse
//! width, V2 base stations carry width-encoded beam data with an in-sweep
//! offset and, when demodulation succeeded, the emitting channel.

use crate::consts::{N_BASE_STATIONS, N_SENSORS};

/// Sensor index, `0..N_SENSORS`.
pub type SensorId = u8;

/// Base station index, `0..N_BASE_STATIONS`.
pub type BaseStationId = u8;

/// Sweep axis of a rotating laser plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum SweepAxis {
    /// First (horizontal) sweep.
    #[default]
    X = 0,
    /// Second (vertical) sweep.
    Y = 1,
}

impl SweepAxis {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::X),
            1 => Some(Self::Y),
            _ => None,
        }
    }

    /// Array index of this axis, `0..N_SWEEPS`.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Identifies one completed sweep: which base station, which axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SweepId {
    /// Emitting base station.
    pub base_station: BaseStationId,
    /// Swept axis.
    pub axis: SweepAxis,
}

impl SweepId {
    /// Build a sweep id, checking the base station index.
    #[inline]
    pub const fn new(base_station: BaseStationId, axis: SweepAxis) -> Option<Self> {
        if (base_station as usize) < N_BASE_STATIONS {
            Some(Self { base_station, axis })
        } else {
            None
        }
    }
}

/// Decoded V2 channel information.
///
/// Only present when beam data demodulation succeeded for the pulse
/// (`channelFound` in driver terms). `channel` is zero indexed here while
/// base station configuration tools index it from one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelBits {
    /// Emitting channel, `0..=15`.
    pub channel: u8,
    /// One bit of the slow side-channel data stream.
    pub slow_bit: bool,
}

/// Protocol-specific payload of a pulse frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePayload {
    /// V1 base station pulse: only the width is known.
    V1 {
        /// Pulse width [counter ticks].
        width: u16,
    },
    /// V2 base station pulse: self-describing beam data.
    V2 {
        /// Raw width-encoded beam data.
        beam_data: u32,
        /// Phase of the pulse within the sweep [counter ticks].
        offset: u32,
        /// Channel and slow bit, when demodulation succeeded.
        channel: Option<ChannelBits>,
    },
}

/// One decoded sensor detection, owned by the caller and read-only to the
/// decoder for the duration of one `process_pulse` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseFrame {
    /// Sensor that saw the pulse, `0..N_SENSORS`.
    pub sensor: SensorId,
    /// Rise timestamp, 24-bit cyclic counter value.
    pub timestamp: u32,
    /// Protocol-specific data.
    pub payload: FramePayload,
}

impl PulseFrame {
    /// Build a V1 frame.
    #[inline]
    pub const fn v1(sensor: SensorId, timestamp: u32, width: u16) -> Self {
        Self {
            sensor,
            timestamp,
            payload: FramePayload::V1 { width },
        }
    }

    /// Build a V2 frame.
    #[inline]
    pub const fn v2(
        sensor: SensorId,
        timestamp: u32,
        beam_data: u32,
        offset: u32,
        channel: Option<ChannelBits>,
    ) -> Self {
        Self {
            sensor,
            timestamp,
            payload: FramePayload::V2 {
                beam_data,
                offset,
                channel,
            },
        }
    }

    /// True if the sensor index is valid for this system.
    #[inline]
    pub const fn sensor_in_range(&self) -> bool {
        (self.sensor as usize) < N_SENSORS
    }
}
