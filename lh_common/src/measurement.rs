//! Angle measurement results consumed by the downstream pose estimator.
//!
//! [`PulseResult`] maps sensor → base station → sweep axis → angle. The
//! caller allocates it once and clears it per base station between frames;
//! the decoder only mutates it in place — no allocation ever happens on the
//! processing path.

use crate::consts::{N_BASE_STATIONS, N_SENSORS, N_SWEEPS};
use crate::frame::{BaseStationId, SensorId, SweepAxis};

/// Angles measured for one sensor against one base station.
///
/// `valid_count() < 2` marks a partial measurement — a legal intermediate
/// state, not an error. Downstream must check validity before trusting
/// either angle array.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BaseStationMeasurement {
    /// Raw sweep angles [rad], indexed by [`SweepAxis`].
    pub angles: [f32; N_SWEEPS],
    /// Calibration-corrected angles [rad], indexed by [`SweepAxis`].
    pub corrected_angles: [f32; N_SWEEPS],
    /// Which axes hold a measurement from the current frame.
    pub valid: [bool; N_SWEEPS],
}

impl BaseStationMeasurement {
    /// Number of populated axes, `0..=2`.
    #[inline]
    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|v| **v).count()
    }

    /// Raw angle for an axis, if populated.
    #[inline]
    pub fn angle(&self, axis: SweepAxis) -> Option<f32> {
        self.valid[axis.index()].then(|| self.angles[axis.index()])
    }

    /// Corrected angle for an axis, if populated.
    #[inline]
    pub fn corrected_angle(&self, axis: SweepAxis) -> Option<f32> {
        self.valid[axis.index()].then(|| self.corrected_angles[axis.index()])
    }

    /// Store a raw angle for an axis and mark it valid.
    #[inline]
    pub fn record(&mut self, axis: SweepAxis, angle: f32) {
        self.angles[axis.index()] = angle;
        self.valid[axis.index()] = true;
    }
}

/// All base station measurements of one sensor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorMeasurement {
    /// Per base station angles.
    pub base_stations: [BaseStationMeasurement; N_BASE_STATIONS],
}

/// Full result structure: sensor → base station → angles.
///
/// Lifecycle: allocated once by the caller, cleared explicitly per base
/// station via [`PulseResult::clear`] before reuse, never reallocated.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PulseResult {
    /// Per sensor measurements.
    pub sensors: [SensorMeasurement; N_SENSORS],
}

impl PulseResult {
    /// Create a zeroed result structure.
    pub const fn new() -> Self {
        Self {
            sensors: [SensorMeasurement {
                base_stations: [BaseStationMeasurement {
                    angles: [0.0; N_SWEEPS],
                    corrected_angles: [0.0; N_SWEEPS],
                    valid: [false; N_SWEEPS],
                }; N_BASE_STATIONS],
            }; N_SENSORS],
        }
    }

    /// Reset every sensor's measurement of one base station.
    ///
    /// Other base stations are untouched. Idempotent. Out-of-range indices
    /// are ignored.
    pub fn clear(&mut self, base_station: BaseStationId) {
        let bs = base_station as usize;
        if bs >= N_BASE_STATIONS {
            return;
        }
        for sensor in &mut self.sensors {
            sensor.base_stations[bs] = BaseStationMeasurement::default();
        }
    }

    /// Measurement of one sensor against one base station.
    #[inline]
    pub fn measurement(
        &self,
        sensor: SensorId,
        base_station: BaseStationId,
    ) -> &BaseStationMeasurement {
        &self.sensors[sensor as usize].base_stations[base_station as usize]
    }

    /// Mutable measurement of one sensor against one base station.
    #[inline]
    pub fn measurement_mut(
        &mut self,
        sensor: SensorId,
        base_station: BaseStationId,
    ) -> &mut BaseStationMeasurement {
        &mut self.sensors[sensor as usize].base_stations[base_station as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_result_is_all_invalid() {
        let result = PulseResult::new();
        for s in 0..N_SENSORS as u8 {
            for bs in 0..N_BASE_STATIONS as u8 {
                assert_eq!(result.measurement(s, bs).valid_count(), 0);
            }
        }
    }

    #[test]
    fn record_populates_one_axis() {
        let mut m = BaseStationMeasurement::default();
        m.record(SweepAxis::Y, 1.25);
        assert_eq!(m.valid_count(), 1);
        assert_eq!(m.angle(SweepAxis::Y), Some(1.25));
        assert_eq!(m.angle(SweepAxis::X), None);
    }

    #[test]
    fn clear_resets_only_the_named_base_station() {
        let mut result = PulseResult::new();
        result.measurement_mut(2, 1).record(SweepAxis::X, 0.5);
        result.measurement_mut(2, 1).record(SweepAxis::Y, 0.6);
        result.measurement_mut(2, 0).record(SweepAxis::X, 0.7);

        result.clear(1);

        assert_eq!(result.measurement(2, 1).valid_count(), 0);
        assert_eq!(result.measurement(2, 0).valid_count(), 1);
    }

    #[test]
    fn clear_is_idempotent() {
        let mut result = PulseResult::new();
        result.measurement_mut(0, 0).record(SweepAxis::X, 0.1);

        result.clear(0);
        let once = result;
        result.clear(0);
        assert_eq!(result, once);
    }

    #[test]
    fn clear_ignores_out_of_range_station() {
        let mut result = PulseResult::new();
        result.measurement_mut(0, 0).record(SweepAxis::X, 0.1);
        result.clear(N_BASE_STATIONS as u8);
        assert_eq!(result.measurement(0, 0).valid_count(), 1);
    }
}
