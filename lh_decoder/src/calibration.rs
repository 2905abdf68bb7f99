//! Calibration application over measured angles.
//!
//! The geometric correction model belongs to the base station and lives
//! outside this crate; here it is a pure function behind the
//! [`CalibrationModel`] trait, assumed total. Applying it only touches the
//! passed-in result — the processors keep no calibration state.

use lh_common::consts::{N_SENSORS, N_SWEEPS};
use lh_common::frame::{BaseStationId, SweepAxis};
use lh_common::measurement::PulseResult;

/// A base station's angle correction model.
pub trait CalibrationModel {
    /// Corrected angle for a raw sweep angle. Never fails.
    fn correct(&self, axis: SweepAxis, raw: f32) -> f32;
}

/// Identity model for uncalibrated base stations.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCalibration;

impl CalibrationModel for NoCalibration {
    #[inline]
    fn correct(&self, _axis: SweepAxis, raw: f32) -> f32 {
        raw
    }
}

/// Apply a base station's calibration to every populated angle in `result`.
///
/// Sensors with no valid axis for that base station are left bit-for-bit
/// unchanged; partially populated measurements are corrected only on their
/// valid axes.
pub fn apply_calibration(
    model: &dyn CalibrationModel,
    result: &mut PulseResult,
    base_station: BaseStationId,
) {
    for sensor in 0..N_SENSORS as u8 {
        let m = result.measurement_mut(sensor, base_station);
        if m.valid_count() == 0 {
            continue;
        }
        for axis_idx in 0..N_SWEEPS {
            if !m.valid[axis_idx] {
                continue;
            }
            // Index is in range by construction.
            let axis = SweepAxis::from_u8(axis_idx as u8).unwrap_or_default();
            m.corrected_angles[axis_idx] = model.correct(axis, m.angles[axis_idx]);
        }
    }
}
