//! Per-sensor pulse history and width-based classification.
//!
//! V1 base stations interleave short sweep pulses with two longer,
//! characteristic sync widths. Classification is threshold-based on the
//! width band; telling the first sync of a revolution (`Sync0`) from the
//! second station's trailing sync (`Sync1`) additionally needs the sensor's
//! recent history, because the two bands overlap in width and only differ
//! in timing.

use heapless::HistoryBuffer;
use lh_common::config::V1Config;
use lh_common::consts::{N_SENSORS, PULSE_HISTORY_LENGTH};
use lh_common::frame::SensorId;
use lh_common::timestamp::{ts_diff, ts_in_window};

/// Classification of a single pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseClass {
    /// Width fell in no band, or the band was ambiguous. Dropped for
    /// synchronization purposes rather than guessed.
    Unknown,
    /// First sync pulse of a revolution.
    Sync0,
    /// Second station's sync pulse, trailing `Sync0` by the sync separation.
    Sync1,
    /// Short sweep pulse from a rotating laser plane.
    Sweep,
}

/// One remembered pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseSample {
    /// Rise timestamp [24-bit ticks].
    pub timestamp: u32,
    /// Pulse width [ticks].
    pub width: u16,
}

/// Fixed-depth ring of recent pulses for every sensor.
///
/// Capacity is fixed at [`PULSE_HISTORY_LENGTH`]; the oldest entry is
/// overwritten first. Never grows.
pub struct PulseHistorySet {
    rings: [HistoryBuffer<PulseSample, PULSE_HISTORY_LENGTH>; N_SENSORS],
}

impl Default for PulseHistorySet {
    fn default() -> Self {
        Self::new()
    }
}

impl PulseHistorySet {
    /// Create empty histories for all sensors.
    pub fn new() -> Self {
        Self {
            rings: core::array::from_fn(|_| HistoryBuffer::new()),
        }
    }

    /// Append a pulse to a sensor's ring, evicting the oldest entry when
    /// full.
    #[inline]
    pub fn push(&mut self, sensor: SensorId, sample: PulseSample) {
        self.rings[sensor as usize].write(sample);
    }

    /// Classify the most recently pushed pulse of a sensor.
    ///
    /// A sync-band pulse is `Sync1` when the same sensor saw another
    /// sync-band pulse one sync separation earlier, and `Sync0` otherwise.
    /// Widths between the sweep band and the sync band, or beyond the sync
    /// lattice, return `Unknown`.
    pub fn classify(&self, sensor: SensorId, cfg: &V1Config) -> PulseClass {
        let ring = &self.rings[sensor as usize];
        let Some(current) = ring.recent() else {
            return PulseClass::Unknown;
        };

        if current.width <= cfg.sweep_max_width {
            return PulseClass::Sweep;
        }
        if !in_sync_band(current.width, cfg) {
            return PulseClass::Unknown;
        }

        // Last sync-band pulse before the current one, if any.
        let prev_sync = ring
            .oldest_ordered()
            .take(ring.len().saturating_sub(1))
            .filter(|s| in_sync_band(s.width, cfg))
            .last();

        match prev_sync {
            Some(prev)
                if ts_in_window(
                    ts_diff(current.timestamp, prev.timestamp),
                    cfg.sync_separation,
                    cfg.frame_length_noise,
                ) =>
            {
                PulseClass::Sync1
            }
            _ => PulseClass::Sync0,
        }
    }
}

/// True if the width lies on the sync lattice band.
#[inline]
fn in_sync_band(width: u16, cfg: &V1Config) -> bool {
    width >= cfg.sync_width_min() && width <= cfg.sync_width_max()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> V1Config {
        V1Config::default()
    }

    fn push_and_classify(
        set: &mut PulseHistorySet,
        sensor: SensorId,
        timestamp: u32,
        width: u16,
    ) -> PulseClass {
        set.push(sensor, PulseSample { timestamp, width });
        set.classify(sensor, &cfg())
    }

    #[test]
    fn short_pulse_is_sweep() {
        let mut set = PulseHistorySet::new();
        assert_eq!(push_and_classify(&mut set, 0, 1000, 120), PulseClass::Sweep);
    }

    #[test]
    fn ambiguous_width_is_unknown() {
        let c = cfg();
        let mut set = PulseHistorySet::new();
        // Between the sweep band and the sync band.
        let gap = (c.sweep_max_width + c.sync_width_min()) / 2;
        assert_eq!(push_and_classify(&mut set, 0, 1000, gap), PulseClass::Unknown);
        // Beyond the sync lattice.
        assert_eq!(
            push_and_classify(&mut set, 0, 2000, c.sync_width_max() + 100),
            PulseClass::Unknown
        );
    }

    #[test]
    fn first_sync_defaults_to_sync0() {
        let mut set = PulseHistorySet::new();
        assert_eq!(push_and_classify(&mut set, 0, 1000, 1350), PulseClass::Sync0);
    }

    #[test]
    fn trailing_sync_is_sync1() {
        let c = cfg();
        let mut set = PulseHistorySet::new();
        push_and_classify(&mut set, 0, 1000, 1350);
        assert_eq!(
            push_and_classify(&mut set, 0, 1000 + c.sync_separation, 1600),
            PulseClass::Sync1
        );
    }

    #[test]
    fn next_revolution_sync_is_sync0_again() {
        let c = cfg();
        let mut set = PulseHistorySet::new();
        push_and_classify(&mut set, 0, 1000, 1350);
        push_and_classify(&mut set, 0, 1000 + c.sync_separation, 1600);
        assert_eq!(
            push_and_classify(&mut set, 0, 1000 + c.frame_length, 1350),
            PulseClass::Sync0
        );
    }

    #[test]
    fn single_width_outlier_does_not_flip_sync_pairing() {
        let c = cfg();
        let mut set = PulseHistorySet::new();
        push_and_classify(&mut set, 0, 1000, 1350);
        // Outlier in the dead zone between bands: dropped as Unknown.
        let gap = (c.sweep_max_width + c.sync_width_min()) / 2;
        assert_eq!(push_and_classify(&mut set, 0, 3000, gap), PulseClass::Unknown);
        // The genuine trailing sync still pairs with the first one.
        assert_eq!(
            push_and_classify(&mut set, 0, 1000 + c.sync_separation, 1600),
            PulseClass::Sync1
        );
    }

    #[test]
    fn histories_are_per_sensor() {
        let c = cfg();
        let mut set = PulseHistorySet::new();
        push_and_classify(&mut set, 0, 1000, 1350);
        // Sensor 1 never saw the first sync: its trailing pulse reads Sync0.
        assert_eq!(
            push_and_classify(&mut set, 1, 1000 + c.sync_separation, 1600),
            PulseClass::Sync0
        );
    }

    #[test]
    fn ring_capacity_is_bounded() {
        let mut set = PulseHistorySet::new();
        for i in 0..3 * PULSE_HISTORY_LENGTH as u32 {
            set.push(0, PulseSample {
                timestamp: i * 100,
                width: 120,
            });
        }
        assert_eq!(set.rings[0].len(), PULSE_HISTORY_LENGTH);
    }
}
