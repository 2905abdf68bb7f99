//! V1 base station processing: sync lock state machine and sweep angles.
//!
//! V1 base stations mark each rotor revolution with periodic sync pulses:
//! the first station's sync opens the frame, the second station's sync
//! trails it by a fixed separation. Sync pulse widths sit on a
//! base + divider lattice encoding three bits — skip (station not sweeping
//! this frame), one OOTX data bit, and the swept axis.
//!
//! The processor locks onto the periodic signal by clustering close-together
//! sync timestamps and accepting the cluster once it recurs one revolution
//! later. While locked, sweep pulses are timed against the active sync and
//! mapped linearly across the measured frame width to a raw angle.
//!
//! ## Lock state machine
//!
//! - `Waiting` → `Clustering` on the first sync-class pulse.
//! - `Clustering` → `Synchronized` when the cluster recurs one nominal
//!   frame later with at least `min_cluster_size` agreeing timestamps.
//! - `Synchronized` → `Clustering` when a sync falls outside every expected
//!   window (drift, beacon change). Angles already written for the current
//!   frame stay in the result — output is committed per sweep pulse.
//! - `Clustering` → `Waiting` after `max_unlocked_sync_pulses` without a
//!   cluster; the synchronized-station count drops to zero. Recoverable.

use lh_common::config::V1Config;
use lh_common::consts::{N_BASE_STATIONS, N_SENSORS, N_SWEEPS};
use lh_common::frame::{BaseStationId, FramePayload, PulseFrame, SensorId, SweepAxis, SweepId};
use lh_common::measurement::PulseResult;
use lh_common::timestamp::{ts_add, ts_diff, ts_in_window};
use tracing::{debug, trace, warn};

use crate::history::{PulseClass, PulseHistorySet, PulseSample};
use crate::ootx::OotxSink;

/// Three bits encoded in a V1 sync pulse width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncBits {
    /// Station skips its sweep this frame.
    pub skip: bool,
    /// One OOTX data bit.
    pub data: bool,
    /// Axis the station sweeps this frame.
    pub axis: SweepAxis,
}

/// Decode the `(skip, data, axis)` bits from a sync pulse width.
///
/// The width lattice is `base + step * divider` for `step` in `0..8`;
/// decoding rounds to the nearest step and rejects widths off the lattice
/// ends. Jitter below half a divider step is absorbed by the rounding.
pub fn decode_sync_bits(width: u16, cfg: &V1Config) -> Option<SyncBits> {
    let width = width as u32;
    let base = cfg.sync_base_width as u32;
    let divider = cfg.sync_divider as u32;
    if width + divider / 2 < base {
        return None;
    }
    let step = (width + divider / 2 - base) / divider;
    if step > 7 {
        return None;
    }
    Some(SyncBits {
        skip: step & 0x4 != 0,
        data: step & 0x2 != 0,
        // Axis bit: 0 = x, 1 = y.
        axis: if step & 0x1 != 0 {
            SweepAxis::Y
        } else {
            SweepAxis::X
        },
    })
}

/// Lock state of the sync estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncPhase {
    /// No sync pulse seen yet.
    Waiting,
    /// Accumulating a timestamp cluster, not yet locked.
    Clustering,
    /// Locked onto the periodic sync signal.
    Synchronized,
}

/// V1 protocol processor.
pub struct V1Processor {
    cfg: V1Config,
    history: PulseHistorySet,
    phase: SyncPhase,
    base_stations_synchronized: usize,

    // Cluster accumulation. `sync_sum` and `n_sync_pulses` are always
    // reset together.
    cluster_base: u32,
    sync_sum: u64,
    n_sync_pulses: u32,
    stations_seen: usize,
    last_sync: u32,
    unlocked_sync_pulses: u32,

    // Frame state while synchronized.
    current_sync: u32,
    current_sync0: u32,
    sync0_width: u16,
    sync1_width: u16,
    sync1_seen: bool,
    slot_last_sync: [[Option<u32>; N_SWEEPS]; N_BASE_STATIONS],
    frame_width: [[f32; N_SWEEPS]; N_BASE_STATIONS],
    current: Option<SweepId>,
    sweep_stored: [bool; N_SENSORS],
}

impl V1Processor {
    /// Create a processor in the `Waiting` phase.
    pub fn new(cfg: V1Config) -> Self {
        let nominal = cfg.frame_length as f32;
        Self {
            cfg,
            history: PulseHistorySet::new(),
            phase: SyncPhase::Waiting,
            base_stations_synchronized: 0,
            cluster_base: 0,
            sync_sum: 0,
            n_sync_pulses: 0,
            stations_seen: 0,
            last_sync: 0,
            unlocked_sync_pulses: 0,
            current_sync: 0,
            current_sync0: 0,
            sync0_width: 0,
            sync1_width: 0,
            sync1_seen: false,
            slot_last_sync: [[None; N_SWEEPS]; N_BASE_STATIONS],
            frame_width: [[nominal; N_SWEEPS]; N_BASE_STATIONS],
            current: None,
            sweep_stored: [false; N_SENSORS],
        }
    }

    /// True once locked onto the periodic sync signal.
    #[inline]
    pub fn synchronized(&self) -> bool {
        self.phase == SyncPhase::Synchronized
    }

    /// Base stations contributing sync pulses at the last lock.
    #[inline]
    pub fn base_stations_synchronized(&self) -> usize {
        self.base_stations_synchronized
    }

    /// Station and axis a sweep pulse would currently be attributed to.
    #[inline]
    pub fn current_sweep(&self) -> Option<SweepId> {
        self.current
    }

    /// Measured frame width for a station/axis slot [ticks].
    #[inline]
    pub fn frame_width(&self, id: SweepId) -> f32 {
        self.frame_width[id.base_station as usize][id.axis.index()]
    }

    /// Widths of the current frame's two sync pulses [ticks].
    ///
    /// The second value is zero until the trailing station's sync has been
    /// seen this frame.
    #[inline]
    pub fn current_sync_widths(&self) -> (u16, u16) {
        (
            self.sync0_width,
            if self.sync1_seen { self.sync1_width } else { 0 },
        )
    }

    /// Process one V1 pulse.
    ///
    /// Returns the completed `(base station, axis)` when a sweep angle was
    /// written into `result`; `None` when the pulse only updated internal
    /// state.
    pub fn process(
        &mut self,
        frame: &PulseFrame,
        result: &mut PulseResult,
        ootx: &mut dyn OotxSink,
    ) -> Option<SweepId> {
        let FramePayload::V1 { width } = frame.payload else {
            warn!("V2 frame delivered to a V1 processor instance");
            debug_assert!(false, "protocol mismatch");
            return None;
        };
        if !frame.sensor_in_range() {
            return None;
        }

        self.history.push(frame.sensor, PulseSample {
            timestamp: frame.timestamp,
            width,
        });

        match self.history.classify(frame.sensor, &self.cfg) {
            PulseClass::Unknown => None,
            PulseClass::Sweep => self.process_sweep(frame.sensor, frame.timestamp, result),
            class @ (PulseClass::Sync0 | PulseClass::Sync1) => {
                self.process_sync(class, frame.timestamp, width, ootx);
                None
            }
        }
    }

    // ─── Sync handling ──────────────────────────────────────────────

    fn process_sync(&mut self, class: PulseClass, ts: u32, width: u16, ootx: &mut dyn OotxSink) {
        match self.phase {
            SyncPhase::Waiting => self.start_cluster(ts),
            SyncPhase::Clustering => self.cluster_sync(ts, width, ootx),
            SyncPhase::Synchronized => self.track_sync(class, ts, width, ootx),
        }
    }

    fn start_cluster(&mut self, ts: u32) {
        self.phase = SyncPhase::Clustering;
        self.cluster_base = ts;
        self.sync_sum = 0;
        self.n_sync_pulses = 1;
        self.stations_seen = 1;
        self.last_sync = ts;
    }

    fn cluster_sync(&mut self, ts: u32, width: u16, ootx: &mut dyn OotxSink) {
        self.unlocked_sync_pulses += 1;
        if self.unlocked_sync_pulses > self.cfg.max_unlocked_sync_pulses {
            debug!(
                pulses = self.unlocked_sync_pulses,
                "no sync cluster formed, giving up"
            );
            self.phase = SyncPhase::Waiting;
            self.base_stations_synchronized = 0;
            self.sync_sum = 0;
            self.n_sync_pulses = 0;
            self.stations_seen = 0;
            self.unlocked_sync_pulses = 0;
            return;
        }

        let d_base = ts_diff(ts, self.cluster_base);
        let d_last = ts_diff(ts, self.last_sync);

        if ts_in_window(d_base, self.cfg.frame_length, self.cfg.frame_length_noise)
            && self.n_sync_pulses >= self.cfg.min_cluster_size
        {
            // The cluster recurred one revolution later: accept the lock.
            self.lock(width, ootx);
        } else if d_last <= self.cfg.sync_dispersion {
            // Same emitter seen on another sensor within the dispersion
            // window: fold into the running average.
            self.sync_sum += d_base as u64;
            self.n_sync_pulses += 1;
            self.last_sync = ts;
        } else if ts_in_window(d_base, self.cfg.sync_separation, self.cfg.frame_length_noise) {
            // A second station's sync, one separation after the first.
            self.stations_seen = (self.stations_seen + 1).min(N_BASE_STATIONS);
            self.last_sync = ts;
        } else {
            trace!(d_base, "sync cluster spread exceeded, restarting");
            self.start_cluster(ts);
        }
    }

    /// Accept the cluster. The first frame anchors on the cluster's mean
    /// timestamp projected one nominal revolution forward, so jitter between
    /// the sensors that saw the burst averages out instead of the lock
    /// inheriting the triggering pulse's offset.
    fn lock(&mut self, width: u16, ootx: &mut dyn OotxSink) {
        let mean_offset = (self.sync_sum / self.n_sync_pulses as u64) as u32;
        let anchor = ts_add(
            ts_add(self.cluster_base, mean_offset),
            self.cfg.frame_length,
        );
        self.phase = SyncPhase::Synchronized;
        self.base_stations_synchronized = self.stations_seen;
        self.unlocked_sync_pulses = 0;
        self.sync_sum = 0;
        self.n_sync_pulses = 0;
        debug!(
            stations = self.base_stations_synchronized,
            anchor, "sync lock acquired"
        );
        self.begin_frame(anchor, width, ootx);
    }

    /// While synchronized, place a sync pulse into the expected windows
    /// around the current frame. With several sensors reporting the same
    /// emitter, the timing windows are authoritative; the per-sensor
    /// classification only breaks the tie for off-window pulses.
    fn track_sync(&mut self, class: PulseClass, ts: u32, width: u16, ootx: &mut dyn OotxSink) {
        let d0 = ts_diff(ts, self.current_sync0);

        if d0 <= self.cfg.sync_dispersion {
            // Current sync0 burst seen on another sensor.
            return;
        }
        if ts_in_window(d0, self.cfg.frame_length, self.cfg.frame_length_noise) {
            self.begin_frame(ts, width, ootx);
            return;
        }
        if ts_in_window(d0, self.cfg.sync_separation, self.cfg.frame_length_noise) {
            if self.sync1_seen {
                return;
            }
            self.sync1_seen = true;
            self.sync1_width = width;
            self.apply_sync(1, ts, width, ootx);
            return;
        }

        if class == PulseClass::Sync1 {
            // The sensor's own history pairs this pulse with a sync one
            // separation earlier: a trailing-station echo, not a lost frame
            // reference. Dropped without breaking the lock.
            debug!(d0, "off-window trailing sync dropped");
            return;
        }

        debug!(d0, "sync outside expected windows, resynchronizing");
        self.current = None;
        self.start_cluster(ts);
        self.unlocked_sync_pulses = 0;
    }

    /// Open a new frame on the first station's sync pulse.
    fn begin_frame(&mut self, ts: u32, width: u16, ootx: &mut dyn OotxSink) {
        self.current_sync0 = ts;
        self.sync0_width = width;
        self.sync1_seen = false;
        self.sweep_stored = [false; N_SENSORS];
        self.current = None;
        self.apply_sync(0, ts, width, ootx);
    }

    /// Fold one station's sync into the frame: forward the OOTX bit,
    /// re-estimate the slot's frame width, and select the active sweep
    /// when the station is not skipping.
    fn apply_sync(&mut self, base_station: BaseStationId, ts: u32, width: u16, ootx: &mut dyn OotxSink) {
        let Some(bits) = decode_sync_bits(width, &self.cfg) else {
            return;
        };
        ootx.on_data_bit(base_station, bits.data);
        self.update_frame_width(base_station, bits.axis, ts);
        if !bits.skip {
            self.current = SweepId::new(base_station, bits.axis);
            self.current_sync = ts;
        }
    }

    /// Re-estimate the frame width of a station/axis slot from the spacing
    /// of its consecutive sync pulses. Axes normally alternate per
    /// revolution, so a slot recurs every two frames; a station sweeping
    /// the same axis twice in a row recurs every frame.
    fn update_frame_width(&mut self, base_station: BaseStationId, axis: SweepAxis, ts: u32) {
        let slot = &mut self.slot_last_sync[base_station as usize][axis.index()];
        if let Some(prev) = *slot {
            let measured = ts_diff(ts, prev);
            let nominal = self.cfg.frame_length;
            let noise = self.cfg.frame_length_noise;
            let width = &mut self.frame_width[base_station as usize][axis.index()];
            if ts_in_window(measured, 2 * nominal, 2 * noise) {
                *width = measured as f32 / 2.0;
            } else if ts_in_window(measured, nominal, noise) {
                *width = measured as f32;
            }
        }
        *slot = Some(ts);
    }

    // ─── Sweep handling ─────────────────────────────────────────────

    fn process_sweep(
        &mut self,
        sensor: SensorId,
        ts: u32,
        result: &mut PulseResult,
    ) -> Option<SweepId> {
        if self.phase != SyncPhase::Synchronized {
            return None;
        }
        let id = self.current?;
        if self.sweep_stored[sensor as usize] {
            return None;
        }
        let offset = ts_diff(ts, self.current_sync);
        if offset >= self.cfg.frame_length {
            // Not inside the active frame window.
            return None;
        }

        let angle = self.sweep_angle(id, offset);
        result
            .measurement_mut(sensor, id.base_station)
            .record(id.axis, angle);
        self.sweep_stored[sensor as usize] = true;
        trace!(sensor, offset, angle, "sweep angle stored");
        Some(id)
    }

    /// Map a sweep offset [ticks since the active sync] to a raw angle
    /// [rad], linear across the slot's measured frame width and centered
    /// on the configured sweep center.
    #[inline]
    pub fn sweep_angle(&self, id: SweepId, offset: u32) -> f32 {
        (offset as f32 - self.cfg.sweep_center as f32) * core::f32::consts::TAU
            / self.frame_width(id)
    }
}
