//! V2 base station processing: self-describing pulse workspace.
//!
//! V2 base stations emit no sync pulses. Every pulse carries its phase
//! within the rotor revolution (`offset`) and, when beam demodulation
//! succeeded, the emitting channel and one slow-channel bit. Channel
//! demodulation is best-effort in the driver and may fail silently, leaving
//! the channel unset — such pulses only park data in the workspace and can
//! never complete a sweep block.
//!
//! Pulses accumulate in a per-sensor workspace. When a channel-decoded
//! pulse arrives and enough sensors hold matching in-window data, the
//! workspace is folded into a [`SweepBlock`] and per-sensor angles are
//! written to the result. Entries older than one rotation period are
//! dropped, never merged across revolutions.

use lh_common::config::V2Config;
use lh_common::consts::{N_BASE_STATIONS, N_SENSORS};
use lh_common::frame::{ChannelBits, FramePayload, PulseFrame, SweepAxis, SweepId};
use lh_common::measurement::PulseResult;
use lh_common::timestamp::ts_diff;
use tracing::{trace, warn};

use crate::ootx::OotxSink;

/// One parked pulse in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WorkspaceSlot {
    timestamp: u32,
    offset: u32,
    /// Channel and slow bit when demodulation succeeded for this pulse.
    channel: Option<ChannelBits>,
}

/// Data for one sweep through the sensors, folded from workspace pulses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepBlock {
    /// Per-sensor sweep offsets [ticks]; zero for sensors that did not
    /// contribute.
    pub offsets: [u32; N_SENSORS],
    /// Which sensors contributed.
    pub populated: [bool; N_SENSORS],
    /// Timestamp of sensor 0's pulse.
    pub timestamp: u32,
    /// Emitting channel, zero indexed.
    pub channel: u8,
    /// Slow-channel bit of the triggering pulse.
    pub slow_bit: bool,
}

/// V2 protocol processor.
pub struct V2Processor {
    cfg: V2Config,
    slots: [Option<WorkspaceSlot>; N_SENSORS],
    latest_timestamp: u32,
    /// Most recent completed block per base station.
    blocks: [Option<SweepBlock>; N_BASE_STATIONS],
}

impl V2Processor {
    /// Create an empty workspace.
    pub fn new(cfg: V2Config) -> Self {
        Self {
            cfg,
            slots: [None; N_SENSORS],
            latest_timestamp: 0,
            blocks: [None; N_BASE_STATIONS],
        }
    }

    /// Most recent completed sweep block for a base station.
    #[inline]
    pub fn block(&self, base_station: u8) -> Option<&SweepBlock> {
        self.blocks
            .get(base_station as usize)
            .and_then(Option::as_ref)
    }

    /// Process one V2 pulse.
    ///
    /// Returns the completed `(base station, axis)` when a sweep block was
    /// folded and angles written into `result`; `None` when the pulse only
    /// updated workspace state.
    pub fn process(
        &mut self,
        frame: &PulseFrame,
        result: &mut PulseResult,
        ootx: &mut dyn OotxSink,
    ) -> Option<SweepId> {
        let FramePayload::V2 {
            offset, channel, ..
        } = frame.payload
        else {
            warn!("V1 frame delivered to a V2 processor instance");
            debug_assert!(false, "protocol mismatch");
            return None;
        };
        if !frame.sensor_in_range() {
            return None;
        }

        // Events arrive in timestamp order (driver contract), so the
        // incoming pulse is the newest.
        self.latest_timestamp = frame.timestamp;
        self.drop_stale_slots();

        if let Some(bits) = channel {
            if bits.channel as usize >= N_BASE_STATIONS {
                trace!(channel = bits.channel, "channel beyond tracked stations, dropped");
                return None;
            }
            ootx.on_data_bit(bits.channel, bits.slow_bit);
        }

        self.slots[frame.sensor as usize] = Some(WorkspaceSlot {
            timestamp: frame.timestamp,
            offset,
            channel,
        });

        let bits = channel?;
        self.try_fold_block(bits, result)
    }

    /// Drop workspace entries older than one rotation period relative to
    /// the latest timestamp. Stale data is discarded, never merged into a
    /// block from a later revolution.
    fn drop_stale_slots(&mut self) {
        for slot in &mut self.slots {
            if let Some(s) = slot {
                if ts_diff(self.latest_timestamp, s.timestamp) > self.cfg.rotation_period {
                    *slot = None;
                }
            }
        }
    }

    /// Fold the workspace into a sweep block for the triggering pulse's
    /// channel, if enough sensors contributed.
    ///
    /// A contributing slot either decoded the same channel or decoded no
    /// channel at all (same sweep window, demodulation failed on that
    /// sensor); slots that decoded a different channel are excluded.
    /// Sensor 0 must contribute — the block timestamp is sensor 0's.
    fn try_fold_block(&mut self, bits: ChannelBits, result: &mut PulseResult) -> Option<SweepId> {
        let mut contributing = [false; N_SENSORS];
        let mut count = 0usize;
        for (i, slot) in self.slots.iter().enumerate() {
            let Some(s) = slot else { continue };
            let matches = match s.channel {
                Some(c) => c.channel == bits.channel,
                None => true,
            };
            if matches {
                contributing[i] = true;
                count += 1;
            }
        }

        if !contributing[0] || count < self.cfg.min_block_sensors as usize {
            return None;
        }

        let mut offsets = [0u32; N_SENSORS];
        let mut timestamp = 0u32;
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if !contributing[i] {
                continue;
            }
            if let Some(s) = slot.take() {
                offsets[i] = s.offset;
                if i == 0 {
                    timestamp = s.timestamp;
                }
            }
        }

        let block = SweepBlock {
            offsets,
            populated: contributing,
            timestamp,
            channel: bits.channel,
            slow_bit: bits.slow_bit,
        };
        let id = self.store_block(&block, result)?;
        self.blocks[bits.channel as usize] = Some(block);
        trace!(
            channel = bits.channel,
            sensors = count,
            "sweep block folded"
        );
        Some(id)
    }

    /// Derive the axis and per-sensor angles from a block and write them
    /// into the result.
    fn store_block(&self, block: &SweepBlock, result: &mut PulseResult) -> Option<SweepId> {
        let half = self.cfg.rotation_period / 2;
        // First half of the revolution sweeps x, second half sweeps y.
        let axis = if block.offsets[0] < half {
            SweepAxis::X
        } else {
            SweepAxis::Y
        };
        let id = SweepId::new(block.channel, axis)?;

        for sensor in 0..N_SENSORS {
            if !block.populated[sensor] {
                continue;
            }
            let angle = self.sweep_angle(axis, block.offsets[sensor]);
            result
                .measurement_mut(sensor as u8, id.base_station)
                .record(axis, angle);
        }
        Some(id)
    }

    /// Map a sweep offset to a raw angle [rad]: the offset's fraction of
    /// the rotation period scaled to a full turn, folded per axis.
    #[inline]
    pub fn sweep_angle(&self, axis: SweepAxis, offset: u32) -> f32 {
        let period = self.cfg.rotation_period as f32;
        let folded = match axis {
            SweepAxis::X => offset as f32,
            SweepAxis::Y => offset as f32 - period / 2.0,
        };
        folded * core::f32::consts::TAU / period
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ootx::NullOotx;

    fn cfg() -> V2Config {
        V2Config::default()
    }

    fn bits(channel: u8) -> Option<ChannelBits> {
        Some(ChannelBits {
            channel,
            slow_bit: false,
        })
    }

    #[test]
    fn undecoded_pulse_never_completes_a_block() {
        let mut proc = V2Processor::new(cfg());
        let mut result = PulseResult::new();
        let mut ootx = NullOotx;

        for sensor in 0..N_SENSORS as u8 {
            let matched = proc.process(
                &PulseFrame::v2(sensor, 1_000 + sensor as u32, 0, 5_000, None),
                &mut result,
                &mut ootx,
            );
            assert!(matched.is_none());
        }
        for sensor in 0..N_SENSORS as u8 {
            assert_eq!(result.measurement(sensor, 0).valid_count(), 0);
        }
    }

    #[test]
    fn block_completes_with_enough_sensors() {
        let mut proc = V2Processor::new(cfg());
        let mut result = PulseResult::new();
        let mut ootx = NullOotx;

        // Sensor 1 parks first; sensor 0's decoded pulse folds the block.
        assert!(proc
            .process(
                &PulseFrame::v2(1, 2_000, 0, 5_000, bits(0)),
                &mut result,
                &mut ootx,
            )
            .is_none());
        let matched = proc.process(
            &PulseFrame::v2(0, 2_010, 0, 5_100, bits(0)),
            &mut result,
            &mut ootx,
        );

        assert_eq!(matched, SweepId::new(0, SweepAxis::X));
        assert_eq!(result.measurement(0, 0).valid_count(), 1);
        assert_eq!(result.measurement(1, 0).valid_count(), 1);
    }

    #[test]
    fn block_timestamp_is_sensor_zeros() {
        let mut proc = V2Processor::new(cfg());
        let mut result = PulseResult::new();
        let mut ootx = NullOotx;

        proc.process(
            &PulseFrame::v2(1, 9_999, 0, 5_000, bits(0)),
            &mut result,
            &mut ootx,
        );
        proc.process(
            &PulseFrame::v2(0, 10_123, 0, 5_000, bits(0)),
            &mut result,
            &mut ootx,
        );

        let block = proc.block(0).unwrap();
        assert_eq!(block.timestamp, 10_123);
        assert!(block.populated[0] && block.populated[1]);
    }

    #[test]
    fn consumed_slots_are_cleared() {
        let mut proc = V2Processor::new(cfg());
        let mut result = PulseResult::new();
        let mut ootx = NullOotx;

        proc.process(
            &PulseFrame::v2(1, 1_000, 0, 5_000, bits(0)),
            &mut result,
            &mut ootx,
        );
        assert!(proc
            .process(
                &PulseFrame::v2(0, 1_010, 0, 5_000, bits(0)),
                &mut result,
                &mut ootx,
            )
            .is_some());
        // The workspace was consumed: the next decoded pulse stands alone
        // and cannot fold another block at the default sensor minimum.
        assert!(proc
            .process(
                &PulseFrame::v2(0, 1_020, 0, 5_000, bits(0)),
                &mut result,
                &mut ootx,
            )
            .is_none());
    }

    #[test]
    fn stale_entries_are_dropped_not_merged() {
        let c = cfg();
        let mut proc = V2Processor::new(c.clone());
        let mut result = PulseResult::new();
        let mut ootx = NullOotx;

        proc.process(
            &PulseFrame::v2(1, 1_000, 0, 5_000, bits(0)),
            &mut result,
            &mut ootx,
        );
        // More than one rotation later: sensor 1's entry is stale.
        let late = 1_000 + c.rotation_period + 1_000;
        let matched = proc.process(
            &PulseFrame::v2(0, late, 0, 5_000, bits(0)),
            &mut result,
            &mut ootx,
        );
        assert!(matched.is_none());
    }

    #[test]
    fn mismatched_channels_do_not_mix() {
        let mut proc = V2Processor::new(cfg());
        let mut result = PulseResult::new();
        let mut ootx = NullOotx;

        proc.process(
            &PulseFrame::v2(1, 1_000, 0, 5_000, bits(1)),
            &mut result,
            &mut ootx,
        );
        let matched = proc.process(
            &PulseFrame::v2(0, 1_010, 0, 5_000, bits(0)),
            &mut result,
            &mut ootx,
        );
        assert!(matched.is_none());
    }

    #[test]
    fn out_of_range_channel_is_dropped() {
        let mut proc = V2Processor::new(cfg());
        let mut result = PulseResult::new();
        let mut ootx = NullOotx;

        let matched = proc.process(
            &PulseFrame::v2(0, 1_000, 0, 5_000, bits(7)),
            &mut result,
            &mut ootx,
        );
        assert!(matched.is_none());
        assert!(proc.block(0).is_none());
    }

    #[test]
    fn second_half_offset_maps_to_y_axis() {
        let c = cfg();
        let mut proc = V2Processor::new(c.clone());
        let mut result = PulseResult::new();
        let mut ootx = NullOotx;

        let offset = c.rotation_period / 2 + 40_000;
        proc.process(
            &PulseFrame::v2(1, 1_000, 0, offset, bits(0)),
            &mut result,
            &mut ootx,
        );
        let matched = proc.process(
            &PulseFrame::v2(0, 1_010, 0, offset, bits(0)),
            &mut result,
            &mut ootx,
        );

        assert_eq!(matched, SweepId::new(0, SweepAxis::Y));
        let m = result.measurement(0, 0);
        assert!(m.angle(SweepAxis::Y).is_some());
        assert!(m.angle(SweepAxis::X).is_none());
    }
}
