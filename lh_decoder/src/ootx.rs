//! Forwarding seam toward the OOTX decoder collaborator.
//!
//! Both protocols piggyback a slow data channel on the pulse stream: V1
//! encodes one bit per sync pulse in the pulse width, V2 carries an explicit
//! slow bit per decoded pulse. The decoder forwards those bits here, keyed
//! by base station, in timestamp order, without dropping or reordering.
//! Decoding the OOTX payload itself happens outside this crate.

use lh_common::frame::BaseStationId;

/// Receiver of slow-channel data bits, one stream per base station.
pub trait OotxSink {
    /// One slow-channel bit extracted from a pulse of `base_station`'s
    /// sync stream (V1) or beam data (V2).
    fn on_data_bit(&mut self, base_station: BaseStationId, bit: bool);
}

/// Sink that discards all bits, for callers that do not decode OOTX.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullOotx;

impl OotxSink for NullOotx {
    #[inline]
    fn on_data_bit(&mut self, _base_station: BaseStationId, _bit: bool) {}
}
