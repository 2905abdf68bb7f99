//! Protocol dispatch facade.
//!
//! A processor instance speaks exactly one protocol generation, chosen at
//! construction and never switched: the two variants share no runtime state.
//! Call sites stay uniform through the [`ProcessPulse`] capability trait;
//! [`PulseProcessor`] is the enum-discriminated facade over both variants.

use lh_common::config::DecoderConfig;
use lh_common::frame::{PulseFrame, SweepId};
use lh_common::measurement::PulseResult;

use crate::ootx::OotxSink;
use crate::v1::V1Processor;
use crate::v2::V2Processor;

/// Protocol generation of a base station installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Sync-pulse based stations.
    V1,
    /// Per-pulse channel-encoded stations.
    V2,
}

/// Single entry point of a pulse processor.
pub trait ProcessPulse {
    /// Feed one pulse frame.
    ///
    /// Returns `Some(sweep)` when a sweep angle datum was completed and
    /// written into `result`; `None` when the pulse only updated internal
    /// state — the caller must not read `result` as fresh in that case.
    /// Slow-channel bits extracted along the way are forwarded to `ootx`
    /// in timestamp order.
    fn process_pulse(
        &mut self,
        frame: &PulseFrame,
        result: &mut PulseResult,
        ootx: &mut dyn OotxSink,
    ) -> Option<SweepId>;
}

impl ProcessPulse for V1Processor {
    #[inline]
    fn process_pulse(
        &mut self,
        frame: &PulseFrame,
        result: &mut PulseResult,
        ootx: &mut dyn OotxSink,
    ) -> Option<SweepId> {
        self.process(frame, result, ootx)
    }
}

impl ProcessPulse for V2Processor {
    #[inline]
    fn process_pulse(
        &mut self,
        frame: &PulseFrame,
        result: &mut PulseResult,
        ootx: &mut dyn OotxSink,
    ) -> Option<SweepId> {
        self.process(frame, result, ootx)
    }
}

/// Pulse processor for one protocol generation.
pub enum PulseProcessor {
    /// V1 sync state machine.
    V1(V1Processor),
    /// V2 pulse workspace.
    V2(V2Processor),
}

impl PulseProcessor {
    /// Create a processor for the given protocol generation.
    pub fn new(protocol: Protocol, config: &DecoderConfig) -> Self {
        match protocol {
            Protocol::V1 => Self::V1(V1Processor::new(config.v1.clone())),
            Protocol::V2 => Self::V2(V2Processor::new(config.v2.clone())),
        }
    }

    /// Protocol this instance was constructed for.
    #[inline]
    pub fn protocol(&self) -> Protocol {
        match self {
            Self::V1(_) => Protocol::V1,
            Self::V2(_) => Protocol::V2,
        }
    }
}

impl ProcessPulse for PulseProcessor {
    #[inline]
    fn process_pulse(
        &mut self,
        frame: &PulseFrame,
        result: &mut PulseResult,
        ootx: &mut dyn OotxSink,
    ) -> Option<SweepId> {
        match self {
            Self::V1(p) => p.process_pulse(frame, result, ootx),
            Self::V2(p) => p.process_pulse(frame, result, ootx),
        }
    }
}
