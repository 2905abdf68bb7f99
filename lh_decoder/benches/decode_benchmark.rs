//! Hot-path micro-benchmark.
//!
//! Measures per-pulse processing cost for both protocol generations:
//! a locked V1 stream (sync + sweep pulses) and a V2 stream folding sweep
//! blocks every other pulse. The per-event budget is sub-microsecond on
//! the target class of hardware.

use criterion::{Criterion, criterion_group, criterion_main};

use lh_common::config::DecoderConfig;
use lh_common::frame::{ChannelBits, PulseFrame, SweepAxis};
use lh_common::measurement::PulseResult;
use lh_common::timestamp::ts_add;
use lh_decoder::ootx::NullOotx;
use lh_decoder::processor::{ProcessPulse, Protocol, PulseProcessor};

fn sync_width(cfg: &DecoderConfig, step: u16) -> u16 {
    cfg.v1.sync_base_width + step * cfg.v1.sync_divider
}

fn bench_v1_locked_stream(c: &mut Criterion) {
    let cfg = DecoderConfig::default();
    let mut proc = PulseProcessor::new(Protocol::V1, &cfg);
    let mut result = PulseResult::new();
    let mut ootx = NullOotx;

    // Acquire the lock before measuring.
    let w0 = sync_width(&cfg, 0);
    let w1 = sync_width(&cfg, 4);
    let mut t = 1_000u32;
    for _ in 0..4 {
        proc.process_pulse(&PulseFrame::v1(0, t, w0), &mut result, &mut ootx);
        proc.process_pulse(
            &PulseFrame::v1(0, ts_add(t, cfg.v1.sync_separation), w1),
            &mut result,
            &mut ootx,
        );
        t = ts_add(t, cfg.v1.frame_length);
    }

    c.bench_function("v1_locked_revolution", |b| {
        b.iter(|| {
            proc.process_pulse(&PulseFrame::v1(0, t, w0), &mut result, &mut ootx);
            proc.process_pulse(
                &PulseFrame::v1(0, ts_add(t, cfg.v1.sync_separation), w1),
                &mut result,
                &mut ootx,
            );
            for sensor in 0..4u8 {
                proc.process_pulse(
                    &PulseFrame::v1(
                        sensor,
                        ts_add(t, cfg.v1.sweep_center + 5_000),
                        128,
                    ),
                    &mut result,
                    &mut ootx,
                );
            }
            t = ts_add(t, cfg.v1.frame_length);
        })
    });
}

fn bench_v2_block_folding(c: &mut Criterion) {
    let cfg = DecoderConfig::default();
    let mut proc = PulseProcessor::new(Protocol::V2, &cfg);
    let mut result = PulseResult::new();
    let mut ootx = NullOotx;

    let bits = Some(ChannelBits {
        channel: 0,
        slow_bit: false,
    });
    let mut t = 1_000u32;

    c.bench_function("v2_block_fold", |b| {
        b.iter(|| {
            // Sensor 1 parks, sensor 0 folds the block.
            proc.process_pulse(&PulseFrame::v2(1, t, 0, 5_000, bits), &mut result, &mut ootx);
            let matched = proc.process_pulse(
                &PulseFrame::v2(0, ts_add(t, 10), 0, 5_000, bits),
                &mut result,
                &mut ootx,
            );
            // Keep the fold observable so the work is not optimized away.
            std::hint::black_box(matched);
            std::hint::black_box(result.measurement(0, 0).angle(SweepAxis::X));
            t = ts_add(t, 1_000);
        })
    });
}

criterion_group!(benches, bench_v1_locked_stream, bench_v2_block_folding);
criterion_main!(benches);
