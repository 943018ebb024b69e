//! Benchmarks for parameter automation.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use vignette::dsp::AudioParam;

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_param(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/param");
    let dt = 1.0 / f64::from(SAMPLE_RATE);

    for &size in BLOCK_SIZES {
        // Gliding toward a target: one f64 exp() per sample
        let mut param = AudioParam::new(440.0);
        param.set_target_at_time(220.0, 0.0, 1.6);
        let mut now = 0.0f64;
        group.bench_with_input(BenchmarkId::new("glide", size), &size, |b, &size| {
            b.iter(|| {
                for _ in 0..size {
                    black_box(param.advance(now));
                    now += dt;
                }
            })
        });
    }

    group.finish();
}
