//! Benchmarks for the complete chord pad.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use vignette::{
    ambience::{chord_at, SynthesisGraph},
    config::PadConfig,
    host::render::Renderer,
};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_pad(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/pad");
    let pad = PadConfig::default();

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // === STEADY CHORD ===
        // three voices → low-pass → master, faded in
        let mut renderer = Renderer::new(SAMPLE_RATE);
        let graph = SynthesisGraph::build(&mut renderer, &pad).expect("pad graph builds");
        let _ = graph.ramp_master(&mut renderer, pad.target_gain, 0.01);

        group.bench_with_input(BenchmarkId::new("steady", size), &size, |b, _| {
            b.iter(|| {
                renderer.render_block(black_box(&mut buffer));
            })
        });

        // === CHORD CHANGE ===
        // retune every block so all three frequencies are always gliding
        let mut renderer = Renderer::new(SAMPLE_RATE);
        let graph = SynthesisGraph::build(&mut renderer, &pad).expect("pad graph builds");
        let _ = graph.ramp_master(&mut renderer, pad.target_gain, 0.01);
        let mut index = 0usize;

        group.bench_with_input(BenchmarkId::new("gliding", size), &size, |b, _| {
            b.iter(|| {
                index += 1;
                let _ = graph.retune(&mut renderer, chord_at(index), pad.glide_secs);
                renderer.render_block(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
