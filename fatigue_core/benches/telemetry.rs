use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use fatigue_core::{CycleState, EncoderCfg, EncoderTracker, SampleRecord, decode_frame, encode_frame};

// Records that look like a running rig
fn synth_records(n: usize) -> Vec<SampleRecord> {
    (0..n)
        .map(|i| {
            let t = i as f32 / 1000.0;
            SampleRecord {
                cycle: (i / 900) as u32,
                elapsed_micros: ((i % 900) * 1000) as u32,
                force: (t * 7.0).sin() * 10.0,
                position: 20.0 + (t * 3.0).cos() * 20.0,
                state: match i % 4 {
                    0 => CycleState::Fwd,
                    1 => CycleState::Rev,
                    2 => CycleState::RevClear,
                    _ => CycleState::Idle,
                },
            }
        })
        .collect()
}

pub fn bench_codec(c: &mut Criterion) {
    let mut g = c.benchmark_group("telemetry");
    //   BENCH_SAMPLE_SIZE=10 cargo bench -p fatigue_core --bench telemetry
    let sample_size = std::env::var("BENCH_SAMPLE_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(50);
    g.sample_size(sample_size.max(10));

    let recs = synth_records(1_000);
    g.bench_function("encode_1k", |b| {
        b.iter(|| {
            for r in &recs {
                black_box(encode_frame(black_box(r)));
            }
        });
    });

    let frames: Vec<_> = recs.iter().map(encode_frame).collect();
    g.bench_function("decode_1k", |b| {
        b.iter(|| {
            for f in &frames {
                black_box(decode_frame(black_box(f)).ok());
            }
        });
    });

    g.bench_function("encoder_tracker_1k", |b| {
        b.iter_batched(
            || EncoderTracker::new(EncoderCfg::default()),
            |mut t| {
                let mut raw: u16 = 0;
                for _ in 0..1_000 {
                    raw = raw.wrapping_sub(41) % 4096;
                    black_box(t.update(raw));
                }
                t
            },
            BatchSize::SmallInput,
        );
    });
    g.finish();
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
