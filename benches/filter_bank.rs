use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use eqconsole::dsp::Stage;
use eqconsole::eq::DEFAULT_Q;
use eqconsole::eq::bank::FilterBank;
use eqconsole::eq::presets;
use std::hint::black_box;

const SAMPLE_RATE: f32 = 48000.0;

fn build_bank(preset: &str) -> FilterBank {
    let mut bank = FilterBank::new(DEFAULT_Q, SAMPLE_RATE);
    bank.set_gains(&presets::find_or_flat(preset).gains, 0.0);
    bank
}

fn bench_sample_vs_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("Filter Bank Sample vs Block");

    for &buffer_size in &[64usize, 128, 256, 1024] {
        group.bench_with_input(
            BenchmarkId::new("sample-by-sample", buffer_size),
            &buffer_size,
            |b, &buffer_size| {
                let mut bank = build_bank("loudness");
                let input: Vec<f32> = vec![0.5f32; buffer_size];

                b.iter(|| {
                    for &sample in &input {
                        black_box(bank.process(black_box(sample)));
                    }
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("block", buffer_size),
            &buffer_size,
            |b, &buffer_size| {
                let mut bank = build_bank("loudness");
                let mut buffer: Vec<f32> = vec![0.5f32; buffer_size];

                b.iter(|| {
                    bank.process_block(black_box(&mut buffer));
                    black_box(&buffer);
                });
            },
        );
    }

    group.finish();
}

fn bench_ramping_bank(c: &mut Criterion) {
    let mut group = c.benchmark_group("Filter Bank Ramping");

    group.bench_function("preset change every block", |b| {
        let mut bank = build_bank("flat");
        let mut buffer: Vec<f32> = vec![0.5f32; 128];
        let names: Vec<&str> = presets::names().collect();
        let mut i = 0;

        b.iter(|| {
            bank.set_gains(&presets::find_or_flat(names[i % names.len()]).gains, 0.02);
            bank.process_block(black_box(&mut buffer));
            black_box(&buffer);
            i += 1;
        });
    });

    group.finish();
}

criterion_group!(benches, bench_sample_vs_block, bench_ramping_bank);
criterion_main!(benches);
