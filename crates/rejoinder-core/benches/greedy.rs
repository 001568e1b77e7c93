//! Benchmarks for the decode loop.
//!
//! Measures:
//! - One decoder step per attention variant
//! - Encoding cost as the input grows
//! - A full greedy reply at the default model size

use candle_core::{DType, Device, Tensor};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rejoinder_core::model::{AttentionKind, Batch, ModelConfig, Seq2Seq};
use rejoinder_core::search::GreedySearch;

const VOCAB_SIZE: usize = 7_000;

fn model(attention: AttentionKind) -> Seq2Seq {
    let config = ModelConfig {
        attention,
        ..Default::default()
    };
    Seq2Seq::random(config, VOCAB_SIZE, &Device::Cpu).unwrap()
}

fn input(len: usize) -> Batch {
    let ids: Vec<u32> = (0..len).map(|i| 3 + i as u32).chain([2]).collect();
    Batch::single(&ids, &Device::Cpu).unwrap()
}

fn bench_decoder_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("decoder_step");
    let dev = Device::Cpu;

    for kind in [AttentionKind::Dot, AttentionKind::General, AttentionKind::Concat] {
        let model = model(kind);
        let hidden_size = model.config().hidden_size;
        let token = Tensor::new(&[1u32], &dev).unwrap();
        let hidden = Tensor::zeros((1, 1, hidden_size), DType::F32, &dev).unwrap();
        let outputs = Tensor::randn(0.0f32, 1.0, &[10, 1, hidden_size], &dev).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(kind), &kind, |b, _| {
            b.iter(|| {
                black_box(
                    model
                        .decoder()
                        .step(&token, &hidden, &outputs)
                        .unwrap(),
                )
            });
        });
    }

    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    let model = model(AttentionKind::Dot);

    for len in [1, 5, 10, 20] {
        let batch = input(len);
        group.throughput(Throughput::Elements(len as u64 + 1));
        group.bench_with_input(BenchmarkId::from_parameter(len), &batch, |b, batch| {
            b.iter(|| black_box(model.encoder().encode(batch).unwrap()));
        });
    }

    group.finish();
}

fn bench_greedy_reply(c: &mut Criterion) {
    let mut group = c.benchmark_group("greedy_reply");
    let model = model(AttentionKind::Dot);
    let batch = input(8);

    for max_length in [1, 5, 10] {
        group.bench_with_input(
            BenchmarkId::from_parameter(max_length),
            &max_length,
            |b, &max_length| {
                b.iter(|| {
                    black_box(
                        GreedySearch::new(&model)
                            .generate(&batch, max_length)
                            .unwrap(),
                    )
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_decoder_step, bench_encode, bench_greedy_reply);
criterion_main!(benches);
