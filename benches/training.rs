use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, SamplingMode, Throughput};
use textbpe::{Trainer, TrainerConfig};

fn build_texts() -> Vec<String> {
    let words = [
        "tokenizer", "merge", "vocabulary", "byte", "pair", "encoding", "天气", "训练", "the",
        "of", "and",
    ];
    (0..256)
        .map(|line| {
            (0..32)
                .map(|i| words[(line * 7 + i * 3) % words.len()])
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

fn bench_training(c: &mut Criterion) {
    let texts = build_texts();
    let total_bytes: usize = texts.iter().map(String::len).sum();
    let cfg = TrainerConfig::builder()
        .target_vocab_size(512)
        .show_progress(false)
        .build()
        .expect("configuration");

    let mut group = c.benchmark_group("train_text_corpus");
    group.throughput(Throughput::Bytes(total_bytes as u64));
    group.sampling_mode(SamplingMode::Flat);
    group.sample_size(10);
    group.bench_function(BenchmarkId::from_parameter("vocab_512"), |b| {
        b.iter(|| {
            let trainer = Trainer::new(cfg.clone());
            let artefacts = trainer.train(&texts).expect("training");
            let _ = black_box(artefacts);
        });
    });
    group.finish();
}

fn bench_encoding(c: &mut Criterion) {
    let texts = build_texts();
    let cfg = TrainerConfig::builder()
        .target_vocab_size(512)
        .special_tokens(["<|endoftext|>"])
        .show_progress(false)
        .build()
        .expect("configuration");
    let tokenizer = Trainer::new(cfg)
        .train(&texts)
        .expect("training")
        .into_tokenizer()
        .expect("tokenizer");
    let sample = texts.join("<|endoftext|>");

    let mut group = c.benchmark_group("encode_text");
    group.throughput(Throughput::Bytes(sample.len() as u64));
    group.bench_function("encode", |b| {
        b.iter(|| black_box(tokenizer.encode_ids(black_box(&sample))));
    });
    let ids = tokenizer.encode_ids(&sample);
    group.bench_function("decode", |b| {
        b.iter(|| black_box(tokenizer.decode(black_box(&ids)).expect("decode")));
    });
    group.finish();
}

criterion_group!(benches, bench_training, bench_encoding);
criterion_main!(benches);
