use core_config::Template;
use core_match::rank;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn library(n: usize) -> Vec<Template> {
    (0..n)
        .map(|i| {
            Template::new(
                format!("t{i}"),
                format!("Prompt number {i} about topic {}", i % 37),
                format!("Please write [kind:summary] of {{subject}} variant {i}\nwith detail"),
            )
        })
        .collect()
}

fn bench_rank(c: &mut Criterion) {
    let lib = library(5_000);
    c.bench_function("rank_empty_query", |b| b.iter(|| rank(black_box(""), &lib).len()));
    c.bench_function("rank_word_prefix", |b| b.iter(|| rank(black_box("top"), &lib).len()));
    c.bench_function("rank_exact_name", |b| {
        b.iter(|| rank(black_box("prompt number 42 about topic 5"), &lib).len())
    });
}

criterion_group!(benches, bench_rank);
criterion_main!(benches);
