//! Benchmarks for pattern expansion.
//!
//! Uses Criterion with 100+ samples and 95% confidence intervals.
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use prefilter::pattern::ast::{PatternNode, Quantifier};
use prefilter::pattern::expand::expand;
use prefilter::pattern::parser::parse_pattern;

/// `S0? S1? ... Sn-1?`: 2^n special patterns.
fn optional_chain(n: usize) -> PatternNode {
    PatternNode::Concatenation(
        (0..n)
            .map(|i| PatternNode::symbol(format!("S{i}")).quantified(Quantifier::Optional))
            .collect(),
    )
}

fn bench_expand_concatenation(c: &mut Criterion) {
    let mut group = c.benchmark_group("expand_optional_chain");

    for &n in &[2, 4, 8, 12, 16] {
        let node = optional_chain(n);
        group.throughput(Throughput::Elements(1u64 << n));
        // 2^16 patterns per iteration
        if n >= 16 {
            group.sample_size(10);
        }
        group.bench_with_input(BenchmarkId::from_parameter(n), &node, |b, node| {
            b.iter(|| expand(black_box(node)).unwrap());
        });
    }

    group.finish();
}

fn bench_expand_permute(c: &mut Criterion) {
    let mut group = c.benchmark_group("expand_permute");

    for &k in &[2usize, 3, 4, 5, 6, 7] {
        let args = (0..k).map(|i| format!("P{i}")).collect::<Vec<_>>().join(", ");
        let node = parse_pattern(&format!("PERMUTE({args})")).unwrap();
        group.throughput(Throughput::Elements((1..=k as u64).product()));
        group.bench_with_input(BenchmarkId::from_parameter(k), &node, |b, node| {
            b.iter(|| expand(black_box(node)).unwrap());
        });
    }

    group.finish();
}

fn bench_parse_pattern(c: &mut Criterion) {
    let patterns = [
        ("simple", "A B C"),
        ("quantified", "(A* B+) D* C{3,5}"),
        ("nested", "^ (A | B (C D)?)+ {- E -} PERMUTE(F, G*, H) $"),
    ];

    let mut group = c.benchmark_group("parse_pattern");
    for (name, text) in patterns {
        group.bench_with_input(BenchmarkId::from_parameter(name), text, |b, text| {
            b.iter(|| parse_pattern(black_box(text)).unwrap());
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_expand_concatenation,
    bench_expand_permute,
    bench_parse_pattern
);
criterion_main!(benches);
