use criterion::{criterion_group, criterion_main, Criterion};
use std::path::Path;

use nthmail::parser::{parse_message, ParseMode};

fn load_fixture(name: &str) -> Vec<u8> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read(path).unwrap()
}

fn bench_headers_only(c: &mut Criterion) {
    let raw = load_fixture("nested_mixed.eml");
    c.bench_function("parse_headers_only", |b| {
        b.iter(|| parse_message(&raw, ParseMode::HeadersOnly).unwrap())
    });
}

fn bench_full_parse(c: &mut Criterion) {
    let raw = load_fixture("nested_mixed.eml");
    c.bench_function("parse_full_nested", |b| {
        b.iter(|| parse_message(&raw, ParseMode::Full).unwrap())
    });
}

criterion_group!(benches, bench_headers_only, bench_full_parse);
criterion_main!(benches);
