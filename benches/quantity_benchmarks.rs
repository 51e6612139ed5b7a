use criterion::{black_box, criterion_group, criterion_main, Criterion};
use k8s_capacity::quantity::{format_cpu, format_memory, parse_memory};

fn cpu_formatting_benchmark(c: &mut Criterion) {
    let test_values = vec![0.0, 0.0004, 0.05, 0.12, 0.5, 0.9996, 1.0, 2.4, 16.0];

    c.bench_function("format_cpu", |b| {
        b.iter(|| {
            for value in &test_values {
                let _ = black_box(format_cpu(black_box(*value)));
            }
        })
    });
}

fn memory_formatting_benchmark(c: &mut Criterion) {
    let test_values = vec![0.0, 1.0, 50.0, 200.0, 600.0, 1023.4, 1024.0, 2048.0, 8192.0];

    c.bench_function("format_memory", |b| {
        b.iter(|| {
            for value in &test_values {
                let _ = black_box(format_memory(black_box(*value)));
            }
        })
    });
}

fn memory_parsing_benchmark(c: &mut Criterion) {
    let test_values = vec!["50Mi", "200Mi", "1Gi", "2Gi", "8Gi", "512", "100Mi"];

    c.bench_function("parse_memory", |b| {
        b.iter(|| {
            for value in &test_values {
                let _ = black_box(parse_memory(black_box(value)));
            }
        })
    });
}

criterion_group!(
    benches,
    cpu_formatting_benchmark,
    memory_formatting_benchmark,
    memory_parsing_benchmark
);
criterion_main!(benches);
