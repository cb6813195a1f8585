mod common;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use common::{LENGTHS, context, random_operand};

fn bench_reciprocal(c: &mut Criterion) {
    let mut group = c.benchmark_group("newton/reciprocal");
    group.sample_size(10);

    for &nfft in LENGTHS {
        let mut ctx = context(nfft);
        let x = random_operand(&ctx, 11);
        let mut out = ctx.zero().expect("alloc should succeed");
        group.bench_with_input(BenchmarkId::from_parameter(nfft), &nfft, |b, _| {
            b.iter(|| {
                ctx.reciprocal(black_box(&x), &mut out)
                    .expect("reciprocal should succeed");
            })
        });
    }

    group.finish();
}

fn bench_square_root(c: &mut Criterion) {
    let mut group = c.benchmark_group("newton/square_root");
    group.sample_size(10);

    for &nfft in LENGTHS {
        let mut ctx = context(nfft);
        let x = random_operand(&ctx, 12);
        let mut out = ctx.zero().expect("alloc should succeed");
        group.bench_with_input(BenchmarkId::from_parameter(nfft), &nfft, |b, _| {
            b.iter(|| {
                ctx.square_root(black_box(&x), &mut out)
                    .expect("square root should succeed");
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_reciprocal, bench_square_root);
criterion_main!(benches);
