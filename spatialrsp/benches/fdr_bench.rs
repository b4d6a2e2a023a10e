use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spatialrsp::bh_fdr;
use std::hint::black_box;

/// Mostly null p-values with a small enriched fraction, like a per-gene scan
fn generate_pvalues(n: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..n)
        .map(|i| {
            if i % 20 == 0 {
                rng.random_range(0.0..1e-4)
            } else {
                rng.random::<f64>()
            }
        })
        .collect()
}

fn benchmark_bh_fdr(c: &mut Criterion) {
    let mut group = c.benchmark_group("bh_fdr");

    // grid angles, panels of genes, whole transcriptomes
    for &n in &[360, 2_000, 20_000, 200_000] {
        let pvalues = generate_pvalues(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &pvalues, |b, pvalues| {
            b.iter(|| bh_fdr(black_box(pvalues)))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_bh_fdr);
criterion_main!(benches);
