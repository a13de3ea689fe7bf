use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use phylopotts_align::{column_pairwise_scores, gap_fraction_profile, SubstitutionMatrix};
use phylopotts_seq::{FastaRecord, Msa};

fn random_alignment(n_seqs: usize, width: usize) -> Msa {
    let symbols = b"-ACDEFGHIKLMNPQRSTVWY";
    // Fixed LCG so runs are comparable
    let mut state: u64 = 7;
    let records = (0..n_seqs)
        .map(|i| {
            let seq: Vec<u8> = (0..width)
                .map(|_| {
                    state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                    symbols[((state >> 33) % symbols.len() as u64) as usize]
                })
                .collect();
            FastaRecord::new(format!("seq_{i}"), seq)
        })
        .collect();
    Msa::new(records).unwrap()
}

fn bench_summary(c: &mut Criterion) {
    let matrix = SubstitutionMatrix::blosum62();
    let mut group = c.benchmark_group("summary");

    for &(n, w) in &[(100, 200), (1000, 500)] {
        let msa = random_alignment(n, w);
        let label = format!("{n}x{w}");

        group.bench_with_input(BenchmarkId::new("gap_profile", &label), &msa, |b, msa| {
            b.iter(|| gap_fraction_profile(black_box(msa)))
        });

        group.bench_with_input(BenchmarkId::new("column_scores", &label), &msa, |b, msa| {
            b.iter(|| column_pairwise_scores(black_box(msa), &matrix))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_summary);
criterion_main!(benches);
