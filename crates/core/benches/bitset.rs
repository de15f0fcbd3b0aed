use criterion::{criterion_group, criterion_main, Criterion};
use partition_core::bitset::BitSet;

fn bitset_set_and_test(c: &mut Criterion) {
    let n = 10_000_000usize;

    c.bench_function("bitset/set_unsync", |b| {
        b.iter(|| {
            let set = BitSet::new(n);
            for i in (0..n).step_by(7) {
                set.set_unsync(i);
            }
            set
        })
    });

    let set = BitSet::new(n);
    for i in (0..n).step_by(7) {
        set.set_unsync(i);
    }
    c.bench_function("bitset/test", |b| {
        b.iter(|| {
            let mut count = 0usize;
            for i in 0..n {
                if set.test(i) {
                    count += 1;
                }
            }
            count
        })
    });

    c.bench_function("bitset/popcount", |b| b.iter(|| set.popcount()));
}

criterion_group!(benches, bitset_set_and_test);
criterion_main!(benches);
