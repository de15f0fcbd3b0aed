use criterion::{criterion_group, criterion_main, Criterion};
use partition_core::heap::MinHeap;

fn heap_insert_and_drain(c: &mut Criterion) {
    let n = 200_000u32;

    c.bench_function("heap/insert", |b| {
        b.iter(|| {
            let mut heap = MinHeap::new();
            heap.reserve(n as usize);
            for k in 0..n {
                heap.insert((n - k) * 3, k);
            }
            heap
        })
    });

    c.bench_function("heap/decrease_key_and_drain", |b| {
        b.iter(|| {
            let mut heap = MinHeap::new();
            heap.reserve(n as usize);
            for k in 0..n {
                heap.insert((n - k) * 3, k);
            }
            for k in (0..n).step_by(2) {
                heap.decrease_key(k, 5).unwrap();
            }
            let mut total = 0u64;
            while let Some((value, key)) = heap.get_min() {
                total += value as u64;
                heap.remove(key);
            }
            total
        })
    });
}

criterion_group!(benches, heap_insert_and_drain);
criterion_main!(benches);
