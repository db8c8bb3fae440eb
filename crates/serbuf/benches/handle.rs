// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![expect(missing_docs, reason = "Benchmark code")]

use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use serbuf::{AllocHandle, AllocSite, GlobalPool, OutputBuf, Pool, SizeTable};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

fn entrypoint(c: &mut Criterion) {
    let table = SizeTable::shared();

    let mut group = c.benchmark_group("AllocHandle");

    group.bench_function("record_stable", |b| {
        let mut handle = AllocHandle::new(Arc::clone(&table));

        // A write size within the predicted band: the cheapest (and most common) path.
        b.iter(|| {
            handle.record(black_box(400));
            black_box(handle.next_receive_size())
        });
    });

    group.bench_function("record_oscillating", |b| {
        let mut handle = AllocHandle::new(Arc::clone(&table));
        let mut small = true;

        // Alternating small and oversized writes keep the cursor moving.
        b.iter(|| {
            handle.record(black_box(if small { 16 } else { 4096 }));
            small = !small;
            black_box(handle.next_receive_size())
        });
    });

    group.finish();

    let mut group = c.benchmark_group("AllocSite");

    group.bench_function("write_400_bytes_warm", |b| {
        let pool = GlobalPool::new();

        // Pre-warm the pool so the loop measures recycling, not first allocations.
        for _ in 0..4 {
            let segment = pool.allocate(1024).expect("global pool never fails");
            _ = pool.release(segment);
        }

        let mut site = AllocSite::new(pool.clone());
        let payload = [66_u8; 400];

        b.iter(|| {
            let mut buf = site.output_buf().expect("global pool never fails");

            let mut view = buf
                .as_flat_view(Some(payload.len()))
                .expect("global pool never fails");
            view.put_slice(payload);
            drop(view);

            let finished = buf.complete().expect("pooled completion cannot fail");
            let len = black_box(finished.len());

            _ = pool.release(finished);

            len
        });
    });

    group.finish();
}
