use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use eventry::{Emitter, EventRegistry};

const BATCH_SIZES: &[usize] = &[64, 256, 1024];
const LISTENERS: usize = 4;

fn emit_throughput(c: &mut Criterion) {
    let registry = EventRegistry::new();
    let ev = registry.mint::<u64>("bench.emit").expect("mint");
    let emitter = Emitter::new();
    for _ in 0..LISTENERS {
        emitter.on(&ev, |value: &u64| {
            std::hint::black_box(*value);
        });
    }

    let mut group = c.benchmark_group("emitter_emit");
    for &batch in BATCH_SIZES {
        group.throughput(Throughput::Elements(batch as u64));
        group.bench_with_input(BenchmarkId::from_parameter(batch), &batch, |b, &size| {
            b.iter(|| {
                for i in 0..size {
                    emitter.emit(&ev, i as u64);
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, emit_throughput);
criterion_main!(benches);
