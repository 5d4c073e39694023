use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Barrier;
use std::thread;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use docstore::{doc, Connection, DocumentStore, Filter, MemoryDriver, UpdateSpec};

const CONCURRENCY_LEVELS: &[usize] = &[1, 4, 8];
const PAYLOAD_SIZE: usize = 256;
const INSERTS_PER_WORKER: usize = 256;
const UPDATES_PER_WORKER: usize = 1024;

static NEXT_DOC_ID: AtomicU64 = AtomicU64::new(0);

fn open_bench_store() -> DocumentStore {
    DocumentStore::open(Connection::new(MemoryDriver::new()), "bench")
}

fn run_insert_batch(store: &DocumentStore, concurrency: usize, payload: &str) {
    let barrier = Barrier::new(concurrency);
    thread::scope(|scope| {
        for worker_id in 0..concurrency {
            let barrier = &barrier;
            scope.spawn(move || {
                let coll = store.collection("inserts");
                barrier.wait();
                for _ in 0..INSERTS_PER_WORKER {
                    let id = NEXT_DOC_ID.fetch_add(1, Ordering::Relaxed);
                    coll.insert(doc! {
                        "_id": format!("w{worker_id}-{id}"),
                        "payload": payload,
                        "k": id as i64,
                    })
                    .expect("insert failed");
                }
            });
        }
    });
}

fn run_update_hotspot(store: &DocumentStore, concurrency: usize) {
    let barrier = Barrier::new(concurrency);
    thread::scope(|scope| {
        for _ in 0..concurrency {
            let barrier = &barrier;
            scope.spawn(move || {
                let coll = store.collection("hot");
                barrier.wait();
                for _ in 0..UPDATES_PER_WORKER {
                    coll.update(Filter::eq("_id", "hot"), UpdateSpec::new().inc("k", 1_i64))
                        .expect("update failed");
                }
            });
        }
    });
}

fn bench_insert_scaling(c: &mut Criterion) {
    let payload = "x".repeat(PAYLOAD_SIZE);
    let mut group = c.benchmark_group("insert_scaling");
    group.sample_size(10);
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(4));

    for &concurrency in CONCURRENCY_LEVELS {
        group.throughput(Throughput::Elements(
            (concurrency * INSERTS_PER_WORKER) as u64,
        ));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("c{concurrency}")),
            &concurrency,
            |b, &concurrency| {
                b.iter_batched(
                    open_bench_store,
                    |store| run_insert_batch(&store, concurrency, &payload),
                    criterion::BatchSize::PerIteration,
                )
            },
        );
    }
    group.finish();
}

fn bench_update_hotspot(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_hotspot");
    group.sample_size(10);
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(4));

    for &concurrency in CONCURRENCY_LEVELS {
        let store = open_bench_store();
        store
            .collection("hot")
            .insert(doc! {"_id": "hot", "k": 0_i64})
            .expect("seed failed");
        group.throughput(Throughput::Elements(
            (concurrency * UPDATES_PER_WORKER) as u64,
        ));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("c{concurrency}")),
            &concurrency,
            |b, &concurrency| b.iter(|| run_update_hotspot(&store, concurrency)),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_insert_scaling, bench_update_hotspot);
criterion_main!(benches);
