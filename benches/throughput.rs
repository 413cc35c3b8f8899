use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mpsc_ring::channel;
use std::thread;

const MSG_PER_PRODUCER: u64 = 100_000;

fn bench_spsc(c: &mut Criterion) {
    let mut group = c.benchmark_group("spsc");
    group.throughput(Throughput::Elements(MSG_PER_PRODUCER));

    for capacity in [16usize, 256, 4096] {
        group.bench_with_input(
            BenchmarkId::new("blocking_handoff", capacity),
            &capacity,
            |b, &capacity| {
                b.iter(|| {
                    let (tx, mut rx) = channel::<u64>(capacity);

                    let producer = thread::spawn(move || {
                        for i in 0..MSG_PER_PRODUCER {
                            tx.send(i);
                        }
                    });

                    let mut count = 0u64;
                    while let Some(value) = rx.recv() {
                        black_box(value);
                        count += 1;
                    }
                    assert_eq!(count, MSG_PER_PRODUCER);

                    producer.join().unwrap();
                });
            },
        );
    }

    group.finish();
}

fn bench_mpsc(c: &mut Criterion) {
    let mut group = c.benchmark_group("mpsc");

    for n_producers in [2usize, 4, 8] {
        group.throughput(Throughput::Elements(MSG_PER_PRODUCER * n_producers as u64));
        group.bench_with_input(
            BenchmarkId::new("fan_in", n_producers),
            &n_producers,
            |b, &n_producers| {
                b.iter(|| {
                    let (tx, mut rx) = channel::<u64>(4096);

                    let producers: Vec<_> = (0..n_producers)
                        .map(|_| {
                            let tx = tx.clone();
                            thread::spawn(move || {
                                for i in 0..MSG_PER_PRODUCER {
                                    tx.send(i);
                                }
                            })
                        })
                        .collect();
                    drop(tx);

                    let mut count = 0u64;
                    while let Some(value) = rx.recv() {
                        black_box(value);
                        count += 1;
                    }
                    assert_eq!(count, MSG_PER_PRODUCER * n_producers as u64);

                    for p in producers {
                        p.join().unwrap();
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_spsc, bench_mpsc);
criterion_main!(benches);
