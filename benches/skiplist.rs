use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use lexmap::{Config, Direction, SkipList};
use rand::Rng;

fn skiplist_level_probability(c: &mut Criterion) {
    let mut group = c.benchmark_group("skiplist get");

    let mut rng = rand::rng();
    let keys = (0..100_000).map(|_| rng.random::<u64>()).collect::<Vec<_>>();

    for p in [0.25, Config::DEFAULT_LEVEL_PROBABILITY, 0.5] {
        let mut list = SkipList::new(p, Config::DEFAULT_SEED);
        for &key in &keys {
            list.put(key, true);
        }

        group.bench_with_input(BenchmarkId::from_parameter(format!("p={p:.3}")), &list, |b, list| {
            let mut idx = 0;

            b.iter(|| {
                idx = (idx + 1) % keys.len();
                assert!(list.get(&keys[idx]).is_some());
            });
        });
    }
}

fn skiplist_put_remove(c: &mut Criterion) {
    let mut list = SkipList::new(Config::DEFAULT_LEVEL_PROBABILITY, Config::DEFAULT_SEED);
    for key in 0..100_000u64 {
        list.put(key * 2, true);
    }

    c.bench_function("skiplist put + remove", |b| {
        let mut rng = rand::rng();

        b.iter(|| {
            let key = rng.random_range(0..100_000u64) * 2 + 1;
            list.put(key, true);
            list.remove(&key);
        });
    });
}

fn skiplist_cursor(c: &mut Criterion) {
    let mut list = SkipList::new(Config::DEFAULT_LEVEL_PROBABILITY, Config::DEFAULT_SEED);
    for key in 0..100_000u64 {
        list.put(key, true);
    }

    c.bench_function("skiplist cursor 100", |b| {
        b.iter(|| {
            assert_eq!(100, list.cursor_from(&50_000u64, Direction::Backward, 0, 100).count());
        });
    });
}

criterion_group!(
    benches,
    skiplist_level_probability,
    skiplist_put_remove,
    skiplist_cursor
);
criterion_main!(benches);
