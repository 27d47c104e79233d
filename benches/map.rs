use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use mmap_flat_map::{DefaultHashBuilder, MmapFlatMap};
use rand::{rngs::StdRng, Rng, SeedableRng};

type Map<'a> = MmapFlatMap<u64, u64, &'a mut [u8]>;

fn backing(items: usize) -> (mmap_flat_map::Geometry, Vec<u64>) {
    let geometry = Map::geometry_for_items(items);
    let len = Map::required_buffer_size(geometry.groups_size_mask());
    (geometry, vec![0; len.div_ceil(8)])
}

fn map_insert(c: &mut Criterion) {
    for items in [1_000, 100_000] {
        c.bench_function(&format!("map insert {items} keys"), |b| {
            b.iter_batched_ref(
                || backing(items),
                |(geometry, buf)| {
                    let mut map =
                        Map::create(bytemuck::cast_slice_mut(buf), *geometry, DefaultHashBuilder)
                            .unwrap();

                    for key in 0..items as u64 {
                        map.insert(key, key);
                    }
                },
                BatchSize::LargeInput,
            );
        });
    }
}

fn map_find(c: &mut Criterion) {
    for items in [1_000, 1_000_000] {
        let (geometry, mut buf) = backing(items);
        let mut map =
            Map::create(bytemuck::cast_slice_mut(&mut buf), geometry, DefaultHashBuilder).unwrap();

        map.extend((0..items as u64).map(|k| (k, k)));

        let mut rng = StdRng::seed_from_u64(42);

        c.bench_function(&format!("map find hit ({items} keys)"), |b| {
            b.iter(|| {
                let key = rng.random_range(0..items as u64);
                assert!(map.get(&key).is_some());
            });
        });

        c.bench_function(&format!("map find miss ({items} keys)"), |b| {
            b.iter(|| {
                let key = rng.random_range(items as u64..u64::MAX);
                assert!(map.get(&key).is_none());
            });
        });
    }
}

fn map_iter(c: &mut Criterion) {
    let (geometry, mut buf) = backing(100_000);
    let mut map =
        Map::create(bytemuck::cast_slice_mut(&mut buf), geometry, DefaultHashBuilder).unwrap();

    map.extend((0..100_000).map(|k| (k, k)));

    c.bench_function("map iter 100000 keys", |b| {
        b.iter(|| map.values().sum::<u64>());
    });
}

criterion_group!(benches, map_insert, map_find, map_iter);
criterion_main!(benches);
