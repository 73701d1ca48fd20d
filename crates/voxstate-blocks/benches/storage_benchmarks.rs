use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use voxstate_blocks::*;

fn registry(colors: i32) -> Arc<BlockRegistry> {
    let mut builder = BlockRegistry::builder();
    builder
        .register("core:stone".parse().unwrap(), vec![], vec![])
        .unwrap();
    builder
        .register(
            "core:wool".parse().unwrap(),
            vec![BlockProperty::integer("color", 0, colors - 1)],
            vec![0.into()],
        )
        .unwrap();
    Arc::new(builder.build())
}

fn random_writes(registry: &Arc<BlockRegistry>, count: usize) -> Vec<(i32, i32, i32, usize)> {
    let mut rng = Xoshiro256StarStar::seed_from_u64(0x5EED);
    let states = registry.states().len();
    (0..count)
        .map(|_| {
            (
                rng.gen_range(0..16),
                rng.gen_range(0..16),
                rng.gen_range(0..16),
                rng.gen_range(0..states),
            )
        })
        .collect()
}

fn bench_set_block_same_state(c: &mut Criterion) {
    let registry = registry(16);
    let stone = registry.states()[0].clone();
    c.bench_function("set_block_fill_single_state", |bencher| {
        bencher.iter(|| {
            let mut storage = BlockStorage::new(Arc::clone(&registry));
            for index in 0..REGION_VOLUME as i32 {
                storage
                    .set_block(index & 15, index >> 8, (index >> 4) & 15, Some(&stone))
                    .unwrap();
            }
            black_box(storage.block_count())
        })
    });
}

fn bench_set_block_linear_growth(c: &mut Criterion) {
    let registry = registry(200);
    let writes = random_writes(&registry, REGION_VOLUME);
    c.bench_function("set_block_linear_growth", |bencher| {
        bencher.iter(|| {
            let mut storage = BlockStorage::new(Arc::clone(&registry));
            for &(x, y, z, state) in &writes {
                storage
                    .set_block(x, y, z, Some(&registry.states()[state]))
                    .unwrap();
            }
            black_box(storage.bits_per_block())
        })
    });
}

fn bench_set_block_global_promotion(c: &mut Criterion) {
    let registry = registry(4000);
    let writes = random_writes(&registry, REGION_VOLUME);
    c.bench_function("set_block_global_promotion", |bencher| {
        bencher.iter(|| {
            let mut storage = BlockStorage::new(Arc::clone(&registry));
            for &(x, y, z, state) in &writes {
                storage
                    .set_block(x, y, z, Some(&registry.states()[state]))
                    .unwrap();
            }
            black_box(storage.bits_per_block())
        })
    });
}

fn bench_get_block(c: &mut Criterion) {
    let registry = registry(200);
    let mut storage = BlockStorage::new(Arc::clone(&registry));
    for (x, y, z, state) in random_writes(&registry, REGION_VOLUME) {
        storage
            .set_block(x, y, z, Some(&registry.states()[state]))
            .unwrap();
    }
    c.bench_function("get_block_full_region", |bencher| {
        bencher.iter(|| {
            let mut found = 0usize;
            for index in 0..REGION_VOLUME {
                if storage.block_at(black_box(index)).is_some() {
                    found += 1;
                }
            }
            black_box(found)
        })
    });
}

fn bench_block_count(c: &mut Criterion) {
    let registry = registry(16);
    let mut storage = BlockStorage::new(Arc::clone(&registry));
    let stone = registry.states()[0].clone();
    c.bench_function("block_count_after_write", |bencher| {
        bencher.iter(|| {
            storage.set_block(3, 3, 3, Some(&stone)).unwrap();
            black_box(storage.block_count())
        })
    });
}

fn bench_serialize(c: &mut Criterion) {
    let registry = registry(200);
    let mut storage = BlockStorage::new(Arc::clone(&registry));
    for (x, y, z, state) in random_writes(&registry, REGION_VOLUME) {
        storage
            .set_block(x, y, z, Some(&registry.states()[state]))
            .unwrap();
    }
    let mut buf = Vec::with_capacity(storage.serialized_len());
    c.bench_function("serialize_region", |bencher| {
        bencher.iter(|| {
            buf.clear();
            storage.serialize(&mut buf).unwrap();
            black_box(buf.len())
        })
    });
}

criterion_group!(
    benches,
    bench_set_block_same_state,
    bench_set_block_linear_growth,
    bench_set_block_global_promotion,
    bench_get_block,
    bench_block_count,
    bench_serialize,
);
criterion_main!(benches);
