// Copyright 2026 memento Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Hit and miss paths of the memoizing and soft value maps.

use std::{hint::black_box, sync::Arc};

use criterion::{criterion_group, criterion_main, Criterion};
use memento_memory::{MemoizingMap, SoftValueMap};
use rand::{rngs::StdRng, Rng, SeedableRng};

const KEYS: u64 = 10_000;

fn bench_memoize(c: &mut Criterion) {
    let map: MemoizingMap<u64, u64> = MemoizingMap::new(|key: &u64| Some(key.wrapping_mul(31)));
    for key in 0..KEYS {
        map.get(&key);
    }
    let mut rng = StdRng::seed_from_u64(42);

    let mut group = c.benchmark_group("memoize");
    group.bench_function("get_hit", |b| b.iter(|| map.get(&black_box(rng.random_range(0..KEYS)))));
    group.bench_function("get_miss", |b| {
        b.iter(|| {
            let key = KEYS + rng.random_range(0..KEYS);
            let value = map.get(&black_box(key));
            map.remove(&key);
            value
        })
    });
    group.finish();
}

fn bench_soft(c: &mut Criterion) {
    let map: SoftValueMap<u64, u64> = SoftValueMap::new();
    for key in 0..KEYS {
        map.put(key, Arc::new(key));
    }
    let reclaimer = map.reclaimer();
    let mut rng = StdRng::seed_from_u64(42);

    let mut group = c.benchmark_group("soft");
    group.bench_function("get_hit", |b| b.iter(|| map.get(&black_box(rng.random_range(0..KEYS)))));
    group.bench_function("put_if_absent_after_reclaim", |b| {
        b.iter(|| {
            let key = rng.random_range(0..KEYS);
            reclaimer.reclaim(&key);
            map.put_if_absent(key, Arc::new(key))
        })
    });
    group.finish();
}

criterion_group!(benches, bench_memoize, bench_soft);
criterion_main!(benches);
