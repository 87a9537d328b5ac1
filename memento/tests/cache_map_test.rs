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

//! Behavioral tests of the public map surface under contention and reclamation.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Barrier,
    },
};

use itertools::Itertools;
use memento::{CapacityPressure, Error, MemoizingMap, MemoizingMapBuilder, SoftValueMap, WeakValueMap};
use rand::{rng, Rng};

const THREADS: usize = 8;
const KEYS: u64 = 128;

#[test_log::test]
fn test_memoize_under_contention() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let map = MemoizingMapBuilder::new()
        .with_shards(4)
        .build(move |key: &u64| {
            counter.fetch_add(1, Ordering::Relaxed);
            Some(Arc::new(key * key))
        })
        .unwrap();
    let barrier = Barrier::new(THREADS);

    let seen = std::thread::scope(|s| {
        let handles = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    (0..KEYS).map(|key| map.get(&key).unwrap()).collect_vec()
                })
            })
            .collect_vec();
        handles.into_iter().map(|h| h.join().unwrap()).collect_vec()
    });

    assert_eq!(map.len(), KEYS as usize);
    for key in 0..KEYS {
        let stored = map.get_if_present(&key).unwrap();
        assert_eq!(*stored, key * key);
        // Every thread observed the single stored value.
        for values in seen.iter() {
            assert!(Arc::ptr_eq(&values[key as usize], &stored));
        }
    }
    let calls = calls.load(Ordering::Relaxed);
    assert!(calls >= KEYS as usize && calls <= KEYS as usize * THREADS, "calls: {calls}");
}

#[test_log::test]
fn test_memoize_views_follow_mutations() {
    let map: MemoizingMap<String, usize> = MemoizingMap::new(|key: &String| Some(key.len()));
    for word in ["a", "bb", "ccc"] {
        map.get(word);
    }
    map.put("none".to_string(), None);

    let keys = map.keys();
    assert_eq!(keys.iter().sorted().collect_vec(), vec!["a", "bb", "ccc", "none"]);
    map.remove("bb");
    assert_eq!(keys.len(), 3);
    assert!(map.values().remove(None));
    assert_eq!(keys.iter().sorted().collect_vec(), vec!["a", "ccc"]);
    assert!(map.entries().remove("a", Some(&1)));
    assert_eq!(map.to_string(), "{ccc=3}");
}

#[test_log::test]
fn test_soft_map_reclaim_protocol() {
    let map: SoftValueMap<String, Vec<u8>> = SoftValueMap::new();
    map.put("a".to_string(), Arc::new(vec![1]));
    map.put("b".to_string(), Arc::new(vec![2]));

    let reclaimer = map.reclaimer();
    assert!(reclaimer.reclaim("a"));
    assert_eq!(map.get("a"), None);
    assert_eq!(reclaimer.pending(), 1);

    assert_eq!(map.len(), 1);
    assert_eq!(reclaimer.pending(), 0);
    assert_eq!(map.put_if_absent("a".to_string(), Arc::new(vec![3])), None);
    assert_eq!(map.get("a").as_deref(), Some(&vec![3]));

    assert_eq!(reclaimer.reclaim_all(), 2);
    assert!(map.values().is_empty());
    assert!(map.is_empty());
    assert_eq!(map.contains_key("a"), Err(Error::Unsupported("contains_key")));
}

#[test_log::test]
fn test_weak_map_follows_holders() {
    let map: WeakValueMap<u64, String> = WeakValueMap::new();
    let held = (0..16).map(|i| Arc::new(format!("v{i}"))).collect_vec();
    for (i, value) in held.iter().enumerate() {
        map.put(i as u64, value.clone());
    }
    let kept = held.into_iter().step_by(4).collect_vec();

    assert_eq!(map.values().len(), kept.len());
    assert_eq!(map.reclaimer().collect(), 12);
    assert_eq!(map.len(), 4);
    assert_eq!(
        map.keys().into_iter().sorted().collect_vec(),
        vec![0, 4, 8, 12]
    );
}

#[test_log::test]
fn test_soft_map_under_pressure_and_contention() {
    const CAPACITY: usize = 32;

    let map: SoftValueMap<u64, u64> = SoftValueMap::builder()
        .with_shards(4)
        .with_pressure(CapacityPressure::new(CAPACITY))
        .build()
        .unwrap();

    std::thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                let mut rng = rng();
                for _ in 0..2048 {
                    let key = rng.random_range(0..KEYS);
                    let value = map.get_or_insert_with(key, |key| Arc::new(key + 1));
                    assert_eq!(*value, key + 1);
                    if rng.random_bool(0.1) {
                        map.reclaimer().reclaim(&key);
                    }
                }
            });
        }
    });

    map.drain();
    let entries = map.entries();
    let keys: HashSet<_> = entries.iter().map(|(key, _)| *key).collect();
    assert_eq!(keys.len(), entries.len());
    for (key, value) in entries {
        assert_eq!(*value, key + 1);
    }
    // Each insertion beyond the capacity reclaims everything, the map never settles above it.
    assert!(map.len() <= CAPACITY + THREADS, "len: {}", map.len());
}

#[test_log::test]
fn test_memoize_over_soft_values() {
    // Memoized descriptors that the host may drop under memory pressure.
    let calls = AtomicUsize::new(0);
    let descriptors: SoftValueMap<&'static str, String> = SoftValueMap::new();
    let describe = |name: &&'static str| {
        calls.fetch_add(1, Ordering::Relaxed);
        Arc::new(format!("descriptor of {name}"))
    };

    assert_eq!(*descriptors.get_or_insert_with("Point", describe), "descriptor of Point");
    assert_eq!(*descriptors.get_or_insert_with("Point", describe), "descriptor of Point");
    assert_eq!(calls.load(Ordering::Relaxed), 1);

    descriptors.reclaimer().reclaim_all();
    assert_eq!(*descriptors.get_or_insert_with("Point", describe), "descriptor of Point");
    assert_eq!(calls.load(Ordering::Relaxed), 2);
}
