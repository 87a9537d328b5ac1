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

//! A sharded concurrent hash table.
//!
//! Entries are spread over a fixed number of shards, each guarded by its own
//! [`RwLock`]. Every single-key operation locks exactly one shard, so the
//! operations below are atomic per key. Whole-table operations visit shards one
//! at a time and are only weakly consistent.
//!
//! While a shard lock is held, the table only calls `Hash`/`Eq` of the key and
//! the predicate handed to the operation. Values that leave the table are
//! always returned to the caller and dropped out of the lock critical section.

use std::{
    fmt::Debug,
    hash::{BuildHasher, Hash},
};

use equivalent::Equivalent;
use hashbrown::hash_table::{Entry, HashTable};
use itertools::Itertools;
use parking_lot::RwLock;

use crate::code::DefaultHasher;

struct Slot<K, V> {
    hash: u64,
    key: K,
    value: V,
}

/// A concurrent hash table with per-shard locking.
pub struct ShardedTable<K, V, S = DefaultHasher> {
    shards: Vec<RwLock<HashTable<Slot<K, V>>>>,
    hash_builder: S,
}

impl<K, V, S> Debug for ShardedTable<K, V, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedTable")
            .field("shards", &self.shards.len())
            .finish()
    }
}

impl<K, V, S> ShardedTable<K, V, S>
where
    S: Default,
{
    /// Create a table with the given shard count and a default hash builder.
    ///
    /// Panics if `shards` is zero.
    pub fn new(shards: usize) -> Self {
        Self::with_hash_builder(shards, S::default())
    }
}

impl<K, V, S> ShardedTable<K, V, S> {
    /// Create a table with the given shard count and hash builder.
    ///
    /// Panics if `shards` is zero.
    pub fn with_hash_builder(shards: usize, hash_builder: S) -> Self {
        assert!(shards > 0, "shards must be greater than zero.");
        let shards = (0..shards).map(|_| RwLock::new(HashTable::new())).collect_vec();
        Self { shards, hash_builder }
    }

    /// Shard count of the table.
    pub fn shards(&self) -> usize {
        self.shards.len()
    }

    /// Entry count of the table.
    ///
    /// Shards are counted one after another, the result may be stale under concurrent mutation.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    /// Return `true` if no shard holds any entry.
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.read().is_empty())
    }

    /// Remove all entries.
    pub fn clear(&self) {
        for shard in self.shards.iter() {
            let garbages = std::mem::take(&mut *shard.write());
            // Deallocate data out of the lock critical section.
            drop(garbages);
        }
    }

    /// Keep only the entries for which `f` returns `true`.
    ///
    /// Removed entries are returned.
    pub fn retain<F>(&self, mut f: F) -> Vec<(K, V)>
    where
        F: FnMut(&K, &V) -> bool,
    {
        let mut garbages = vec![];
        for shard in self.shards.iter() {
            let mut table = shard.write();
            let old = std::mem::take(&mut *table);
            for slot in old {
                if f(&slot.key, &slot.value) {
                    table.insert_unique(slot.hash, slot, |s| s.hash);
                } else {
                    garbages.push((slot.key, slot.value));
                }
            }
        }
        garbages
    }

    /// Remove the first entry, in shard order, for which `f` returns `true`.
    pub fn find_remove<F>(&self, mut f: F) -> Option<(K, V)>
    where
        F: FnMut(&K, &V) -> bool,
    {
        for shard in self.shards.iter() {
            let mut table = shard.write();
            let hash = match table.iter().find(|slot| f(&slot.key, &slot.value)) {
                Some(slot) => slot.hash,
                None => continue,
            };
            // Probe again by hash, the matched slot is still there since the write lock is held.
            if let Ok(entry) = table.find_entry(hash, |slot| f(&slot.key, &slot.value)) {
                let (slot, _) = entry.remove();
                return Some((slot.key, slot.value));
            }
        }
        None
    }

    /// Return `true` if any entry satisfies `f`.
    pub fn any<F>(&self, mut f: F) -> bool
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.shards
            .iter()
            .any(|shard| shard.read().iter().any(|slot| f(&slot.key, &slot.value)))
    }

    /// Clone the entries of a single shard.
    ///
    /// Panics if `index` is out of range.
    pub fn shard_snapshot(&self, index: usize) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.shards[index]
            .read()
            .iter()
            .map(|slot| (slot.key.clone(), slot.value.clone()))
            .collect_vec()
    }

    /// Clone all entries, shard by shard.
    pub fn snapshot(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        (0..self.shards.len())
            .flat_map(|index| self.shard_snapshot(index))
            .collect_vec()
    }

    /// Clone all values, shard by shard.
    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.shards
            .iter()
            .flat_map(|shard| shard.read().iter().map(|slot| slot.value.clone()).collect_vec())
            .collect_vec()
    }

    /// Clone all keys, shard by shard.
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.shards
            .iter()
            .flat_map(|shard| shard.read().iter().map(|slot| slot.key.clone()).collect_vec())
            .collect_vec()
    }
}

impl<K, V, S> ShardedTable<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn hash<Q>(&self, key: &Q) -> u64
    where
        Q: Hash + ?Sized,
    {
        self.hash_builder.hash_one(key)
    }

    fn shard(&self, hash: u64) -> &RwLock<HashTable<Slot<K, V>>> {
        // Use the high half to pick a shard, the low half drives probing within the shard.
        &self.shards[(hash >> 32) as usize % self.shards.len()]
    }

    /// Get a clone of the value of `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        Q: Hash + Equivalent<K> + ?Sized,
        V: Clone,
    {
        self.get_with(key, V::clone)
    }

    /// Apply `f` on the value of `key` under the shard read lock.
    pub fn get_with<Q, F, R>(&self, key: &Q, f: F) -> Option<R>
    where
        Q: Hash + Equivalent<K> + ?Sized,
        F: FnOnce(&V) -> R,
    {
        let hash = self.hash(key);
        self.shard(hash)
            .read()
            .find(hash, |slot| key.equivalent(&slot.key))
            .map(|slot| f(&slot.value))
    }

    /// Return `true` if the table holds an entry for `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.get_with(key, |_| ()).is_some()
    }

    /// Insert or overwrite the value of `key`, returning the previous value.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        let hash = self.hash(&key);
        let mut table = self.shard(hash).write();
        match table.entry(hash, |slot| slot.key == key, |slot| slot.hash) {
            Entry::Occupied(mut o) => Some(std::mem::replace(&mut o.get_mut().value, value)),
            Entry::Vacant(v) => {
                v.insert(Slot { hash, key, value });
                None
            }
        }
    }

    /// Insert `value` only if `key` is absent.
    ///
    /// Returns `Ok(())` if inserted, or `Err((existing, value))` with a clone of the occupying value and the
    /// rejected value.
    pub fn try_insert(&self, key: K, value: V) -> Result<(), (V, V)>
    where
        V: Clone,
    {
        let hash = self.hash(&key);
        let mut table = self.shard(hash).write();
        match table.entry(hash, |slot| slot.key == key, |slot| slot.hash) {
            Entry::Occupied(o) => Err((o.get().value.clone(), value)),
            Entry::Vacant(v) => {
                v.insert(Slot { hash, key, value });
                Ok(())
            }
        }
    }

    /// Insert `value` only if `key` is absent, returning a clone of the occupying value otherwise.
    pub fn put_if_absent(&self, key: K, value: V) -> Option<V>
    where
        V: Clone,
    {
        self.try_insert(key, value).err().map(|(existing, _)| existing)
    }

    /// Overwrite the value of `key` only if present, returning the previous value.
    pub fn replace<Q>(&self, key: &Q, value: V) -> Option<V>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.replace_if(key, |_| true, value).ok()
    }

    /// Atomically overwrite the value of `key` with `value` if the current value satisfies `f`.
    ///
    /// Returns `Ok(previous)` on success, or `Err(value)` with the rejected value when the key is absent or `f`
    /// returns `false`.
    pub fn replace_if<Q, F>(&self, key: &Q, f: F, value: V) -> Result<V, V>
    where
        Q: Hash + Equivalent<K> + ?Sized,
        F: FnOnce(&V) -> bool,
    {
        let hash = self.hash(key);
        let mut table = self.shard(hash).write();
        let slot = match table.find_mut(hash, |slot| key.equivalent(&slot.key)) {
            Some(slot) => slot,
            None => return Err(value),
        };
        if !f(&slot.value) {
            return Err(value);
        }
        Ok(std::mem::replace(&mut slot.value, value))
    }

    /// Remove `key`, returning its value.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.remove_if(key, |_| true)
    }

    /// Atomically remove `key` if its current value satisfies `f`.
    pub fn remove_if<Q, F>(&self, key: &Q, f: F) -> Option<V>
    where
        Q: Hash + Equivalent<K> + ?Sized,
        F: FnOnce(&V) -> bool,
    {
        let hash = self.hash(key);
        let mut table = self.shard(hash).write();
        let entry = table.find_entry(hash, |slot| key.equivalent(&slot.key)).ok()?;
        if !f(&entry.get().value) {
            return None;
        }
        let (slot, _) = entry.remove();
        Some(slot.value)
    }
}
