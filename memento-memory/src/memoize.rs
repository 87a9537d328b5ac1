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

use std::{
    convert::Infallible,
    fmt::{Debug, Display},
    hash::Hash,
    sync::Arc,
};

use equivalent::Equivalent;
use memento_common::{
    code::{DefaultHasher, HashBuilder, Key, Value},
    table::ShardedTable,
};

use crate::{
    error::{Error, Result},
    view::{Entries, Keys, Values},
};

const DEFAULT_SHARDS: usize = 8;

/// The compute function of a [`MemoizingMap`].
///
/// `Ok(None)` means no value is produced for the key, and nothing is cached.
pub trait Compute<K, V, E>: Fn(&K) -> std::result::Result<Option<V>, E> + Send + Sync + 'static {}
impl<K, V, E, T> Compute<K, V, E> for T where T: Fn(&K) -> std::result::Result<Option<V>, E> + Send + Sync + 'static {}

/// Builder for [`MemoizingMap`].
pub struct MemoizingMapBuilder<S = DefaultHasher> {
    shards: usize,
    hash_builder: S,
}

impl Default for MemoizingMapBuilder<DefaultHasher> {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoizingMapBuilder<DefaultHasher> {
    /// Create a builder with the default shard count and hasher.
    pub fn new() -> Self {
        Self {
            shards: DEFAULT_SHARDS,
            hash_builder: DefaultHasher::default(),
        }
    }
}

impl<S> MemoizingMapBuilder<S>
where
    S: HashBuilder,
{
    /// Set the shard count of the backing table. Operations on different shards can be parallelized.
    pub fn with_shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    /// Set the hash builder used to shard and index keys.
    pub fn with_hash_builder<OS>(self, hash_builder: OS) -> MemoizingMapBuilder<OS>
    where
        OS: HashBuilder,
    {
        MemoizingMapBuilder {
            shards: self.shards,
            hash_builder,
        }
    }

    /// Build a map with an infallible compute function.
    pub fn build<K, V, F>(self, compute: F) -> Result<MemoizingMap<K, V, Infallible, S>>
    where
        K: Key,
        V: Value + Clone,
        F: Fn(&K) -> Option<V> + Send + Sync + 'static,
    {
        self.build_fallible(move |key: &K| Ok::<_, Infallible>(compute(key)))
    }

    /// Build a map whose compute function may fail.
    ///
    /// A failure is returned by [`MemoizingMap::try_get`] and leaves nothing cached.
    pub fn build_fallible<K, V, E, F>(self, compute: F) -> Result<MemoizingMap<K, V, E, S>>
    where
        K: Key,
        V: Value + Clone,
        F: Compute<K, V, E>,
    {
        if self.shards == 0 {
            return Err(Error::config("shards must be greater than zero"));
        }
        Ok(MemoizingMap {
            inner: Arc::new(MemoizingMapInner {
                table: ShardedTable::with_hash_builder(self.shards, self.hash_builder),
                compute: Box::new(compute),
            }),
        })
    }
}

struct MemoizingMapInner<K, V, E, S> {
    // `None` is a stored null, which differs from an absent key.
    table: ShardedTable<K, Option<V>, S>,
    compute: Box<dyn Compute<K, V, E>>,
}

/// A concurrent map that computes values on miss and stores at most one value per key.
///
/// On a miss, [`MemoizingMap::get`] invokes the compute function outside of any lock and offers the result with
/// an insert-if-absent. Concurrent misses on the same key may each invoke the compute function, but only the first
/// inserted value is kept and returned to everyone. The compute function should therefore be idempotent.
///
/// Values are nullable: `put(key, None)` stores a null that is returned as `None` by `get` without invoking the
/// compute function. A compute result of `None` is not cached, so the next `get` computes again.
pub struct MemoizingMap<K, V, E = Infallible, S = DefaultHasher> {
    inner: Arc<MemoizingMapInner<K, V, E, S>>,
}

impl<K, V, E, S> Clone for MemoizingMap<K, V, E, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V> MemoizingMap<K, V>
where
    K: Key,
    V: Value + Clone,
{
    /// Create a map with the default configuration and an infallible compute function.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn(&K) -> Option<V> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(MemoizingMapInner {
                table: ShardedTable::new(DEFAULT_SHARDS),
                compute: Box::new(move |key: &K| Ok::<_, Infallible>(compute(key))),
            }),
        }
    }
}

impl<K, V, S> MemoizingMap<K, V, Infallible, S>
where
    K: Key,
    V: Value + Clone,
    S: HashBuilder,
{
    /// Get the value of `key`, computing and caching it on miss.
    ///
    /// Returns `None` for a stored null or when the compute function produces no value.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "memento::memory::memoize::get"))]
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        Q: Hash + Equivalent<K> + ToOwned<Owned = K> + ?Sized,
    {
        match self.try_get(key) {
            Ok(value) => value,
            Err(e) => match e {},
        }
    }
}

impl<K, V, E, S> MemoizingMap<K, V, E, S>
where
    K: Key,
    V: Value + Clone,
    S: HashBuilder,
{
    /// Get the value of `key`, computing and caching it on miss.
    ///
    /// A compute error is returned as is, and the next call computes again.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "memento::memory::memoize::try_get"))]
    pub fn try_get<Q>(&self, key: &Q) -> std::result::Result<Option<V>, E>
    where
        Q: Hash + Equivalent<K> + ToOwned<Owned = K> + ?Sized,
    {
        if let Some(value) = self.inner.table.get(key) {
            return Ok(value);
        }

        let key = key.to_owned();
        let value = match (self.inner.compute)(&key)? {
            Some(value) => value,
            None => return Ok(None),
        };

        match self.inner.table.try_insert(key, Some(value.clone())) {
            Ok(()) => Ok(Some(value)),
            Err((existing, _)) => {
                tracing::trace!("[memoize]: lost the insertion race, drop the computed value");
                Ok(existing)
            }
        }
    }

    /// Get the stored value of `key` without computing on miss.
    pub fn get_if_present<Q>(&self, key: &Q) -> Option<V>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.inner.table.get(key).flatten()
    }

    /// Store `value` for `key`, returning the previous value.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "memento::memory::memoize::put"))]
    pub fn put(&self, key: K, value: Option<V>) -> Option<V> {
        self.inner.table.insert(key, value).flatten()
    }

    /// Store `value` for `key` only if the key is absent, returning the current value otherwise.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "memento::memory::memoize::put_if_absent"))]
    pub fn put_if_absent(&self, key: K, value: Option<V>) -> Option<V> {
        self.inner.table.put_if_absent(key, value).flatten()
    }

    /// Store every pair of `iter`.
    pub fn extend<I>(&self, iter: I)
    where
        I: IntoIterator<Item = (K, Option<V>)>,
    {
        for (key, value) in iter {
            self.inner.table.insert(key, value);
        }
    }

    /// Remove `key`, returning its value.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "memento::memory::memoize::remove"))]
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.inner.table.remove(key).flatten()
    }

    /// Remove `key` only if it currently maps to `value`.
    pub fn remove_if_eq<Q>(&self, key: &Q, value: Option<&V>) -> bool
    where
        Q: Hash + Equivalent<K> + ?Sized,
        V: PartialEq,
    {
        self.inner.table.remove_if(key, |current| current.as_ref() == value).is_some()
    }

    /// Remove the first entry whose value equals `value`.
    pub fn remove_value(&self, value: Option<&V>) -> bool
    where
        V: PartialEq,
    {
        self.inner
            .table
            .find_remove(|_, current| current.as_ref() == value)
            .is_some()
    }

    /// Overwrite the value of `key` only if the key is present, returning the previous value.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "memento::memory::memoize::replace"))]
    pub fn replace<Q>(&self, key: &Q, value: Option<V>) -> Option<V>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.inner.table.replace(key, value).flatten()
    }

    /// Overwrite the value of `key` with `new` only if it currently maps to `old`.
    pub fn replace_if_eq<Q>(&self, key: &Q, old: Option<&V>, new: Option<V>) -> bool
    where
        Q: Hash + Equivalent<K> + ?Sized,
        V: PartialEq,
    {
        self.inner
            .table
            .replace_if(key, |current| current.as_ref() == old, new)
            .is_ok()
    }

    /// Return `true` if `key` is present, including when it maps to a stored null.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.inner.table.contains_key(key)
    }

    /// Return `true` if any key maps to `value`.
    pub fn contains_value(&self, value: Option<&V>) -> bool
    where
        V: PartialEq,
    {
        self.inner.table.any(|_, current| current.as_ref() == value)
    }

    /// Keep only the entries for which `f` returns `true`.
    pub fn retain<F>(&self, mut f: F)
    where
        F: FnMut(&K, Option<&V>) -> bool,
    {
        let removed = self.inner.table.retain(|key, value| f(key, value.as_ref()));
        drop(removed);
    }

    /// Entry count.
    pub fn len(&self) -> usize {
        self.inner.table.len()
    }

    /// Return `true` if the map holds no entry.
    pub fn is_empty(&self) -> bool {
        self.inner.table.is_empty()
    }

    /// Remove all entries.
    pub fn clear(&self) {
        self.inner.table.clear();
    }

    /// A live view over the keys.
    pub fn keys(&self) -> Keys<'_, K, V, E, S> {
        Keys::new(self)
    }

    /// A live view over the values.
    pub fn values(&self) -> Values<'_, K, V, E, S> {
        Values::new(self)
    }

    /// A live view over the entries.
    pub fn entries(&self) -> Entries<'_, K, V, E, S> {
        Entries::new(self)
    }

    pub(crate) fn table(&self) -> &ShardedTable<K, Option<V>, S> {
        &self.inner.table
    }
}

impl<K, V, E, S> Debug for MemoizingMap<K, V, E, S>
where
    K: Key + Clone + Debug,
    V: Value + Clone + Debug,
    S: HashBuilder,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.inner.table.snapshot()).finish()
    }
}

impl<K, V, E, S> Display for MemoizingMap<K, V, E, S>
where
    K: Key + Clone + Display,
    V: Value + Clone + Display,
    S: HashBuilder,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.inner.table.snapshot().into_iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match value {
                Some(value) => write!(f, "{key}={value}")?,
                None => write!(f, "{key}=null")?,
            }
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use std::{
        panic::AssertUnwindSafe,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Barrier,
        },
    };

    use itertools::Itertools;

    use super::*;

    fn counted_len_map() -> (MemoizingMap<String, usize>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let map = MemoizingMap::new(move |key: &String| {
            counter.fetch_add(1, Ordering::SeqCst);
            Some(key.len())
        });
        (map, calls)
    }

    #[test_log::test]
    fn test_memoize_once() {
        let (map, calls) = counted_len_map();
        assert_eq!(map.get("hello"), Some(5));
        assert_eq!(map.get("hello"), Some(5));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(map.len(), 1);
    }

    #[test_log::test]
    fn test_null_round_trip() {
        let (map, calls) = counted_len_map();
        assert_eq!(map.put("hello".to_string(), None), None);
        assert_eq!(map.get("hello"), None);
        assert!(map.contains_key("hello"));
        assert!(map.contains_value(None));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(map.put("hello".to_string(), Some(1)), None);
        assert_eq!(map.get("hello"), Some(1));
        assert!(!map.contains_value(None));
    }

    #[test_log::test]
    fn test_null_key() {
        let map: MemoizingMap<Option<u64>, u64> = MemoizingMap::new(|key: &Option<u64>| Some(key.unwrap_or(42)));
        assert_eq!(map.get(&None::<u64>), Some(42));
        assert_eq!(map.get(&Some(1)), Some(1));
        assert!(map.contains_key(&None::<u64>));
        assert_eq!(map.remove(&None::<u64>), Some(42));
        assert!(!map.contains_key(&None::<u64>));
    }

    #[test_log::test]
    fn test_no_negative_caching() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let map: MemoizingMap<u64, u64> = MemoizingMap::new(move |_: &u64| {
            counter.fetch_add(1, Ordering::SeqCst);
            None
        });
        assert_eq!(map.get(&1), None);
        assert_eq!(map.get(&1), None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!map.contains_key(&1));
        assert!(map.is_empty());
    }

    #[test_log::test]
    fn test_compute_error_is_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let map = MemoizingMapBuilder::new()
            .build_fallible(move |key: &u64| {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(format!("failed to compute {key}"))
                } else {
                    Ok(Some(*key * 2))
                }
            })
            .unwrap();

        assert_eq!(map.try_get(&21), Err("failed to compute 21".to_string()));
        assert!(!map.contains_key(&21));
        assert_eq!(map.try_get(&21), Ok(Some(42)));
        assert_eq!(map.try_get(&21), Ok(Some(42)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test_log::test]
    fn test_compute_panic_leaves_no_entry() {
        let map: MemoizingMap<u64, u64> = MemoizingMap::new(|key: &u64| {
            if *key == 0 {
                panic!("cannot compute zero");
            }
            Some(*key)
        });
        let res = std::panic::catch_unwind(AssertUnwindSafe(|| map.get(&0)));
        assert!(res.is_err());
        assert!(map.is_empty());
        assert_eq!(map.get(&1), Some(1));
    }

    #[test_log::test]
    fn test_concurrent_memoize() {
        const THREADS: usize = 16;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let map: MemoizingMap<u64, Arc<u64>> = MemoizingMap::new(move |key: &u64| {
            counter.fetch_add(1, Ordering::SeqCst);
            Some(Arc::new(*key + 1))
        });
        let barrier = Barrier::new(THREADS);

        let results = std::thread::scope(|s| {
            let handles = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        map.get(&7).unwrap()
                    })
                })
                .collect_vec();
            handles.into_iter().map(|h| h.join().unwrap()).collect_vec()
        });

        let stored = map.get_if_present(&7).unwrap();
        assert_eq!(*stored, 8);
        for result in results {
            assert!(Arc::ptr_eq(&result, &stored));
        }
        let calls = calls.load(Ordering::SeqCst);
        assert!((1..=THREADS).contains(&calls), "calls: {calls}");
        assert_eq!(map.len(), 1);
    }

    #[test_log::test]
    fn test_mutations() {
        let (map, calls) = counted_len_map();

        assert_eq!(map.put_if_absent("a".to_string(), Some(10)), None);
        assert_eq!(map.put_if_absent("a".to_string(), Some(20)), Some(10));
        assert_eq!(map.replace("a", Some(11)), Some(10));
        assert_eq!(map.replace("b", Some(1)), None);
        assert!(!map.contains_key("b"));

        assert!(!map.replace_if_eq("a", Some(&10), Some(12)));
        assert!(map.replace_if_eq("a", Some(&11), None));
        assert!(map.replace_if_eq("a", None, Some(13)));
        assert_eq!(map.get("a"), Some(13));

        assert!(!map.remove_if_eq("a", Some(&1)));
        assert!(map.remove_if_eq("a", Some(&13)));
        assert!(!map.contains_key("a"));

        map.extend([("x".to_string(), Some(1)), ("y".to_string(), Some(1)), ("z".to_string(), None)]);
        assert_eq!(map.len(), 3);
        assert!(map.remove_value(Some(&1)));
        assert_eq!(map.len(), 2);
        assert!(map.remove_value(None));
        assert!(!map.remove_value(None));
        assert_eq!(map.len(), 1);

        map.retain(|_, _| false);
        assert!(map.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        map.put("q".to_string(), Some(0));
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.get_if_present("q"), None);
    }

    #[test_log::test]
    fn test_display() {
        let map = MemoizingMapBuilder::new()
            .with_shards(1)
            .build(|_: &u64| None::<u64>)
            .unwrap();
        assert_eq!(map.to_string(), "{}");
        map.put(1, None);
        assert_eq!(map.to_string(), "{1=null}");
        map.put(1, Some(2));
        assert_eq!(format!("{map:?}"), "{1: Some(2)}");
    }

    #[test_log::test]
    fn test_zero_shards() {
        let res = MemoizingMapBuilder::new().with_shards(0).build(|_: &u64| Some(0u64));
        assert!(matches!(res, Err(Error::Config(_))));
    }
}
