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
    fmt::{Debug, Display},
    hash::Hash,
    marker::PhantomData,
    sync::Arc,
};

use equivalent::Equivalent;
use itertools::Itertools;
use memento_common::{
    code::{DefaultHasher, HashBuilder, Key, Value},
    strict_assert_ne,
    table::ShardedTable,
};

use crate::{
    cell::{Cell, CellState},
    error::{Error, Result},
    queue::ReclamationQueue,
    reclaim::{NoPressure, Pressure, Reclaimer},
    reference::{Reference, SoftRef, Strength, WeakRef},
};

const DEFAULT_SHARDS: usize = 8;

/// A reclaimable map whose payloads are cleared only under memory pressure.
pub type SoftValueMap<K, V, S = DefaultHasher> = ReclaimableValueMap<K, V, SoftRef<V>, S>;

/// A reclaimable map whose payloads live only as long as callers hold them.
pub type WeakValueMap<K, V, S = DefaultHasher> = ReclaimableValueMap<K, V, WeakRef<V>, S>;

type CellRef<K, V, R> = Arc<Cell<K, V, R>>;

pub(crate) struct ReclaimableValueMapInner<K, V, R, S> {
    pub(crate) table: ShardedTable<K, CellRef<K, V, R>, S>,
    pub(crate) queue: ReclamationQueue<CellRef<K, V, R>>,
    pressure: Box<dyn Pressure>,
}

impl<K, V, R, S> ReclaimableValueMapInner<K, V, R, S>
where
    K: Key + Clone,
    V: Value,
    R: Reference<V>,
    S: HashBuilder,
{
    /// Reclaim `cell` and report it on the queue if this call performed the transition.
    pub(crate) fn reclaim(&self, cell: CellRef<K, V, R>) -> bool {
        if !cell.reclaim() {
            return false;
        }
        self.queue.push(cell);
        true
    }

    /// Reclaim and report every cell whose payload is already unreachable.
    pub(crate) fn collect(&self) -> usize {
        self.table
            .values()
            .into_iter()
            .filter(|cell| !cell.is_live() && self.reclaim(cell.clone()))
            .count()
    }

    fn drain(&self) -> usize {
        // A weak payload dies with its last holder and nothing reports it, look for dead cells first.
        if R::STRENGTH == Strength::Weak {
            self.collect();
        }
        let mut purged = 0;
        while let Some(cell) = self.queue.pop() {
            // Remove the exact cell only, the key may already be occupied by a fresh one.
            let removed = self
                .table
                .remove_if(cell.key(), |current| Cell::same_instance(current, &cell));
            let state = cell.purge();
            strict_assert_ne!(state, CellState::Live);
            if removed.is_some() {
                purged += 1;
            }
        }
        if purged > 0 {
            tracing::trace!(purged, "[refmap]: purge reclaimed cells");
        }
        purged
    }

    fn relieve(self: &Arc<Self>) {
        let len = self.table.len();
        if !self.pressure.under_pressure(len) {
            return;
        }
        tracing::debug!(len, "[refmap]: under pressure, reclaim payloads");
        self.collect();
        self.drain();
        if self.pressure.under_pressure(self.table.len()) {
            Reclaimer::new(self.clone()).reclaim_all();
            self.drain();
        }
    }
}

/// Builder for [`ReclaimableValueMap`].
pub struct ReclaimableValueMapBuilder<K, V, R, S = DefaultHasher> {
    shards: usize,
    hash_builder: S,
    pressure: Box<dyn Pressure>,
    _marker: PhantomData<fn() -> (K, V, R)>,
}

impl<K, V, R> Default for ReclaimableValueMapBuilder<K, V, R, DefaultHasher> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, R> ReclaimableValueMapBuilder<K, V, R, DefaultHasher> {
    /// Create a builder with the default shard count, hasher and no pressure policy.
    pub fn new() -> Self {
        Self {
            shards: DEFAULT_SHARDS,
            hash_builder: DefaultHasher::default(),
            pressure: Box::new(NoPressure),
            _marker: PhantomData,
        }
    }
}

impl<K, V, R, S> ReclaimableValueMapBuilder<K, V, R, S>
where
    K: Key + Clone,
    V: Value,
    R: Reference<V>,
    S: HashBuilder,
{
    /// Set the shard count of the backing table. Operations on different shards can be parallelized.
    pub fn with_shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    /// Set the hash builder used to shard and index keys.
    pub fn with_hash_builder<OS>(self, hash_builder: OS) -> ReclaimableValueMapBuilder<K, V, R, OS>
    where
        OS: HashBuilder,
    {
        ReclaimableValueMapBuilder {
            shards: self.shards,
            hash_builder,
            pressure: self.pressure,
            _marker: PhantomData,
        }
    }

    /// Set the memory pressure policy consulted after each insertion.
    ///
    /// Under pressure every payload is reclaimed, including the one just inserted, so a successful `put` or
    /// `put_if_absent` may be followed by a `get` of the same key returning `None`.
    ///
    /// The default policy is [`NoPressure`].
    pub fn with_pressure(mut self, pressure: impl Pressure) -> Self {
        self.pressure = Box::new(pressure);
        self
    }

    /// Build the map.
    pub fn build(self) -> Result<ReclaimableValueMap<K, V, R, S>> {
        if self.shards == 0 {
            return Err(Error::config("shards must be greater than zero"));
        }
        Ok(ReclaimableValueMap {
            inner: Arc::new(ReclaimableValueMapInner {
                table: ShardedTable::with_hash_builder(self.shards, self.hash_builder),
                queue: ReclamationQueue::new(),
                pressure: self.pressure,
            }),
        })
    }
}

/// A concurrent map whose values are held through reference cells of a fixed reclaim strength.
///
/// A payload may be reclaimed at any moment, even between two calls of the same thread. A reclaimed payload reads
/// as absent. Reclaimed cells are reported on a reclamation queue, which mutating operations drain before doing
/// their work, so no background thread is involved. A weak map also looks for payloads whose last holder is gone
/// on each drain.
///
/// Keys and values cannot be null. Containment queries are not offered: under concurrent reclamation the answer
/// is stale before the caller can act on it. Use [`ReclaimableValueMap::get`] and treat `None` as absence.
pub struct ReclaimableValueMap<K, V, R, S = DefaultHasher> {
    inner: Arc<ReclaimableValueMapInner<K, V, R, S>>,
}

impl<K, V, R, S> Clone for ReclaimableValueMap<K, V, R, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V, R> ReclaimableValueMap<K, V, R>
where
    K: Key + Clone,
    V: Value,
    R: Reference<V>,
{
    /// Create a map with the default configuration.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ReclaimableValueMapInner {
                table: ShardedTable::new(DEFAULT_SHARDS),
                queue: ReclamationQueue::new(),
                pressure: Box::new(NoPressure),
            }),
        }
    }

    /// Create a builder.
    pub fn builder() -> ReclaimableValueMapBuilder<K, V, R> {
        ReclaimableValueMapBuilder::new()
    }
}

impl<K, V, R> Default for ReclaimableValueMap<K, V, R>
where
    K: Key + Clone,
    V: Value,
    R: Reference<V>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, R, S> ReclaimableValueMap<K, V, R, S>
where
    K: Key + Clone,
    V: Value,
    R: Reference<V>,
    S: HashBuilder,
{
    /// Reclaim strength of the map's references.
    pub fn strength(&self) -> Strength {
        R::STRENGTH
    }

    /// Get the payload of `key`.
    ///
    /// A reclaimed payload reads as `None`. The stale slot is left for the next drain.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "memento::memory::refmap::get"))]
    pub fn get<Q>(&self, key: &Q) -> Option<Arc<V>>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.inner.table.get_with(key, |cell| cell.payload()).flatten()
    }

    /// Store `value` for `key`, returning the previous payload if it was still live.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "memento::memory::refmap::put"))]
    pub fn put(&self, key: K, value: Arc<V>) -> Option<Arc<V>> {
        self.inner.drain();
        let cell = Cell::new(key.clone(), value);
        let previous = self.inner.table.insert(key, cell).and_then(|old| old.payload());
        self.inner.relieve();
        previous
    }

    /// Store `value` for `key` unless a live payload is present, returning that payload otherwise.
    ///
    /// A slot occupied by a reclaimed cell counts as absent: that exact cell is swapped out atomically, and the
    /// operation retries if another thread changed the slot first.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "memento::memory::refmap::put_if_absent"))]
    pub fn put_if_absent(&self, key: K, value: Arc<V>) -> Option<Arc<V>> {
        let cell = Cell::new(key.clone(), value);
        let existing = loop {
            self.inner.drain();
            let occupant = match self.inner.table.try_insert(key.clone(), cell.clone()) {
                Ok(()) => break None,
                Err((occupant, _)) => occupant,
            };
            if let Some(payload) = occupant.payload() {
                break Some(payload);
            }
            if self.replace_dead(&key, &occupant, cell.clone()) {
                break None;
            }
            tracing::trace!("[refmap]: dead slot changed concurrently, retry");
        };
        if existing.is_none() {
            self.inner.relieve();
        }
        existing
    }

    /// Swap the dead `occupant` of `key` for `cell`. Fails if the slot no longer holds that exact cell.
    fn replace_dead(&self, key: &K, occupant: &CellRef<K, V, R>, cell: CellRef<K, V, R>) -> bool {
        match self
            .inner
            .table
            .replace_if(key, |current| Cell::same_instance(current, occupant), cell)
        {
            Ok(dead) => {
                dead.purge();
                true
            }
            Err(_) => false,
        }
    }

    /// Get the payload of `key`, or store the value built by `f` if absent.
    ///
    /// `f` runs outside of any lock and may run on several threads at once for the same key. Only the stored
    /// payload is returned.
    pub fn get_or_insert_with<F>(&self, key: K, f: F) -> Arc<V>
    where
        F: FnOnce(&K) -> Arc<V>,
    {
        if let Some(payload) = self.get(&key) {
            return payload;
        }
        let value = f(&key);
        match self.put_if_absent(key, value.clone()) {
            Some(existing) => existing,
            None => value,
        }
    }

    /// Remove `key`, returning its payload if it was still live.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "memento::memory::refmap::remove"))]
    pub fn remove<Q>(&self, key: &Q) -> Option<Arc<V>>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.inner.drain();
        self.inner.table.remove(key).and_then(|cell| cell.payload())
    }

    /// Remove `key` only if its payload equals `value`.
    pub fn remove_if_eq<Q>(&self, key: &Q, value: &V) -> bool
    where
        Q: Hash + Equivalent<K> + ?Sized,
        V: PartialEq,
    {
        self.inner.drain();
        self.inner
            .table
            .remove_if(key, |cell| cell.payload_equals(value))
            .is_some()
    }

    /// Overwrite the payload of `key` with `new` only if it equals `old`.
    pub fn replace_if_eq(&self, key: &K, old: &V, new: Arc<V>) -> bool
    where
        V: PartialEq,
    {
        self.inner.drain();
        let cell = Cell::new(key.clone(), new);
        self.inner
            .table
            .replace_if(key, |current| current.payload_equals(old), cell)
            .is_ok()
    }

    /// Overwrite the payload of `key` only if a live payload is present, returning it.
    pub fn replace(&self, key: &K, value: Arc<V>) -> Option<Arc<V>> {
        self.inner.drain();
        let cell = Cell::new(key.clone(), value);
        let mut previous = None;
        self.inner
            .table
            .replace_if(
                key,
                |current| {
                    previous = current.payload();
                    previous.is_some()
                },
                cell,
            )
            .ok()?;
        previous
    }

    /// Not supported, always fails with [`Error::Unsupported`].
    ///
    /// Under concurrent reclamation a containment answer is stale before it can be used.
    pub fn contains_key<Q>(&self, _: &Q) -> Result<bool>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        Err(Error::Unsupported("contains_key"))
    }

    /// Not supported, always fails with [`Error::Unsupported`].
    ///
    /// Under concurrent reclamation a containment answer is stale before it can be used.
    pub fn contains_value(&self, _: &V) -> Result<bool> {
        Err(Error::Unsupported("contains_value"))
    }

    /// Approximate entry count, after draining.
    ///
    /// A payload may be reclaimed right after the count is taken.
    pub fn len(&self) -> usize {
        self.inner.drain();
        self.inner.table.len()
    }

    /// Return `true` if the map holds no entry, after draining. Approximate as [`ReclaimableValueMap::len`].
    pub fn is_empty(&self) -> bool {
        self.inner.drain();
        self.inner.table.is_empty()
    }

    /// Remove all entries.
    pub fn clear(&self) {
        self.inner.drain();
        self.inner.table.clear();
    }

    /// Purge every reclaimed cell reported so far, returning the count of removed slots.
    ///
    /// A weak map first reports the cells whose payload has been dropped by every holder.
    ///
    /// Never blocks; notifications reported concurrently may be left for the next drain.
    pub fn drain(&self) -> usize {
        self.inner.drain()
    }

    /// Snapshot of the keys with a live payload.
    pub fn keys(&self) -> Vec<K> {
        self.entries().into_iter().map(|(key, _)| key).collect_vec()
    }

    /// Snapshot of the live payloads. Reclaimed cells are skipped.
    pub fn values(&self) -> Vec<Arc<V>> {
        self.inner
            .table
            .values()
            .into_iter()
            .filter_map(|cell| cell.payload())
            .collect_vec()
    }

    /// Snapshot of the entries with a live payload.
    ///
    /// Keys are snapshotted first, then each one is looked up again, so every pair reflects a payload that was
    /// current when it was read.
    pub fn entries(&self) -> Vec<(K, Arc<V>)> {
        self.inner
            .table
            .keys()
            .into_iter()
            .filter_map(|key| self.get(&key).map(|payload| (key, payload)))
            .collect_vec()
    }

    /// A handle to reclaim payloads of this map.
    pub fn reclaimer(&self) -> Reclaimer<K, V, R, S> {
        Reclaimer::new(self.inner.clone())
    }
}

impl<K, V, R, S> Debug for ReclaimableValueMap<K, V, R, S>
where
    K: Key + Clone + Debug,
    V: Value + Debug,
    R: Reference<V>,
    S: HashBuilder,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.entries()).finish()
    }
}

impl<K, V, R, S> Display for ReclaimableValueMap<K, V, R, S>
where
    K: Key + Clone + Display,
    V: Value + Display,
    R: Reference<V>,
    S: HashBuilder,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries();
        write!(f, "{{")?;
        for (i, (key, value)) in entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        write!(f, "}}")
    }
}
