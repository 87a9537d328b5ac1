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

//! Live views over a [`MemoizingMap`].
//!
//! A view borrows the map and reads through to it, so mutations made through the map or other views are
//! observed. Iteration visits the backing shards one after another and clones the entries of a shard when it
//! enters it, the same weakly consistent semantics as the map's whole-table operations.

use std::hash::Hash;

use equivalent::Equivalent;
use memento_common::{
    code::{HashBuilder, Key, Value},
    table::ShardedTable,
};

use crate::memoize::MemoizingMap;

/// Iterator over the entries of a [`MemoizingMap`], shard by shard.
pub struct Iter<'a, K, V, S> {
    table: &'a ShardedTable<K, Option<V>, S>,
    shard: usize,
    buffer: std::vec::IntoIter<(K, Option<V>)>,
}

impl<'a, K, V, S> Iter<'a, K, V, S> {
    fn new(table: &'a ShardedTable<K, Option<V>, S>) -> Self {
        Self {
            table,
            shard: 0,
            buffer: Vec::new().into_iter(),
        }
    }
}

impl<K, V, S> Iterator for Iter<'_, K, V, S>
where
    K: Clone,
    V: Clone,
{
    type Item = (K, Option<V>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.next() {
                return Some(item);
            }
            if self.shard >= self.table.shards() {
                return None;
            }
            self.buffer = self.table.shard_snapshot(self.shard).into_iter();
            self.shard += 1;
        }
    }
}

macro_rules! view {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        pub struct $name<'a, K, V, E, S> {
            map: &'a MemoizingMap<K, V, E, S>,
        }

        impl<'a, K, V, E, S> $name<'a, K, V, E, S>
        where
            K: Key,
            V: Value + Clone,
            S: HashBuilder,
        {
            pub(crate) fn new(map: &'a MemoizingMap<K, V, E, S>) -> Self {
                Self { map }
            }

            /// Entry count of the underlying map.
            pub fn len(&self) -> usize {
                self.map.len()
            }

            /// Return `true` if the underlying map is empty.
            pub fn is_empty(&self) -> bool {
                self.map.is_empty()
            }

            /// Remove all entries of the underlying map.
            pub fn clear(&self) {
                self.map.clear()
            }
        }
    };
}

view!(Keys, "A live view over the keys of a [`MemoizingMap`].");
view!(Values, "A live view over the values of a [`MemoizingMap`]. A stored null is yielded as `None`.");
view!(Entries, "A live view over the entries of a [`MemoizingMap`].");

impl<'a, K, V, E, S> Keys<'a, K, V, E, S>
where
    K: Key + Clone,
    V: Value + Clone,
    S: HashBuilder,
{
    /// Iterate over the keys.
    pub fn iter(&self) -> impl Iterator<Item = K> + 'a {
        Iter::new(self.map.table()).map(|(key, _)| key)
    }

    /// Return `true` if `key` is present.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Remove `key` from the underlying map.
    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.map.table().remove(key).is_some()
    }

    /// Keep only the keys for which `f` returns `true`.
    pub fn retain<F>(&self, mut f: F)
    where
        F: FnMut(&K) -> bool,
    {
        self.map.retain(|key, _| f(key))
    }
}

impl<'a, K, V, E, S> Values<'a, K, V, E, S>
where
    K: Key + Clone,
    V: Value + Clone + PartialEq,
    S: HashBuilder,
{
    /// Iterate over the values.
    pub fn iter(&self) -> impl Iterator<Item = Option<V>> + 'a {
        Iter::new(self.map.table()).map(|(_, value)| value)
    }

    /// Return `true` if any key maps to `value`.
    pub fn contains(&self, value: Option<&V>) -> bool {
        self.map.contains_value(value)
    }

    /// Remove the first entry whose value equals `value`.
    pub fn remove(&self, value: Option<&V>) -> bool {
        self.map.remove_value(value)
    }
}

impl<'a, K, V, E, S> Entries<'a, K, V, E, S>
where
    K: Key + Clone,
    V: Value + Clone + PartialEq,
    S: HashBuilder,
{
    /// Iterate over the entries.
    pub fn iter(&self) -> Iter<'a, K, V, S> {
        Iter::new(self.map.table())
    }

    /// Return `true` if `key` currently maps to `value`.
    pub fn contains<Q>(&self, key: &Q, value: Option<&V>) -> bool
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.map
            .table()
            .get_with(key, |current| current.as_ref() == value)
            .unwrap_or_default()
    }

    /// Remove `key` only if it currently maps to `value`.
    pub fn remove<Q>(&self, key: &Q, value: Option<&V>) -> bool
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.map.remove_if_eq(key, value)
    }
}
