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

//! The reclaimer stands in for a garbage collector.
//!
//! A [`Reclaimer`] moves cells from `Live` to `Reclaimed` and reports each of them on the map's reclamation queue.
//! When that happens is decided outside of the map: by whoever holds a reclaimer handle (for example a memory
//! pressure signal of the host process), or by the map's [`Pressure`] policy after an insertion. Reclamation is
//! unordered relative to every other map operation.

use std::{fmt::Debug, hash::Hash, sync::Arc};

use equivalent::Equivalent;
use memento_common::code::{HashBuilder, Key, Value};

use crate::{reference::Reference, refmap::ReclaimableValueMapInner};

/// Decides whether a map is under memory pressure.
///
/// Consulted with the approximate entry count after each insertion. Under pressure, the map reclaims every dead
/// payload first, then every payload, and purges the reclaimed cells.
pub trait Pressure: Send + Sync + 'static {
    /// Return `true` if payloads should be reclaimed.
    fn under_pressure(&self, len: usize) -> bool;
}

impl<F> Pressure for F
where
    F: Fn(usize) -> bool + Send + Sync + 'static,
{
    fn under_pressure(&self, len: usize) -> bool {
        self(len)
    }
}

/// Never under pressure. Payloads are reclaimed only through a [`Reclaimer`] handle.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPressure;

impl Pressure for NoPressure {
    fn under_pressure(&self, _: usize) -> bool {
        false
    }
}

/// Under pressure once the entry count exceeds the capacity.
///
/// Pressure reclaims every payload of the map, the one whose insertion crossed the capacity included. A `get` right
/// after that insertion may return `None`.
#[derive(Debug, Clone, Copy)]
pub struct CapacityPressure {
    /// Entry count the map may hold before reclaiming.
    pub capacity: usize,
}

impl CapacityPressure {
    /// Create a policy with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }
}

impl Pressure for CapacityPressure {
    fn under_pressure(&self, len: usize) -> bool {
        len > self.capacity
    }
}

/// A handle that reclaims payloads of a reclaimable map.
pub struct Reclaimer<K, V, R, S> {
    inner: Arc<ReclaimableValueMapInner<K, V, R, S>>,
}

impl<K, V, R, S> Debug for Reclaimer<K, V, R, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reclaimer").finish()
    }
}

impl<K, V, R, S> Clone for Reclaimer<K, V, R, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V, R, S> Reclaimer<K, V, R, S>
where
    K: Key + Clone,
    V: Value,
    R: Reference<V>,
    S: HashBuilder,
{
    pub(crate) fn new(inner: Arc<ReclaimableValueMapInner<K, V, R, S>>) -> Self {
        Self { inner }
    }

    /// Reclaim the payload of `key`.
    ///
    /// Returns `true` if a live cell was reclaimed and reported.
    pub fn reclaim<Q>(&self, key: &Q) -> bool
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        match self.inner.table.get(key) {
            Some(cell) => self.inner.reclaim(cell),
            None => false,
        }
    }

    /// Reclaim every payload, as a collector clearing all soft references would.
    ///
    /// Returns the count of reclaimed cells.
    pub fn reclaim_all(&self) -> usize {
        self.inner
            .table
            .values()
            .into_iter()
            .filter(|cell| self.inner.reclaim(cell.clone()))
            .count()
    }

    /// Report every cell whose payload is already unreachable.
    ///
    /// Soft payloads are never unreachable before being reclaimed, so this matters for weak references whose
    /// last strong holder is gone. A weak map also runs this pass on every drain. Returns the count of reported
    /// cells.
    pub fn collect(&self) -> usize {
        self.inner.collect()
    }

    /// Pending notification count.
    pub fn pending(&self) -> usize {
        self.inner.queue.len()
    }
}
