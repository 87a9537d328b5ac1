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
    fmt::Debug,
    marker::PhantomData,
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
};

use crate::reference::Reference;

/// Lifecycle of a [`Cell`].
///
/// `Live -> Reclaimed -> Purged`, never reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CellState {
    /// The payload is reachable, or nobody has noticed it is gone yet.
    Live = 0,
    /// The payload is gone, the cell may still occupy its slot.
    Reclaimed = 1,
    /// The cell has left its slot for good.
    Purged = 2,
}

impl From<u8> for CellState {
    fn from(v: u8) -> Self {
        match v {
            0 => Self::Live,
            1 => Self::Reclaimed,
            _ => Self::Purged,
        }
    }
}

/// A reference cell stored in place of a raw value.
///
/// A cell has two distinct notions of sameness, which must not be mixed:
///
/// - [`Cell::same_instance`] compares identity. Purging a reclaimed cell and swapping out a dead slot use it, so a
///   fresh cell for the same key is never removed by a stale notification.
/// - [`Cell::payload_equals`] compares payloads. Conditional removal and replacement use it.
///
/// For that reason `Cell` implements neither `PartialEq` nor `Eq`.
pub struct Cell<K, V, R> {
    key: K,
    reference: R,
    state: AtomicU8,
    _marker: PhantomData<Arc<V>>,
}

impl<K, V, R> Debug for Cell<K, V, R>
where
    K: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cell")
            .field("key", &self.key)
            .field("state", &self.state())
            .finish()
    }
}

impl<K, V, R> Cell<K, V, R> {
    /// The key of the cell. It never changes after construction.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CellState {
        self.state.load(Ordering::Acquire).into()
    }

    /// Identity comparison.
    pub fn same_instance(a: &Arc<Self>, b: &Arc<Self>) -> bool {
        Arc::ptr_eq(a, b)
    }
}

impl<K, V, R> Cell<K, V, R>
where
    R: Reference<V>,
{
    /// Create a live cell for `key` referring to `value`.
    pub fn new(key: K, value: Arc<V>) -> Arc<Self> {
        Arc::new(Self {
            key,
            reference: R::new(value),
            state: AtomicU8::new(CellState::Live as u8),
            _marker: PhantomData,
        })
    }

    /// The payload, or `None` if it has been reclaimed.
    pub fn payload(&self) -> Option<Arc<V>> {
        self.reference.get()
    }

    /// Return `true` if the payload is still reachable.
    pub fn is_live(&self) -> bool {
        self.payload().is_some()
    }

    /// Payload comparison. A reclaimed payload equals nothing.
    pub fn payload_equals(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.payload().is_some_and(|payload| *payload == *value)
    }

    /// Move the cell from `Live` to `Reclaimed` and drop its payload.
    ///
    /// Returns `true` only for the call that performed the transition, the caller must enqueue the cell then.
    pub(crate) fn reclaim(&self) -> bool {
        if self
            .state
            .compare_exchange(
                CellState::Live as u8,
                CellState::Reclaimed as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return false;
        }
        // Deallocate the payload here, no table lock is held by the reclaimer.
        drop(self.reference.clear());
        true
    }

    /// Mark the cell as having left its slot.
    ///
    /// A live cell whose payload died unnoticed can be purged directly, it will never be enqueued afterwards.
    pub(crate) fn purge(&self) -> CellState {
        self.state.swap(CellState::Purged as u8, Ordering::AcqRel).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{SoftRef, WeakRef};

    type SoftCell = Cell<u64, String, SoftRef<String>>;
    type WeakCell = Cell<u64, String, WeakRef<String>>;

    #[test]
    fn test_identity_and_payload_equality() {
        let a = SoftCell::new(1, Arc::new("v".to_string()));
        let b = SoftCell::new(1, Arc::new("v".to_string()));

        assert!(!SoftCell::same_instance(&a, &b));
        assert!(SoftCell::same_instance(&a, &a.clone()));
        assert!(a.payload_equals(&"v".to_string()));
        assert!(b.payload_equals(&"v".to_string()));
        assert!(!a.payload_equals(&"w".to_string()));
    }

    #[test]
    fn test_state_machine() {
        let cell = SoftCell::new(1, Arc::new("v".to_string()));
        assert_eq!(cell.state(), CellState::Live);
        assert!(cell.reclaim());
        assert_eq!(cell.state(), CellState::Reclaimed);
        assert!(!cell.is_live());
        assert!(!cell.payload_equals(&"v".to_string()));
        // Only the first transition counts.
        assert!(!cell.reclaim());
        assert_eq!(cell.purge(), CellState::Reclaimed);
        assert_eq!(cell.state(), CellState::Purged);
        assert!(!cell.reclaim());
    }

    #[test]
    fn test_weak_cell_dies_with_last_holder() {
        let value = Arc::new("v".to_string());
        let cell = WeakCell::new(1, value.clone());
        assert!(cell.is_live());
        drop(value);
        assert!(!cell.is_live());
        assert_eq!(cell.state(), CellState::Live);
        assert!(cell.reclaim());
        assert_eq!(cell.state(), CellState::Reclaimed);
        assert_eq!(format!("{cell:?}"), "Cell { key: 1, state: Reclaimed }");
    }

    #[test]
    fn test_debug_without_reference_bound() {
        fn render<K: Debug, V, R>(cell: &Cell<K, V, R>) -> String {
            format!("{cell:?}")
        }

        let cell = SoftCell::new(7, Arc::new("v".to_string()));
        assert_eq!(render(&cell), "Cell { key: 7, state: Live }");
        assert_eq!(render(&cell), format!("{cell:?}"));
    }
}
