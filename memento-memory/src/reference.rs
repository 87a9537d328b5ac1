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

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Weak,
};

use arc_swap::ArcSwapOption;
use memento_common::code::Value;

/// How eagerly a payload held by a [`Reference`] may be reclaimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strength {
    /// The payload is kept until the reclaimer clears it under memory pressure.
    Soft,
    /// The payload is kept only while a caller holds a strong reference to it.
    Weak,
}

/// A reference to a shared payload with a fixed reclaim strength.
pub trait Reference<V>: Send + Sync + 'static {
    /// Reclaim strength of the reference.
    const STRENGTH: Strength;

    /// Create a reference to `value`.
    fn new(value: Arc<V>) -> Self;

    /// Get the payload, or `None` if it has been reclaimed.
    fn get(&self) -> Option<Arc<V>>;

    /// Drop the payload held by the reference.
    ///
    /// Returns the payload if it was still reachable, so the caller decides where it is deallocated.
    fn clear(&self) -> Option<Arc<V>>;
}

/// A reference that holds its payload strongly until cleared.
#[derive(Debug)]
pub struct SoftRef<V> {
    payload: ArcSwapOption<V>,
}

impl<V> Reference<V> for SoftRef<V>
where
    V: Value,
{
    const STRENGTH: Strength = Strength::Soft;

    fn new(value: Arc<V>) -> Self {
        Self {
            payload: ArcSwapOption::new(Some(value)),
        }
    }

    fn get(&self) -> Option<Arc<V>> {
        self.payload.load_full()
    }

    fn clear(&self) -> Option<Arc<V>> {
        self.payload.swap(None)
    }
}

/// A reference that does not keep its payload alive.
#[derive(Debug)]
pub struct WeakRef<V> {
    payload: Weak<V>,
    cleared: AtomicBool,
}

impl<V> Reference<V> for WeakRef<V>
where
    V: Value,
{
    const STRENGTH: Strength = Strength::Weak;

    fn new(value: Arc<V>) -> Self {
        Self {
            payload: Arc::downgrade(&value),
            cleared: AtomicBool::new(false),
        }
    }

    fn get(&self) -> Option<Arc<V>> {
        if self.cleared.load(Ordering::Acquire) {
            return None;
        }
        self.payload.upgrade()
    }

    fn clear(&self) -> Option<Arc<V>> {
        if self.cleared.swap(true, Ordering::AcqRel) {
            return None;
        }
        self.payload.upgrade()
    }
}
