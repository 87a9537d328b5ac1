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

pub use equivalent::Equivalent;

pub use memento_common::{
    code::{DefaultHasher, HashBuilder, Key, Value},
    table::ShardedTable,
};
pub use memento_memory::{
    CapacityPressure, Cell, CellState, Compute, Entries, Error, Iter, Keys, MemoizingMap, MemoizingMapBuilder,
    NoPressure, Pressure, ReclaimableValueMap, ReclaimableValueMapBuilder, ReclamationQueue, Reclaimer, Reference,
    Result, SoftRef, SoftValueMap, Strength, Values, WeakRef, WeakValueMap,
};

/// Re-export of the shared components.
pub mod common {
    pub use memento_common::*;
}

/// Re-export of the cache maps.
pub mod memory {
    pub use memento_memory::*;
}
