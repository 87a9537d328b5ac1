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

//! Concurrent cache maps for memento.
//!
//! - [`MemoizingMap`] computes a value per key on miss and keeps at most one of them, with nullable values.
//! - [`ReclaimableValueMap`] holds values through reference cells whose payloads may be reclaimed at any time,
//!   with [`SoftValueMap`] and [`WeakValueMap`] fixing the reclaim strength.
//!
//! Neither map spawns threads. All work, including the purge of reclaimed cells, happens on the caller's thread
//! under the per-shard locks of the backing table.

mod cell;
mod error;
mod memoize;
mod queue;
mod reclaim;
mod reference;
mod refmap;
mod view;

mod prelude;
pub use prelude::*;
