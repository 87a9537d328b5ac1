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

#![cfg_attr(docsrs, feature(doc_cfg))]

//! memento - concurrent memoizing and reclaimable cache maps for Rust.
//!
//! ```
//! use memento::{MemoizingMap, SoftValueMap};
//! use std::sync::Arc;
//!
//! let lengths = MemoizingMap::new(|key: &String| Some(key.len()));
//! assert_eq!(lengths.get("hello"), Some(5));
//!
//! let shapes: SoftValueMap<u64, String> = SoftValueMap::new();
//! shapes.put(1, Arc::new("circle".to_string()));
//! assert_eq!(shapes.get(&1).as_deref().map(String::as_str), Some("circle"));
//! ```

mod prelude;
pub use prelude::*;
