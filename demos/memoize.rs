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

//! Memoize word lengths across threads, with a stored null and an uncached miss.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use memento::MemoizingMap;

fn main() {
    demos::init_tracing();

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let lengths = MemoizingMap::new(move |word: &String| {
        counter.fetch_add(1, Ordering::Relaxed);
        // Words starting with an underscore are private and never cached.
        (!word.starts_with('_')).then(|| word.len())
    });

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for word in ["memento", "cache", "_hidden", "memento"] {
                    lengths.get(word);
                }
            });
        }
    });

    // A stored null is returned as is, the compute function is not called for it.
    lengths.put("nothing".to_string(), None);
    assert_eq!(lengths.get("nothing"), None);
    assert!(lengths.contains_key("nothing"));

    tracing::info!(calls = calls.load(Ordering::Relaxed), map = %lengths, "memoized");
}
