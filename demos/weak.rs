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

//! A weak value map that forgets sessions once their holders drop them.

use std::sync::Arc;

use memento::WeakValueMap;

#[derive(Debug, PartialEq)]
struct Session {
    user: String,
}

fn main() {
    demos::init_tracing();

    let sessions: WeakValueMap<u64, Session> = WeakValueMap::new();
    let alice = Arc::new(Session { user: "alice".to_string() });
    let bob = Arc::new(Session { user: "bob".to_string() });
    sessions.put(1, alice.clone());
    sessions.put(2, bob.clone());

    // The map does not keep sessions alive on its own.
    drop(bob);
    assert!(sessions.get(&2).is_none());

    let collected = sessions.reclaimer().collect();
    tracing::info!(collected, len = sessions.len(), "collected dead sessions");
    assert_eq!(sessions.get(&1).as_deref(), Some(&*alice));
}
