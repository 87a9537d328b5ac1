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

//! A soft value map reclaimed under capacity pressure and by an explicit reclaimer.

use std::sync::Arc;

use memento::{CapacityPressure, SoftValueMap};

fn main() {
    demos::init_tracing();

    let thumbnails: SoftValueMap<u64, Vec<u8>> = SoftValueMap::builder()
        .with_pressure(CapacityPressure::new(4))
        .build()
        .unwrap();

    for id in 0..4 {
        thumbnails.put(id, Arc::new(vec![id as u8; 16]));
    }
    tracing::info!(len = thumbnails.len(), "filled");

    // The fifth insertion exceeds the capacity and every soft payload is reclaimed.
    thumbnails.put(4, Arc::new(vec![4; 16]));
    tracing::info!(len = thumbnails.len(), "under pressure");

    // The host may also reclaim explicitly, for example on a low memory signal.
    thumbnails.put(5, Arc::new(vec![5; 16]));
    thumbnails.reclaimer().reclaim(&5);
    assert!(thumbnails.get(&5).is_none());
    assert_eq!(thumbnails.put_if_absent(5, Arc::new(vec![55; 16])), None);
    tracing::info!(entries = ?thumbnails.keys(), "reloaded");
}
