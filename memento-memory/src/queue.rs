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

use std::{collections::VecDeque, fmt::Debug};

use parking_lot::Mutex;

/// A FIFO of reclamation notifications.
///
/// Both ends never block beyond the short critical section of the inner lock.
pub struct ReclamationQueue<T> {
    queue: Mutex<VecDeque<T>>,
}

impl<T> Debug for ReclamationQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReclamationQueue").field("len", &self.len()).finish()
    }
}

impl<T> Default for ReclamationQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ReclamationQueue<T> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Append a notification.
    pub fn push(&self, item: T) {
        self.queue.lock().push_back(item);
    }

    /// Pop the oldest notification, or `None` if the queue is empty.
    pub fn pop(&self) -> Option<T> {
        self.queue.lock().pop_front()
    }

    /// Pending notification count.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Return `true` if no notification is pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo() {
        let queue = ReclamationQueue::new();
        assert!(queue.is_empty());
        for i in 0..4 {
            queue.push(i);
        }
        assert_eq!(queue.len(), 4);
        assert_eq!((0..4).map(|_| queue.pop().unwrap()).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert_eq!(queue.pop(), None);
    }
}
