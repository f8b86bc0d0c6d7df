// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! FIFO wait queue.
//!
//! Mutex-protected VecDeque; the single mutex is the linearization point
//! for every operation. Adequate for wait/notify rates; swap for a
//! lock-free MPMC queue if contention ever shows.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::sched::TaskId;

/// Linearizable FIFO of suspended-task ids.
///
/// An id appears at most once at a time: a task is suspended on at most
/// one wait, and every entry is removed exactly once, by a notifier or
/// by the waiter's own timed-wait withdrawal.
pub struct WaitQueue {
    deque: Mutex<VecDeque<TaskId>>,
}

impl WaitQueue {
    pub fn new() -> Self {
        Self {
            deque: Mutex::new(VecDeque::new()),
        }
    }

    /// Append `id` as the newest entry.
    pub fn push(&self, id: TaskId) {
        self.deque.lock().unwrap().push_back(id);
    }

    /// Remove and return the oldest entry. `None` on an empty queue is a
    /// normal result, not an error.
    pub fn pop(&self) -> Option<TaskId> {
        self.deque.lock().unwrap().pop_front()
    }

    /// Detach the entire current contents in one step, oldest first.
    ///
    /// Entries pushed after this call land in the fresh queue and are
    /// unaffected.
    pub fn take_all(&self) -> VecDeque<TaskId> {
        std::mem::take(&mut *self.deque.lock().unwrap())
    }

    /// Withdraw a specific entry. Returns whether it was still present.
    pub fn remove(&self, id: TaskId) -> bool {
        let mut q = self.deque.lock().unwrap();
        match q.iter().position(|&e| e == id) {
            Some(i) => q.remove(i).is_some(),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.deque.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.deque.lock().unwrap().is_empty()
    }
}

impl Default for WaitQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn pop_is_fifo() {
        let q = WaitQueue::new();
        q.push(TaskId(1));
        q.push(TaskId(2));
        q.push(TaskId(3));
        assert_eq!(q.pop(), Some(TaskId(1)));
        assert_eq!(q.pop(), Some(TaskId(2)));
        assert_eq!(q.pop(), Some(TaskId(3)));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn pop_empty_is_none() {
        let q = WaitQueue::new();
        assert_eq!(q.pop(), None);
        assert!(q.is_empty());
    }

    #[test]
    fn take_all_detaches_in_order() {
        let q = WaitQueue::new();
        q.push(TaskId(1));
        q.push(TaskId(2));
        let captured: Vec<_> = q.take_all().into_iter().collect();
        assert_eq!(captured, vec![TaskId(1), TaskId(2)]);
        assert!(q.is_empty());
        // Pushes after the capture land in the fresh queue.
        q.push(TaskId(3));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn remove_withdraws_only_present_entries() {
        let q = WaitQueue::new();
        q.push(TaskId(1));
        q.push(TaskId(2));
        assert!(q.remove(TaskId(1)));
        assert!(!q.remove(TaskId(1)));
        assert_eq!(q.pop(), Some(TaskId(2)));
    }

    #[test]
    fn remove_keeps_order_of_rest() {
        let q = WaitQueue::new();
        q.push(TaskId(1));
        q.push(TaskId(2));
        q.push(TaskId(3));
        assert!(q.remove(TaskId(2)));
        assert_eq!(q.pop(), Some(TaskId(1)));
        assert_eq!(q.pop(), Some(TaskId(3)));
    }

    #[test]
    fn concurrent_push_pop_loses_and_duplicates_nothing() {
        let q = Arc::new(WaitQueue::new());
        let per_thread = 500u64;

        let mut pushers = Vec::new();
        for t in 0..4u64 {
            let q = q.clone();
            pushers.push(thread::spawn(move || {
                for i in 0..per_thread {
                    q.push(TaskId(t * per_thread + i));
                }
            }));
        }

        let mut poppers = Vec::new();
        for _ in 0..4 {
            let q = q.clone();
            poppers.push(thread::spawn(move || {
                let mut got = Vec::new();
                while got.len() < per_thread as usize {
                    if let Some(id) = q.pop() {
                        got.push(id.0);
                    }
                }
                got
            }));
        }

        for h in pushers {
            h.join().unwrap();
        }
        let mut all: Vec<u64> = Vec::new();
        for h in poppers {
            all.extend(h.join().unwrap());
        }
        all.sort_unstable();
        let expected: Vec<u64> = (0..4 * per_thread).collect();
        assert_eq!(all, expected);
        assert!(q.is_empty());
    }
}
