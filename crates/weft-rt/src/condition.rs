// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Condition core (wait / notify_one / notify_all).
//!
//! An arbitrary number of tasks block until released, one at a time or
//! all together, FIFO. The waiter is queued before any external lock is
//! dropped, so a notifier that takes that lock afterwards cannot miss
//! it.

use std::sync::Arc;
use std::time::Duration;

use log::trace;

use crate::mutex::TaskMutex;
use crate::queue::WaitQueue;
use crate::sched::Scheduler;

/// Timed wait expired with no notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedOut;

impl std::fmt::Display for TimedOut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "wait timed out")
    }
}

impl std::error::Error for TimedOut {}

/// Condition variable for cooperative tasks.
///
/// Owns its wait queue exclusively; all queue traffic goes through the
/// methods below. Every operation may be called from any thread in
/// parallel.
pub struct Condition {
    queue: WaitQueue,
    sched: Arc<dyn Scheduler>,
}

impl Condition {
    pub fn new(sched: Arc<dyn Scheduler>) -> Self {
        Self {
            queue: WaitQueue::new(),
            sched,
        }
    }

    /// Block the calling task until notified.
    pub fn wait(&self) {
        let id = self.sched.current();
        self.queue.push(id);
        self.sched.suspend(id);
    }

    /// Block the calling task until notified, releasing `mutex` while
    /// suspended.
    ///
    /// The caller must hold `mutex`. The waiter is queued before the
    /// unlock, so a notifier that acquires `mutex` after this call
    /// released it is guaranteed to find the waiter. The mutex is
    /// reacquired before returning.
    pub fn wait_with(&self, mutex: &TaskMutex) {
        let id = self.sched.current();
        self.queue.push(id);
        mutex.unlock();
        self.sched.suspend(id);
        mutex.lock();
    }

    /// Block the calling task until notified or `timeout` expires.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<(), TimedOut> {
        let id = self.sched.current();
        self.queue.push(id);
        if self.sched.suspend_timeout(id, timeout) {
            return Ok(());
        }
        // Expired. Withdraw our entry; if a notifier already dequeued
        // it, the wakeup permit is in flight: consume it and report the
        // notification instead of the timeout.
        if self.queue.remove(id) {
            Err(TimedOut)
        } else {
            self.sched.suspend(id);
            Ok(())
        }
    }

    /// Release the longest-waiting task, if any. No-op on an empty
    /// queue. Concurrent callers can never release the same waiter; the
    /// dequeue is atomic.
    pub fn notify_one(&self) {
        if let Some(id) = self.queue.pop() {
            trace!("notify_one releasing task {:?}", id);
            self.sched.set_runnable(id);
        }
    }

    /// Release every task currently waiting, oldest first.
    ///
    /// The queue contents are captured in one step; tasks that start
    /// waiting after the capture are served by a future notification.
    pub fn notify_all(&self) {
        let captured = self.queue.take_all();
        if !captured.is_empty() {
            trace!("notify_all releasing {} waiter(s)", captured.len());
        }
        for id in captured {
            self.sched.set_runnable(id);
        }
    }

    /// Number of tasks currently waiting.
    pub fn waiters(&self) -> usize {
        self.queue.len()
    }
}
