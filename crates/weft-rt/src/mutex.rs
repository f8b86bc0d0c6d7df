// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Sleeping task mutex.
//!
//! Contended lockers are queued and suspended instead of spinning.
//! Unlock hands the lock to the longest-waiting task directly, so
//! acquisition order is FIFO.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::sched::{Scheduler, TaskId};

struct Inner {
    locked: bool,
    waiters: VecDeque<TaskId>,
}

/// Mutual exclusion for cooperative tasks.
///
/// A raw lock: it guards no data and has explicit `lock`/`unlock`, so a
/// condition wait can release and reacquire it around a suspension.
/// Lock-state checks and waiter queueing share one internal mutex and
/// are a single atomic step.
pub struct TaskMutex {
    inner: Mutex<Inner>,
    sched: Arc<dyn Scheduler>,
}

impl TaskMutex {
    pub fn new(sched: Arc<dyn Scheduler>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                locked: false,
                waiters: VecDeque::new(),
            }),
            sched,
        }
    }

    /// Acquire the lock, suspending the calling task while it is held
    /// elsewhere.
    pub fn lock(&self) {
        let id = {
            let mut inner = self.inner.lock().unwrap();
            if !inner.locked {
                inner.locked = true;
                return;
            }
            let id = self.sched.current();
            inner.waiters.push_back(id);
            id
        };
        // Handoff: when the holder wakes us, the lock is already ours.
        self.sched.suspend(id);
    }

    /// Non-blocking acquire attempt.
    pub fn try_lock(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.locked {
            false
        } else {
            inner.locked = true;
            true
        }
    }

    /// Release the lock.
    ///
    /// If tasks are queued, ownership transfers to the longest-waiting
    /// one; `locked` never drops in between, so no third party can barge
    /// in. Calling without holding the lock is a caller contract
    /// violation.
    pub fn unlock(&self) {
        let next = {
            let mut inner = self.inner.lock().unwrap();
            match inner.waiters.pop_front() {
                Some(id) => Some(id),
                None => {
                    inner.locked = false;
                    None
                }
            }
        };
        if let Some(id) = next {
            self.sched.set_runnable(id);
        }
    }
}
