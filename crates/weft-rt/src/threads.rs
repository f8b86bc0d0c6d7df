// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Thread-backed scheduler.
//!
//! Each task is an OS thread that registers itself and parks on a
//! per-task permit cell (`Mutex<bool>` plus `Condvar`). A wakeup that
//! lands before the park is kept in the cell, not lost.

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use log::trace;

use crate::sched::{Scheduler, TaskId};

/// Wakeup permit for one task. Saturates at one pending wakeup.
struct Permit {
    runnable: Mutex<bool>,
    cvar: Condvar,
}

impl Permit {
    fn new() -> Self {
        Self {
            runnable: Mutex::new(false),
            cvar: Condvar::new(),
        }
    }
}

thread_local! {
    static CURRENT: Cell<Option<u64>> = Cell::new(None);
}

/// `Scheduler` where every task is an OS thread.
pub struct ThreadScheduler {
    permits: Mutex<HashMap<u64, Arc<Permit>>>,
    next_id: AtomicU64,
}

impl ThreadScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            permits: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        })
    }

    /// Register the calling thread as a task.
    ///
    /// The returned guard carries the task's id and deregisters on drop.
    /// One registration per thread at a time.
    pub fn register_current(self: &Arc<Self>) -> TaskGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.permits
            .lock()
            .unwrap()
            .insert(id, Arc::new(Permit::new()));
        CURRENT.with(|c| c.set(Some(id)));
        trace!("task {} registered", id);
        TaskGuard {
            sched: self.clone(),
            id: TaskId(id),
        }
    }

    fn permit(&self, id: TaskId) -> Option<Arc<Permit>> {
        self.permits.lock().unwrap().get(&id.0).cloned()
    }
}

impl Scheduler for ThreadScheduler {
    fn current(&self) -> TaskId {
        let id = CURRENT
            .with(|c| c.get())
            .expect("calling thread is not a registered task");
        TaskId(id)
    }

    fn suspend(&self, id: TaskId) {
        let permit = self.permit(id).expect("suspend of a deregistered task");
        let mut runnable = permit.runnable.lock().unwrap();
        while !*runnable {
            runnable = permit.cvar.wait(runnable).unwrap();
        }
        *runnable = false;
        trace!("task {} resumed", id.0);
    }

    fn suspend_timeout(&self, id: TaskId, timeout: Duration) -> bool {
        let permit = self.permit(id).expect("suspend of a deregistered task");
        let deadline = Instant::now() + timeout;
        let mut runnable = permit.runnable.lock().unwrap();
        while !*runnable {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = permit.cvar.wait_timeout(runnable, deadline - now).unwrap();
            runnable = guard;
        }
        *runnable = false;
        true
    }

    fn set_runnable(&self, id: TaskId) {
        // Unknown id: the task already deregistered, nothing to wake.
        let Some(permit) = self.permit(id) else {
            return;
        };
        let mut runnable = permit.runnable.lock().unwrap();
        *runnable = true;
        permit.cvar.notify_one();
    }
}

/// Registration guard returned by `register_current`.
pub struct TaskGuard {
    sched: Arc<ThreadScheduler>,
    id: TaskId,
}

impl TaskGuard {
    pub fn id(&self) -> TaskId {
        self.id
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        CURRENT.with(|c| c.set(None));
        self.sched.permits.lock().unwrap().remove(&self.id.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;

    #[test]
    fn permit_before_suspend_does_not_block() {
        let sched = ThreadScheduler::new();
        let guard = sched.register_current();
        sched.set_runnable(guard.id());
        // Consumes the pending permit and returns immediately.
        sched.suspend(guard.id());
    }

    #[test]
    fn set_runnable_is_idempotent() {
        let sched = ThreadScheduler::new();
        let guard = sched.register_current();
        sched.set_runnable(guard.id());
        sched.set_runnable(guard.id());
        sched.suspend(guard.id());
        // Only one wakeup was deposited.
        assert!(!sched.suspend_timeout(guard.id(), Duration::from_millis(20)));
    }

    #[test]
    fn suspend_blocks_until_set_runnable() {
        let sched = ThreadScheduler::new();
        let (tx, rx) = mpsc::channel();
        let s = sched.clone();
        let h = thread::spawn(move || {
            let guard = s.register_current();
            tx.send(guard.id()).unwrap();
            s.suspend(guard.id());
            "woke"
        });
        let id = rx.recv().unwrap();
        thread::sleep(Duration::from_millis(20));
        sched.set_runnable(id);
        assert_eq!(h.join().unwrap(), "woke");
    }

    #[test]
    fn suspend_timeout_expires() {
        let sched = ThreadScheduler::new();
        let guard = sched.register_current();
        let start = Instant::now();
        assert!(!sched.suspend_timeout(guard.id(), Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(29));
    }

    #[test]
    fn set_runnable_unknown_id_is_noop() {
        let sched = ThreadScheduler::new();
        let id = {
            let guard = sched.register_current();
            guard.id()
        };
        // Guard dropped, task deregistered.
        sched.set_runnable(id);
    }

    #[test]
    fn ids_are_unique_across_tasks() {
        let sched = ThreadScheduler::new();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let s = sched.clone();
            handles.push(thread::spawn(move || {
                let guard = s.register_current();
                guard.id()
            }));
        }
        let ids: std::collections::HashSet<_> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(ids.len(), 8);
    }
}
