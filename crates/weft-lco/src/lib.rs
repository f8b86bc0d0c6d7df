// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Addressable-component adapter for the condition core.
//!
//! Wraps one `Condition` in a shared-ownership handle and exposes the
//! actions an invocation layer applies from arbitrary calling contexts:
//! "set event" releases one waiter, "set error" raises a fault. Faults
//! travel on their own channel; they are not notifications and never
//! touch the wait queue.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use weft_rt::condition::{Condition, TimedOut};
use weft_rt::mutex::TaskMutex;
use weft_rt::sched::Scheduler;

/// Fault raised through a component's error channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("component fault {code}: {message}")]
pub struct Fault {
    pub code: u32,
    pub message: String,
}

/// Externally invocable actions on an event component.
#[derive(Debug, Clone)]
pub enum Action {
    /// Release one waiter.
    SetEvent,
    /// Raise a fault, regardless of the wait queue's state.
    SetError { code: u32, message: String },
}

/// Reference-counted handle to one condition component.
///
/// Clones share the same core; the last clone to drop tears it down.
/// Safe to invoke from any thread or task the invocation layer supplies,
/// re-entrantly included.
#[derive(Clone)]
pub struct EventHandle {
    inner: Arc<Condition>,
}

impl EventHandle {
    pub fn new(sched: Arc<dyn Scheduler>) -> Self {
        Self {
            inner: Arc::new(Condition::new(sched)),
        }
    }

    /// Apply a remotely invoked action.
    pub fn apply(&self, action: Action) -> Result<(), Fault> {
        match action {
            Action::SetEvent => {
                self.set_event();
                Ok(())
            }
            Action::SetError { code, message } => self.set_error(code, message),
        }
    }

    /// The "set event" action: release one waiter. No-op when nothing
    /// is waiting.
    pub fn set_event(&self) {
        self.inner.notify_one();
    }

    /// The "set error" action: raise a fault to the caller.
    ///
    /// Unconditional: it fires whether or not anything is waiting, and
    /// leaves the wait queue untouched. Propagation is the invocation
    /// layer's responsibility; nothing here catches or retries it.
    pub fn set_error(&self, code: u32, message: impl Into<String>) -> Result<(), Fault> {
        Err(Fault {
            code,
            message: message.into(),
        })
    }

    // Delegated condition surface.

    /// Block the calling task until notified.
    pub fn wait(&self) {
        self.inner.wait();
    }

    /// Block until notified, releasing `mutex` while suspended.
    pub fn wait_with(&self, mutex: &TaskMutex) {
        self.inner.wait_with(mutex);
    }

    /// Block until notified or `timeout` expires.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<(), TimedOut> {
        self.inner.wait_timeout(timeout)
    }

    /// Release the longest-waiting task, if any.
    pub fn notify_one(&self) {
        self.inner.notify_one();
    }

    /// Release every task currently waiting, oldest first, in one
    /// capture. A true wake-all, not repeated single wakeups.
    pub fn notify_all(&self) {
        self.inner.notify_all();
    }

    /// Number of tasks currently waiting.
    pub fn waiters(&self) -> usize {
        self.inner.waiters()
    }
}
