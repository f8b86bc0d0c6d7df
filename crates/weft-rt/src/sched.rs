// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Scheduler boundary (task ids + suspend/resume requests).
//!
//! The sync primitives never touch runnable/suspended state directly;
//! they ask the scheduler for transitions through this trait. The
//! scheduler owns that state, the primitives own their queues.

use std::time::Duration;

/// Opaque identifier of one task.
///
/// Issued by the scheduler at registration; the sync primitives only
/// store and transport it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub(crate) u64);

/// Suspend/resume boundary between the sync primitives and the runtime.
///
/// Wakeups are permits: `set_runnable` deposits a permit for a task,
/// `suspend` consumes one, blocking until it is present. A permit
/// deposited before the suspend makes the suspend return immediately,
/// so a notifier racing ahead of the waiter never loses the wakeup.
pub trait Scheduler: Send + Sync {
    /// Id of the calling task.
    ///
    /// Calling from a thread that is not a registered task is a caller
    /// contract violation and panics.
    fn current(&self) -> TaskId;

    /// Block the calling task until its wakeup permit arrives, consuming
    /// the permit. Returns without blocking if one is already pending.
    ///
    /// Must be called by the task `id` refers to.
    fn suspend(&self, id: TaskId);

    /// Bounded [`suspend`](Scheduler::suspend). Returns `true` if a
    /// permit was consumed, `false` if `timeout` expired with none
    /// pending.
    fn suspend_timeout(&self, id: TaskId, timeout: Duration) -> bool;

    /// Deposit the wakeup permit for `id`. Callable from any thread or
    /// task. Idempotent while a permit is already pending; ids of tasks
    /// that have already deregistered are ignored.
    fn set_runnable(&self, id: TaskId);
}
