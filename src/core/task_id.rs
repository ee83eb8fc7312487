//! Task identity.
//!
//! The detector needs a stable, non-zero integer per thread. The runtime's
//! thread id carries exactly that, but only exposes it through its textual
//! form, so the id is parsed out once and cached in a thread-local. The
//! `slow-task-id` feature drops the cache and re-derives the id on every
//! query, for environments where thread-local state is unreliable (the
//! cached path already falls back to re-deriving during TLS teardown).

use std::cell::Cell;
use std::thread;

use crate::types::TaskId;

thread_local! {
    static CACHED_ID: Cell<TaskId> = const { Cell::new(0) };
}

/// Task id of the calling thread.
#[cfg(not(feature = "slow-task-id"))]
pub(crate) fn current() -> TaskId {
    CACHED_ID
        .try_with(|cell| match cell.get() {
            0 => {
                let id = task_id_fallback();
                cell.set(id);
                id
            }
            id => id,
        })
        .unwrap_or_else(|_| task_id_fallback())
}

/// Task id of the calling thread, re-derived on every call.
#[cfg(feature = "slow-task-id")]
pub(crate) fn current() -> TaskId {
    task_id_fallback()
}

/// Derive the task id from the runtime's textual thread-id representation.
fn task_id_fallback() -> TaskId {
    let repr = format!("{:?}", thread::current().id());
    parse_thread_id(&repr)
        .expect("cannot derive a task id from the runtime thread id representation")
}

// "ThreadId(12)" -> 12
fn parse_thread_id(repr: &str) -> Option<TaskId> {
    let start = repr.find('(')? + 1;
    let end = start + repr[start..].find(')')?;
    repr[start..end].parse().ok()
}

/// Sanity check used by tests: the selected accessor agrees with a freshly
/// derived id for the current thread.
#[cfg(test)]
fn id_matches(slow_id: TaskId) -> bool {
    current() == slow_id
}
