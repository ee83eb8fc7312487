//! Instrumented lock adapters and the shared acquisition pipeline.

pub mod mutex;
pub mod rwlock;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::core::lock_order;
use crate::core::stack::{self, Stack};
use crate::core::task_id;
use crate::core::watchdog::Watchdog;
use crate::options;
use crate::types::LockId;

static NEXT_LOCK_ID: AtomicUsize = AtomicUsize::new(1);

pub(crate) fn next_lock_id() -> LockId {
    NEXT_LOCK_ID.fetch_add(1, Ordering::SeqCst)
}

/// Frames between the user's call site and the capture point, hidden from
/// rendered stacks: the wrapper method and this pipeline.
const ADAPTER_FRAMES: usize = 2;

/// Run a blocking acquisition through the full instrumentation pipeline:
/// pre-acquire analysis, an optimistic try-acquire, the watchdog around the
/// blocking path, and holder installation afterwards.
pub(crate) fn acquire<G>(
    lock: LockId,
    try_lock: impl FnOnce() -> Option<G>,
    block_lock: impl FnOnce() -> G,
) -> G {
    let opts = options::snapshot();
    let task = task_id::current();
    let stack = Arc::new(Stack::capture(ADAPTER_FRAMES));
    stack::note_task_stack(task, Arc::clone(&stack));

    if opts.ordering_enabled() {
        lock_order::table().lock().pre_lock(&opts, task, &stack, lock);
    }

    let guard = match try_lock() {
        Some(guard) => guard,
        None => {
            let _watchdog = opts
                .watchdog_enabled()
                .then(|| Watchdog::spawn(opts.clone(), task, lock, Arc::clone(&stack)));
            block_lock()
        }
    };

    lock_order::table().lock().post_lock(task, stack, lock);
    guard
}

/// Non-blocking variant: same pre-acquire analysis, no watchdog, and holder
/// installation only when the try succeeds.
pub(crate) fn try_acquire<G>(lock: LockId, try_lock: impl FnOnce() -> Option<G>) -> Option<G> {
    let opts = options::snapshot();
    let task = task_id::current();
    let stack = Arc::new(Stack::capture(ADAPTER_FRAMES));
    stack::note_task_stack(task, Arc::clone(&stack));

    if opts.ordering_enabled() {
        lock_order::table().lock().pre_lock(&opts, task, &stack, lock);
    }

    let guard = try_lock()?;
    lock_order::table().lock().post_lock(task, stack, lock);
    Some(guard)
}

/// Called after the underlying release has returned.
pub(crate) fn release(lock: LockId) {
    lock_order::table().lock().post_unlock(lock);
}
