//! The per-acquisition timeout watchdog.
//!
//! Every contended acquisition spawns an observer thread with a
//! zero-capacity cancellation channel. The acquiring thread drops its end of
//! the channel once the acquisition succeeds (or the guard is abandoned),
//! which cancels the observer. If the deadline elapses first, the observer
//! renders a timeout report naming the current holder, invokes the
//! notifier, and then blocks on a second receive so the same acquisition
//! can never be reported twice.

use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

use crate::core::lock_order::{self, HEADER};
use crate::core::stack::{self, Stack};
use crate::options::Options;
use crate::types::{LockId, TaskId};

pub(crate) struct Watchdog {
    /// Dropping the sender closes the channel, cancelling the observer.
    _cancel: Sender<()>,
}

impl Watchdog {
    /// Start observing an acquisition of `lock` by `task`.
    ///
    /// `opts.deadlock_timeout` must be positive; callers skip the watchdog
    /// entirely otherwise.
    pub fn spawn(opts: Options, task: TaskId, lock: LockId, stack: Arc<Stack>) -> Self {
        let (tx, rx) = bounded(0);
        let builder = thread::Builder::new().name("lockup-watchdog".into());
        // A failed spawn just means this acquisition goes unobserved.
        let _ = builder.spawn(move || watch(rx, opts, task, lock, stack));
        Watchdog { _cancel: tx }
    }
}

fn watch(cancel: Receiver<()>, opts: Options, task: TaskId, lock: LockId, stack: Arc<Stack>) {
    match cancel.recv_timeout(opts.deadlock_timeout) {
        Err(RecvTimeoutError::Timeout) => {}
        Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
    }

    let dump = stack::all_stacks();
    let table = lock_order::table().lock();
    opts.with_sink(|w| {
        let _ = writeln!(w, "{HEADER}");
        let _ = writeln!(
            w,
            "thread {task} has been trying to lock {lock:#x} for more than {:?}:",
            opts.deadlock_timeout
        );
        stack::print_stack(w, &stack);
        if let Some(previous) = table.holder(lock) {
            let _ = writeln!(w, "thread {} previously locked it from:", previous.task);
            stack::print_stack(w, &previous.stack);
            for block in stack::split_blocks(&dump) {
                if stack::extract_task_id(block) == Some(previous.task) {
                    let _ = writeln!(w, "thread {} current stack:", previous.task);
                    let _ = w.write_all(block);
                    let _ = writeln!(w);
                }
            }
        }
        table.write_other_holders(w, lock);
        if opts.print_all_threads {
            let _ = writeln!(w, "All current threads:");
            let _ = w.write_all(&dump);
        }
        let _ = writeln!(w);
    });
    opts.potential_deadlock();
    drop(table);

    // Wait out the acquisition so the report fires at most once.
    let _ = cancel.recv();
}
