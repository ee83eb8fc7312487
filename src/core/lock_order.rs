//! The holder table, the ordering-edge table, and the pre-acquire detector.
//!
//! Both tables live behind one process-wide mutex: detection needs a global
//! view across all threads, and a single short critical section per lock
//! operation keeps the bookkeeping coherent.
//!
//! The detector looks only for direct two-lock cycles: the same thread
//! observed taking `a` before `b` and, elsewhere, `b` before `a`. Real
//! deadlocks are dominated by exactly this AB/BA shape, and skipping
//! transitive closure keeps the pre-acquire check linear in the number of
//! currently held locks.

use std::io::Write;
use std::sync::Arc;

use fxhash::FxHashMap;
use lazy_static::lazy_static;
use parking_lot::Mutex;

use crate::core::stack::{self, Stack};
use crate::options::Options;
use crate::types::{LockId, TaskId};

pub(crate) const HEADER: &str = "POTENTIAL DEADLOCK:";

/// Current owner of a lock: which task took it, and from where.
pub(crate) struct Holder {
    pub task: TaskId,
    pub stack: Arc<Stack>,
}

/// The two call sites witnessing an observed (before, after) ordering.
struct Witness {
    before: Arc<Stack>,
    after: Arc<Stack>,
}

pub(crate) struct LockOrder {
    /// Latest observed holder per lock. For exclusive locks this is the
    /// current holder; concurrent shared holders overwrite one another.
    cur: FxHashMap<LockId, Holder>,
    /// Observed acquisition orderings, keyed (before, after).
    order: FxHashMap<(LockId, LockId), Witness>,
}

impl LockOrder {
    fn new() -> Self {
        LockOrder {
            cur: FxHashMap::default(),
            order: FxHashMap::default(),
        }
    }

    /// Analyze an imminent acquisition of `lock` by `task`.
    ///
    /// Reports recursive locking when the task already holds `lock`, and
    /// inconsistent locking when the opposite of a to-be-recorded ordering
    /// edge is already known. New edges are recorded for every other lock
    /// the task currently holds; the edge table is cleared wholesale when
    /// it reaches the configured bound.
    pub fn pre_lock(&mut self, opts: &Options, task: TaskId, stack: &Arc<Stack>, lock: LockId) {
        if opts.max_map_size == 0 {
            return;
        }
        for (&held, holder) in &self.cur {
            if held == lock {
                if holder.task == task {
                    self.report_recursive(opts, task, lock, stack, &holder.stack);
                    opts.potential_deadlock();
                }
                // Another task holding the same lock is plain contention.
                continue;
            }
            if holder.task != task {
                // Orderings are only meaningful within a single task.
                continue;
            }
            if let Some(witness) = self.order.get(&(lock, held)) {
                self.report_inconsistent(opts, witness, &holder.stack, stack, lock);
                opts.potential_deadlock();
            }
            self.order.insert(
                (held, lock),
                Witness {
                    before: Arc::clone(&holder.stack),
                    after: Arc::clone(stack),
                },
            );
            if self.order.len() >= opts.max_map_size {
                // Coarse bound: drop everything rather than tracking age.
                self.order.clear();
            }
        }
    }

    /// Install the holder record once the underlying acquisition succeeded.
    pub fn post_lock(&mut self, task: TaskId, stack: Arc<Stack>, lock: LockId) {
        self.cur.insert(lock, Holder { task, stack });
    }

    /// Clear the holder record once the underlying release returned.
    pub fn post_unlock(&mut self, lock: LockId) {
        self.cur.remove(&lock);
    }

    pub fn holder(&self, lock: LockId) -> Option<&Holder> {
        self.cur.get(&lock)
    }

    fn report_recursive(
        &self,
        opts: &Options,
        task: TaskId,
        lock: LockId,
        stack: &Stack,
        previous: &Stack,
    ) {
        opts.with_sink(|w| {
            let _ = writeln!(w, "{HEADER} Recursive locking:");
            let _ = writeln!(w, "current thread {task} lock {lock:#x}");
            stack::print_stack(w, stack);
            let _ = writeln!(w, "Previous place where the lock was grabbed (same thread)");
            stack::print_stack(w, previous);
            self.write_other_holders(w, lock);
        });
    }

    fn report_inconsistent(
        &self,
        opts: &Options,
        witness: &Witness,
        held_stack: &Stack,
        stack: &Stack,
        lock: LockId,
    ) {
        opts.with_sink(|w| {
            let _ = writeln!(w, "{HEADER} Inconsistent locking:");
            let _ = writeln!(w, "saw this ordering in one thread:");
            let _ = writeln!(w, "happened before");
            stack::print_stack(w, &witness.before);
            let _ = writeln!(w, "happened after");
            stack::print_stack(w, &witness.after);
            let _ = writeln!(w, "in another thread: happened before");
            stack::print_stack(w, held_stack);
            let _ = writeln!(w, "happened after");
            stack::print_stack(w, stack);
            self.write_other_holders(w, lock);
            let _ = writeln!(w);
        });
    }

    /// Append the `Other threads holding locks:` section, if any.
    pub(crate) fn write_other_holders(&self, w: &mut dyn Write, lock: LockId) {
        if !self.cur.keys().any(|&held| held != lock) {
            return;
        }
        let _ = writeln!(w, "Other threads holding locks:");
        for (&held, holder) in &self.cur {
            if held == lock {
                continue;
            }
            let _ = writeln!(w, "thread {} lock {held:#x}", holder.task);
            stack::print_stack(w, &holder.stack);
        }
        let _ = writeln!(w);
    }
}

lazy_static! {
    static ref LOCK_ORDER: Mutex<LockOrder> = Mutex::new(LockOrder::new());
}

/// The process-wide holder/ordering table.
pub(crate) fn table() -> &'static Mutex<LockOrder> {
    &LOCK_ORDER
}
