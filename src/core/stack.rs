//! Call-stack capture and rendering.
//!
//! A captured stack is a bounded list of program counters, innermost frame
//! first. Rendering resolves each counter to a symbol and writes the
//! function, source location, and offset from the symbol entry point,
//! stopping at the first runtime-bootstrap or test-runner frame so reports
//! stay readable.
//!
//! The module also keeps a registry of the most recent captured stack per
//! task, which backs the all-threads dump embedded in timeout reports.

use std::ffi::c_void;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fxhash::FxHashMap;
use lazy_static::lazy_static;
use parking_lot::Mutex;

use crate::core::task_id;
use crate::types::TaskId;

/// Upper bound on captured frames per stack.
pub(crate) const MAX_FRAMES: usize = 50;

/// Symbol prefixes marking the end of the interesting part of a stack.
const BOOTSTRAP_PREFIXES: &[&str] = &["std::rt::lang_start", "test::run_test"];

/// A captured call stack: program counters, innermost frame first.
pub(crate) struct Stack {
    pcs: Vec<usize>,
}

impl Stack {
    /// Capture the caller's stack, dropping `skip` frames above the capture
    /// site, up to [`MAX_FRAMES`] frames.
    pub fn capture(skip: usize) -> Self {
        let mut pcs = Vec::with_capacity(MAX_FRAMES);
        // The first two frames are the trace machinery and this function.
        let mut to_skip = skip + 2;
        backtrace::trace(|frame| {
            if to_skip > 0 {
                to_skip -= 1;
                return true;
            }
            pcs.push(frame.ip() as usize);
            pcs.len() < MAX_FRAMES
        });
        Stack { pcs }
    }
}

fn is_runtime_bootstrap(name: &str) -> bool {
    name.contains("__rust_begin_short_backtrace")
        || BOOTSTRAP_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// Render a captured stack as indented `function()` / `file:line +0xoff`
/// pairs, ending with a blank line.
pub(crate) fn print_stack(w: &mut dyn Write, stack: &Stack) {
    let mut stop = false;
    for &pc in &stack.pcs {
        if stop {
            break;
        }
        let mut resolved = false;
        backtrace::resolve(pc as *mut c_void, |symbol| {
            // Only the outermost symbol per counter; inlined frames collapse.
            if resolved || stop {
                return;
            }
            resolved = true;
            let name = match symbol.name() {
                Some(name) => name.to_string(),
                None => {
                    let _ = writeln!(w, "  0x{pc:x}");
                    return;
                }
            };
            if is_runtime_bootstrap(&name) {
                stop = true;
                return;
            }
            let _ = writeln!(w, "  {name}()");
            match (symbol.filename(), symbol.lineno()) {
                (Some(file), Some(line)) => {
                    let entry = symbol.addr().map(|a| a as usize).unwrap_or(pc);
                    let _ = writeln!(
                        w,
                        "      {}:{} +0x{:x}",
                        file.display(),
                        line,
                        pc.wrapping_sub(entry)
                    );
                }
                _ => {
                    let _ = writeln!(w, "      0x{pc:x}");
                }
            }
        });
        if !resolved && !stop {
            let _ = writeln!(w, "  0x{pc:x}");
        }
    }
    let _ = writeln!(w);
}

lazy_static! {
    /// Most recent captured acquisition stack per live task.
    static ref TASK_STACKS: Mutex<FxHashMap<TaskId, Arc<Stack>>> =
        Mutex::new(FxHashMap::default());
}

thread_local! {
    static REGISTRATION: TaskRegistration = TaskRegistration {
        task: task_id::current(),
    };
}

/// Removes the owning thread's registry entry when the thread exits.
struct TaskRegistration {
    task: TaskId,
}

impl Drop for TaskRegistration {
    fn drop(&mut self) {
        TASK_STACKS.lock().remove(&self.task);
    }
}

/// Record `stack` as the task's most recent activity and arm the per-thread
/// exit guard.
pub(crate) fn note_task_stack(task: TaskId, stack: Arc<Stack>) {
    TASK_STACKS.lock().insert(task, stack);
    let _ = REGISTRATION.try_with(|_| ());
}

static DUMP_BUF_SIZE: AtomicUsize = AtomicUsize::new(1024);

/// Dump every known task's most recent stack into one buffer.
///
/// Blocks are headed `thread <id>:` and separated by a blank line. The
/// buffer starts at 1 KiB and doubles until the renderer reports a fit, so
/// repeated dumps settle on a stable allocation size.
pub(crate) fn all_stacks() -> Vec<u8> {
    loop {
        let size = DUMP_BUF_SIZE.load(Ordering::Relaxed);
        let mut buf = Vec::with_capacity(size);
        if write_all_stacks(&mut buf, size) {
            return buf;
        }
        DUMP_BUF_SIZE.store(size * 2, Ordering::Relaxed);
    }
}

/// Render the dump, aborting once `limit` bytes are exceeded. Callers retry
/// with a doubled limit.
fn write_all_stacks(buf: &mut Vec<u8>, limit: usize) -> bool {
    let snapshot: Vec<(TaskId, Arc<Stack>)> = {
        let stacks = TASK_STACKS.lock();
        let mut entries: Vec<_> = stacks
            .iter()
            .map(|(task, stack)| (*task, Arc::clone(stack)))
            .collect();
        entries.sort_by_key(|(task, _)| *task);
        entries
    };
    for (task, stack) in snapshot {
        let _ = writeln!(buf, "thread {task}:");
        print_stack(buf, &stack);
        if buf.len() > limit {
            return false;
        }
    }
    true
}

/// Split a dump into per-task blocks on blank-line boundaries.
pub(crate) fn split_blocks(dump: &[u8]) -> Vec<&[u8]> {
    let mut blocks = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i + 1 < dump.len() {
        if dump[i] == b'\n' && dump[i + 1] == b'\n' {
            blocks.push(&dump[start..i]);
            start = i + 2;
            i += 2;
        } else {
            i += 1;
        }
    }
    if start < dump.len() {
        blocks.push(&dump[start..]);
    }
    blocks
}

/// Parse the task id out of a dump block header (`thread <id>:` ...).
pub(crate) fn extract_task_id(block: &[u8]) -> Option<TaskId> {
    let rest = block.strip_prefix(b"thread ")?;
    let end = rest
        .iter()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    std::str::from_utf8(&rest[..end]).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_is_bounded_and_nonempty() {
        let stack = Stack::capture(0);
        assert!(!stack.pcs.is_empty());
        assert!(stack.pcs.len() <= MAX_FRAMES);
    }

    #[test]
    fn render_produces_output() {
        let stack = Stack::capture(0);
        let mut out = Vec::new();
        print_stack(&mut out, &stack);
        // At minimum the terminating blank line, and normally frame pairs.
        assert!(out.ends_with(b"\n"));
        assert!(!out.is_empty());
    }

    #[test]
    fn extracts_task_id_from_block_header() {
        assert_eq!(extract_task_id(b"thread 42:\n  f()\n"), Some(42));
        assert_eq!(extract_task_id(b"thread 7"), Some(7));
        assert_eq!(extract_task_id(b"thread x"), None);
        assert_eq!(extract_task_id(b"goroutine 42:"), None);
    }

    #[test]
    fn splits_dump_on_blank_lines() {
        let dump = b"thread 1:\n  a()\n\nthread 2:\n  b()\n\n";
        let blocks = split_blocks(dump);
        assert_eq!(blocks.len(), 2);
        assert_eq!(extract_task_id(blocks[0]), Some(1));
        assert_eq!(extract_task_id(blocks[1]), Some(2));
    }

    #[test]
    fn dump_contains_noted_task() {
        note_task_stack(999_999, Arc::new(Stack::capture(0)));
        let dump = all_stacks();
        let rendered = String::from_utf8_lossy(&dump);
        assert!(rendered.contains("thread 999999:"));
        let found = split_blocks(&dump)
            .into_iter()
            .any(|b| extract_task_id(b) == Some(999_999));
        assert!(found);
        TASK_STACKS.lock().remove(&999_999);
    }
}
