/// Identifier of an executing thread, as tracked by the detector.
///
/// Task ids are non-zero and stable for the lifetime of the thread.
pub type TaskId = u64;

/// Identifier of a single instrumented lock instance.
///
/// Ids are assigned from a process-wide counter when the lock is created and
/// are rendered pointer-style (`0x..`) in reports.
pub type LockId = usize;
