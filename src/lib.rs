//! # Lockup
//!
//! A runtime deadlock detector for mutexes and reader-writer locks.
//!
//! Lockup provides drop-in replacements for `Mutex` and `RwLock` that watch
//! every acquisition for the preconditions of a deadlock and report them
//! while the program is still running: lock orderings that are inconsistent
//! between threads, locks re-acquired by their own holder, and acquisitions
//! that stall past a configurable deadline.
//!
//! ## Overview
//!
//! Deadlocks rarely reproduce on demand. Lockup attacks them from two
//! directions at once:
//!
//! - **Ordering analysis**: whenever a thread that already holds lock `A`
//!   acquires lock `B`, the pair is remembered together with both call
//!   stacks. The moment any thread is seen taking the same two locks in the
//!   opposite order (the classic AB/BA shape), a report is written, even if
//!   the timing never actually lined up to hang.
//! - **Acquisition watchdog**: every contended acquisition is observed by a
//!   deadline. A thread stuck longer than the configured timeout produces a
//!   report naming the current holder, where it took the lock, and what it
//!   is doing now.
//!
//! Detection never alters the program under test: the wrapped operations
//! block, succeed, and release exactly as the underlying primitives do.
//! Reports go to a configurable sink (standard error by default) and every
//! detection invokes a configurable callback, which decides policy.
//!
//! ## Usage
//!
//! ```rust
//! use lockup::Mutex;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let shared = Arc::new(Mutex::new(0u64));
//! let clone = Arc::clone(&shared);
//!
//! let handle = thread::spawn(move || {
//!     *clone.lock() += 1;
//! });
//!
//! handle.join().unwrap();
//! assert_eq!(*shared.lock(), 1);
//! ```
//!
//! Tuning the detector:
//!
//! ```rust
//! use std::time::Duration;
//!
//! lockup::write_locked(|opts| {
//!     // Report any acquisition stuck for more than five seconds.
//!     opts.deadlock_timeout = Duration::from_secs(5);
//!     // Include every known thread's stack in timeout reports.
//!     opts.print_all_threads = true;
//!     // Count detections instead of panicking.
//!     opts.on_potential_deadlock = Some(std::sync::Arc::new(|| {
//!         eprintln!("potential deadlock!");
//!     }));
//! });
//! ```
//!
//! The callback must not touch any instrumented lock: it can run while the
//! detector's internal table lock is held, and re-entering the engine from
//! there would deadlock the detector itself.
//!
//! ## Build configuration
//!
//! Instrumentation is selected at compile time. The `deadlock` feature (on
//! by default) enables it; building with the thread sanitizer enables it as
//! well; the `nodeadlock` feature forces the pass-through build no matter
//! what. The pass-through build reduces both lock types to `#[inline]`
//! forwards over the underlying primitives, and [`ENABLED`] tells which
//! build is active.

mod options;
mod types;

#[cfg(deadlock_detection)]
mod core;
#[cfg(not(deadlock_detection))]
mod passthrough;

pub use options::{read_locked, write_locked, DeadlockCallback, LogSink, Options};
pub use types::{LockId, TaskId};

#[cfg(deadlock_detection)]
pub use crate::core::locks::mutex::{Mutex, MutexGuard};
#[cfg(deadlock_detection)]
pub use crate::core::locks::rwlock::{
    ReadLocker, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

#[cfg(not(deadlock_detection))]
pub use passthrough::{
    Mutex, MutexGuard, ReadLocker, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

/// True when the instrumented build is active, false in the pass-through
/// build.
#[cfg(deadlock_detection)]
pub const ENABLED: bool = true;
/// True when the instrumented build is active, false in the pass-through
/// build.
#[cfg(not(deadlock_detection))]
pub const ENABLED: bool = false;

/// The plain exclusive-lock interface.
///
/// Implemented by [`Mutex`] (exclusive), [`RwLock`] (exclusive via `write`),
/// and [`ReadLocker`] (shared operations behind the exclusive interface), so
/// code can be generic over "something lockable" regardless of mode.
pub trait Lockable {
    /// Guard released on drop.
    type Guard<'a>
    where
        Self: 'a;

    /// Acquire the lock, blocking until it is available.
    fn lock(&self) -> Self::Guard<'_>;

    /// Attempt to acquire the lock without blocking.
    fn try_lock(&self) -> Option<Self::Guard<'_>>;
}
