//! An instrumented mutual-exclusion lock.
//!
//! `Mutex` is a drop-in replacement for [`parking_lot::Mutex`] that routes
//! every acquisition through the deadlock detector: recursive and
//! inconsistent lock orderings are reported before blocking, and stalled
//! acquisitions are reported by the watchdog.

use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};

use parking_lot::{Mutex as RawMutex, MutexGuard as RawMutexGuard};

use crate::core::locks;
use crate::types::LockId;
use crate::Lockable;

/// A mutual-exclusion lock with deadlock detection.
///
/// # Example
///
/// ```rust
/// use lockup::Mutex;
/// use std::sync::Arc;
/// use std::thread;
///
/// let counter = Arc::new(Mutex::new(0u32));
/// let clone = Arc::clone(&counter);
///
/// let handle = thread::spawn(move || {
///     *clone.lock() += 1;
/// });
///
/// handle.join().unwrap();
/// assert_eq!(*counter.lock(), 1);
/// ```
pub struct Mutex<T: ?Sized> {
    id: LockId,
    inner: RawMutex<T>,
}

/// Releases the lock and clears the holder record when dropped.
pub struct MutexGuard<'a, T: ?Sized> {
    /// Wrapped so the underlying release runs before the holder record is
    /// cleared.
    guard: ManuallyDrop<RawMutexGuard<'a, T>>,
    lock: LockId,
}

impl<T> Mutex<T> {
    /// Create a new instrumented mutex holding `value`.
    pub fn new(value: T) -> Self {
        Mutex {
            id: locks::next_lock_id(),
            inner: RawMutex::new(value),
        }
    }

    /// Consume the mutex, returning the underlying data.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T: ?Sized> Mutex<T> {
    /// Acquire the lock, blocking until it is available.
    ///
    /// Potential deadlocks are reported to the configured sink and the
    /// notifier is invoked; the acquisition itself proceeds exactly as the
    /// underlying lock would.
    pub fn lock(&self) -> MutexGuard<'_, T> {
        let guard = locks::acquire(self.id, || self.inner.try_lock(), || self.inner.lock());
        MutexGuard {
            guard: ManuallyDrop::new(guard),
            lock: self.id,
        }
    }

    /// Attempt to acquire the lock without blocking.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        let guard = locks::try_acquire(self.id, || self.inner.try_lock())?;
        Some(MutexGuard {
            guard: ManuallyDrop::new(guard),
            lock: self.id,
        })
    }

    /// Get mutable access to the underlying data without locking.
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }
}

impl<T: Default> Default for Mutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> From<T> for Mutex<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: ?Sized> Lockable for Mutex<T> {
    type Guard<'a>
        = MutexGuard<'a, T>
    where
        Self: 'a;

    fn lock(&self) -> MutexGuard<'_, T> {
        Mutex::lock(self)
    }

    fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        Mutex::try_lock(self)
    }
}

impl<T: ?Sized> Deref for MutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T: ?Sized> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T: ?Sized> Drop for MutexGuard<'_, T> {
    fn drop(&mut self) {
        // Release the underlying lock first, then clear the holder record.
        unsafe { ManuallyDrop::drop(&mut self.guard) };
        locks::release(self.lock);
    }
}
