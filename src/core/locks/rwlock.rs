//! An instrumented reader-writer lock.
//!
//! Shared and exclusive acquisitions of the same `RwLock` share one lock
//! identity, so the detector sees upgrade attempts (`read` then `write` on
//! the same thread) as recursive locking and cross-thread orderings work
//! regardless of mode.
//!
//! Holder tracking keeps only the latest observed holder per lock: with
//! several concurrent readers, the record reflects the most recent one and
//! is cleared by whichever reader unlocks first. Reports may therefore
//! understate shared ownership; detection of stalls and orderings is
//! unaffected.

use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};

use parking_lot::{
    RwLock as RawRwLock, RwLockReadGuard as RawReadGuard, RwLockWriteGuard as RawWriteGuard,
};

use crate::core::locks;
use crate::types::LockId;
use crate::Lockable;

/// A reader-writer lock with deadlock detection.
///
/// Re-acquiring a lock the thread already holds, shared or exclusive, is
/// itself reported as a potential deadlock, so guards should be released
/// before the same thread touches the lock again.
///
/// # Example
///
/// ```rust
/// use lockup::RwLock;
///
/// let lock = RwLock::new(5);
///
/// {
///     let r = lock.read();
///     assert_eq!(*r, 5);
/// }
///
/// {
///     let mut w = lock.write();
///     *w += 1;
/// }
/// assert_eq!(*lock.read(), 6);
/// ```
pub struct RwLock<T: ?Sized> {
    id: LockId,
    inner: RawRwLock<T>,
}

/// Releases a shared lock and clears the holder record when dropped.
pub struct RwLockReadGuard<'a, T: ?Sized> {
    guard: ManuallyDrop<RawReadGuard<'a, T>>,
    lock: LockId,
}

/// Releases an exclusive lock and clears the holder record when dropped.
pub struct RwLockWriteGuard<'a, T: ?Sized> {
    guard: ManuallyDrop<RawWriteGuard<'a, T>>,
    lock: LockId,
}

impl<T> RwLock<T> {
    /// Create a new instrumented reader-writer lock holding `value`.
    pub fn new(value: T) -> Self {
        RwLock {
            id: locks::next_lock_id(),
            inner: RawRwLock::new(value),
        }
    }

    /// Consume the lock, returning the underlying data.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T: ?Sized> RwLock<T> {
    /// Acquire the lock shared, blocking until no writer holds or awaits it.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        let guard = locks::acquire(self.id, || self.inner.try_read(), || self.inner.read());
        RwLockReadGuard {
            guard: ManuallyDrop::new(guard),
            lock: self.id,
        }
    }

    /// Acquire the lock exclusively, blocking until it is available.
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        let guard = locks::acquire(self.id, || self.inner.try_write(), || self.inner.write());
        RwLockWriteGuard {
            guard: ManuallyDrop::new(guard),
            lock: self.id,
        }
    }

    /// Attempt to acquire the lock shared without blocking.
    pub fn try_read(&self) -> Option<RwLockReadGuard<'_, T>> {
        let guard = locks::try_acquire(self.id, || self.inner.try_read())?;
        Some(RwLockReadGuard {
            guard: ManuallyDrop::new(guard),
            lock: self.id,
        })
    }

    /// Attempt to acquire the lock exclusively without blocking.
    pub fn try_write(&self) -> Option<RwLockWriteGuard<'_, T>> {
        let guard = locks::try_acquire(self.id, || self.inner.try_write())?;
        Some(RwLockWriteGuard {
            guard: ManuallyDrop::new(guard),
            lock: self.id,
        })
    }

    /// Get mutable access to the underlying data without locking.
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }

    /// View this lock through the plain exclusive-lock interface, with
    /// `lock` and `try_lock` delegating to the shared operations.
    ///
    /// The view borrows the parent's identity: shared and exclusive
    /// acquisitions land in the same holder slot.
    pub fn read_locker(&self) -> ReadLocker<'_, T> {
        ReadLocker { lock: self }
    }
}

impl<T: Default> Default for RwLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> From<T> for RwLock<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: ?Sized> Lockable for RwLock<T> {
    type Guard<'a>
        = RwLockWriteGuard<'a, T>
    where
        Self: 'a;

    fn lock(&self) -> RwLockWriteGuard<'_, T> {
        self.write()
    }

    fn try_lock(&self) -> Option<RwLockWriteGuard<'_, T>> {
        self.try_write()
    }
}

/// Shared-mode view of an [`RwLock`] satisfying the exclusive-lock
/// interface.
pub struct ReadLocker<'rw, T: ?Sized> {
    lock: &'rw RwLock<T>,
}

impl<'rw, T: ?Sized> ReadLocker<'rw, T> {
    /// Acquire the parent lock shared.
    pub fn lock(&self) -> RwLockReadGuard<'rw, T> {
        self.lock.read()
    }

    /// Attempt to acquire the parent lock shared without blocking.
    pub fn try_lock(&self) -> Option<RwLockReadGuard<'rw, T>> {
        self.lock.try_read()
    }
}

impl<T: ?Sized> Lockable for ReadLocker<'_, T> {
    type Guard<'a>
        = RwLockReadGuard<'a, T>
    where
        Self: 'a;

    fn lock(&self) -> RwLockReadGuard<'_, T> {
        ReadLocker::lock(self)
    }

    fn try_lock(&self) -> Option<RwLockReadGuard<'_, T>> {
        ReadLocker::try_lock(self)
    }
}

impl<T: ?Sized> Deref for RwLockReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T: ?Sized> Drop for RwLockReadGuard<'_, T> {
    fn drop(&mut self) {
        unsafe { ManuallyDrop::drop(&mut self.guard) };
        locks::release(self.lock);
    }
}

impl<T: ?Sized> Deref for RwLockWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T: ?Sized> DerefMut for RwLockWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T: ?Sized> Drop for RwLockWriteGuard<'_, T> {
    fn drop(&mut self) {
        unsafe { ManuallyDrop::drop(&mut self.guard) };
        locks::release(self.lock);
    }
}
