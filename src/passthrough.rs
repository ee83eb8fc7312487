//! Zero-overhead pass-through build.
//!
//! When detection is compiled out, the public lock types become thin
//! `#[inline]` forwards over the underlying primitives with no bookkeeping
//! of any kind, so enabling or disabling the detector never changes the
//! shape of user code.

use std::ops::{Deref, DerefMut};

use parking_lot::{
    Mutex as RawMutex, MutexGuard as RawMutexGuard, RwLock as RawRwLock,
    RwLockReadGuard as RawReadGuard, RwLockWriteGuard as RawWriteGuard,
};

use crate::Lockable;

/// A mutual-exclusion lock; alias of the underlying primitive.
pub struct Mutex<T: ?Sized> {
    inner: RawMutex<T>,
}

/// Guard returned by [`Mutex::lock`].
pub struct MutexGuard<'a, T: ?Sized> {
    guard: RawMutexGuard<'a, T>,
}

impl<T> Mutex<T> {
    #[inline]
    pub fn new(value: T) -> Self {
        Mutex {
            inner: RawMutex::new(value),
        }
    }

    #[inline]
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T: ?Sized> Mutex<T> {
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, T> {
        MutexGuard {
            guard: self.inner.lock(),
        }
    }

    #[inline]
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        self.inner.try_lock().map(|guard| MutexGuard { guard })
    }

    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }
}

impl<T: Default> Default for Mutex<T> {
    #[inline]
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> From<T> for Mutex<T> {
    #[inline]
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: ?Sized> Lockable for Mutex<T> {
    type Guard<'a>
        = MutexGuard<'a, T>
    where
        Self: 'a;

    #[inline]
    fn lock(&self) -> MutexGuard<'_, T> {
        Mutex::lock(self)
    }

    #[inline]
    fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        Mutex::try_lock(self)
    }
}

impl<T: ?Sized> Deref for MutexGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T: ?Sized> DerefMut for MutexGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

/// A reader-writer lock; alias of the underlying primitive.
pub struct RwLock<T: ?Sized> {
    inner: RawRwLock<T>,
}

/// Guard returned by [`RwLock::read`].
pub struct RwLockReadGuard<'a, T: ?Sized> {
    guard: RawReadGuard<'a, T>,
}

/// Guard returned by [`RwLock::write`].
pub struct RwLockWriteGuard<'a, T: ?Sized> {
    guard: RawWriteGuard<'a, T>,
}

impl<T> RwLock<T> {
    #[inline]
    pub fn new(value: T) -> Self {
        RwLock {
            inner: RawRwLock::new(value),
        }
    }

    #[inline]
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T: ?Sized> RwLock<T> {
    #[inline]
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        RwLockReadGuard {
            guard: self.inner.read(),
        }
    }

    #[inline]
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        RwLockWriteGuard {
            guard: self.inner.write(),
        }
    }

    #[inline]
    pub fn try_read(&self) -> Option<RwLockReadGuard<'_, T>> {
        self.inner.try_read().map(|guard| RwLockReadGuard { guard })
    }

    #[inline]
    pub fn try_write(&self) -> Option<RwLockWriteGuard<'_, T>> {
        self.inner
            .try_write()
            .map(|guard| RwLockWriteGuard { guard })
    }

    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }

    #[inline]
    pub fn read_locker(&self) -> ReadLocker<'_, T> {
        ReadLocker { lock: self }
    }
}

impl<T: Default> Default for RwLock<T> {
    #[inline]
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> From<T> for RwLock<T> {
    #[inline]
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: ?Sized> Lockable for RwLock<T> {
    type Guard<'a>
        = RwLockWriteGuard<'a, T>
    where
        Self: 'a;

    #[inline]
    fn lock(&self) -> RwLockWriteGuard<'_, T> {
        self.write()
    }

    #[inline]
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
    #[inline]
    pub fn lock(&self) -> RwLockReadGuard<'rw, T> {
        self.lock.read()
    }

    #[inline]
    pub fn try_lock(&self) -> Option<RwLockReadGuard<'rw, T>> {
        self.lock.try_read()
    }
}

impl<T: ?Sized> Lockable for ReadLocker<'_, T> {
    type Guard<'a>
        = RwLockReadGuard<'a, T>
    where
        Self: 'a;

    #[inline]
    fn lock(&self) -> RwLockReadGuard<'_, T> {
        ReadLocker::lock(self)
    }

    #[inline]
    fn try_lock(&self) -> Option<RwLockReadGuard<'_, T>> {
        ReadLocker::try_lock(self)
    }
}

impl<T: ?Sized> Deref for RwLockReadGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T: ?Sized> Deref for RwLockWriteGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T: ?Sized> DerefMut for RwLockWriteGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}
