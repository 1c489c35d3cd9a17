//! Double-buffered value shared between the tick loop and the render loop.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Holds a committed value that readers observe and a pending value that a
/// writer on another thread replaces at will.
///
/// The reader promotes the pending value once per frame with
/// [`SynchronizedStorage::apply_pending`], so a frame never observes a value
/// that changes halfway through.
#[derive(Debug, Default)]
pub struct SynchronizedStorage<T> {
    committed: Mutex<T>,
    pending: Mutex<T>,
}

impl<T: Clone> SynchronizedStorage<T> {
    /// Creates storage whose committed and pending values both start as `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            committed: Mutex::new(value.clone()),
            pending: Mutex::new(value),
        }
    }

    /// Value most recently committed by the reader.
    #[must_use]
    pub fn get(&self) -> T {
        lock(&self.committed).clone()
    }

    /// Value waiting to be committed.
    #[must_use]
    pub fn pending(&self) -> T {
        lock(&self.pending).clone()
    }

    /// Replaces the pending value. Called by the writing loop.
    pub fn set(&self, value: T) {
        *lock(&self.pending) = value;
    }

    /// Promotes the pending value to the committed slot. The pending slot
    /// keeps its value, so repeated frames without a new write are stable.
    pub fn apply_pending(&self) {
        let next = self.pending();
        *lock(&self.committed) = next;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
