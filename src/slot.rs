//! Single-value mailbox shared between transport callbacks and consumers
//!
//! A [`SyncSlot`] holds exactly one value behind a mutex. The transport's
//! callback task overwrites it with every inbound payload and the consumer
//! drains it on its own schedule, so the last write before a `take` wins.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;

/// Mutex-guarded single-value container with atomic write and read-and-clear
#[derive(Debug, Default)]
pub struct SyncSlot<T> {
    value: Mutex<T>,
}

/// Slot type shared by a subscriber's callback and its consumer
pub type SharedSlot = Arc<SyncSlot<Bytes>>;

impl<T> SyncSlot<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: Mutex::new(value),
        }
    }

    /// Create a reference-counted slot ready to be handed to a subscriber
    pub fn shared() -> Arc<Self>
    where
        T: Default,
    {
        Arc::new(Self::default())
    }

    /// Replace the held value, discarding anything not yet taken
    pub fn write(&self, value: T) {
        *self.lock() = value;
    }

    /// Return the held value and leave the empty/default value behind
    pub fn take(&self) -> T
    where
        T: Default,
    {
        std::mem::take(&mut *self.lock())
    }

    /// Run `f` against the held value while the guard is held
    ///
    /// Keep `f` short: it runs with the slot locked.
    pub fn apply<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.lock())
    }

    // A panic while holding the guard can only come from a caller's `apply`
    // closure; the value is still whole, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, T> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
