use crate::backoff::Backoff;
use crate::cache_padded::CachePadded;
use crate::sync::{AtomicUsize, Ordering};
use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};

/// Fair ticket lock.
///
/// Serializes grace-period detection: at most one reclaimer advances the
/// phase at a time, and waiters are admitted in arrival order so no
/// reclaimer starves. Waiting spins with backoff, keeping the engine free
/// of OS sleep primitives end to end.
pub(crate) struct TicketMutex<T> {
    next_ticket: CachePadded<AtomicUsize>,
    now_serving: CachePadded<AtomicUsize>,
    value: UnsafeCell<T>,
}

impl<T> TicketMutex<T> {
    pub fn new(value: T) -> Self {
        Self {
            next_ticket: CachePadded::new(AtomicUsize::new(0)),
            now_serving: CachePadded::new(AtomicUsize::new(0)),
            value: UnsafeCell::new(value),
        }
    }

    pub fn lock(&self) -> TicketGuard<'_, T> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let backoff = Backoff::new();

        while self.now_serving.load(Ordering::Acquire) != ticket {
            backoff.spin();
        }

        TicketGuard { mutex: self, ticket }
    }
}

unsafe impl<T: Send> Send for TicketMutex<T> {}
unsafe impl<T: Send> Sync for TicketMutex<T> {}

pub(crate) struct TicketGuard<'a, T> {
    mutex: &'a TicketMutex<T>,
    ticket: usize,
}

impl<'a, T> Deref for TicketGuard<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.mutex.value.get() }
    }
}

impl<'a, T> DerefMut for TicketGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.mutex.value.get() }
    }
}

impl<'a, T> Drop for TicketGuard<'a, T> {
    fn drop(&mut self) {
        // Only the guard holder reaches this store, so no exchange needed.
        let next = self.ticket.wrapping_add(1);
        self.mutex.now_serving.store(next, Ordering::Release);
    }
}
