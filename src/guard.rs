use crate::domain::Domain;
use crate::flavor::Flavor;
use crate::record::ThreadRecord;
use crate::sync::Ordering;
use core::marker::PhantomData;

/// Attachment of the current OS thread to a [`Domain`].
///
/// A thread attaches once before its first read-side critical section and
/// stays attached for as long as it uses any structure protected by the
/// domain. Dropping the handle detaches the thread and recycles its
/// registry slot.
///
/// The handle is deliberately `!Send`: the registry recycles a slot only
/// when the thread that claimed it releases it.
pub struct ThreadHandle<'d, F: Flavor> {
    domain: &'d Domain<F>,
    index: usize,
    _not_send: PhantomData<*mut ()>,
}

impl<'d, F: Flavor> ThreadHandle<'d, F> {
    pub(crate) fn new(domain: &'d Domain<F>, index: usize) -> Self {
        Self {
            domain,
            index,
            _not_send: PhantomData,
        }
    }

    /// Enter a read-side critical section.
    ///
    /// Guards nest: re-entering through an already active handle only bumps
    /// the nesting count, and the thread stays visible to reclaimers until
    /// the outermost guard is dropped.
    pub fn enter(&self) -> Critical<'_, F> {
        Critical::new(self)
    }

    fn record(&self) -> &'d ThreadRecord {
        self.domain.registry().record(self.index)
    }
}

impl<'d, F: Flavor> Drop for ThreadHandle<'d, F> {
    fn drop(&mut self) {
        self.domain.registry().retire(self.index);
    }
}

/// RAII read-side critical section.
///
/// While any `Critical` for a thread is alive, every pointer the thread can
/// reach through the protected structure stays allocated; reclaimers wait
/// for the section to end. Keep sections short: a guard held forever blocks
/// every [`Domain::synchronize`] forever.
pub struct Critical<'a, F: Flavor> {
    handle: &'a ThreadHandle<'a, F>,
}

impl<'a, F: Flavor> Critical<'a, F> {
    fn new(handle: &'a ThreadHandle<'a, F>) -> Self {
        let record = handle.record();
        record.fence_safe_point();

        // The owning thread is the only writer of its access word, so the
        // relaxed read of the nesting depth cannot race.
        if record.load_access(Ordering::Relaxed).nesting() == 0 {
            let global = handle.domain.control_word(Ordering::Relaxed);
            record.publish_entry(global);
            F::reader_fence();
        } else {
            record.nest();
        }

        Self { handle }
    }
}

impl<'a, F: Flavor> Clone for Critical<'a, F> {
    /// Re-enters the section, adding one nesting level.
    fn clone(&self) -> Self {
        Self::new(self.handle)
    }
}

impl<'a, F: Flavor> Drop for Critical<'a, F> {
    fn drop(&mut self) {
        let record = self.handle.record();

        if record.unnest() == 0 {
            record.fence_safe_point();
        }
    }
}
