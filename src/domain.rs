use crate::backoff::Backoff;
use crate::barrier;
use crate::cache_padded::CachePadded;
use crate::control::{AtomicControlWord, ControlWord};
use crate::flavor::{Blocking, Flavor};
use crate::guard::ThreadHandle;
use crate::mutex::TicketMutex;
use crate::registry::{Registry, DEFAULT_CAPACITY};
use crate::retired::Retired;
use crate::sync::{fence, Ordering};
use core::marker::PhantomData;

/// A grace-period reclamation domain.
///
/// The domain owns the global control word and the thread registry for one
/// independent family of protected structures. It is an explicit object:
/// the application constructs it, hands out references (or wraps it in an
/// `Arc`), and drops it at teardown once every thread has detached. There
/// is no process-wide instance and domains never interact.
///
/// Readers attach once per thread with [`attach`](Domain::attach) and
/// bracket each lock-free traversal with
/// [`ThreadHandle::enter`](crate::ThreadHandle::enter). Writers call
/// [`retire`](Domain::retire), [`batch_retire`](Domain::batch_retire) or
/// [`synchronize`](Domain::synchronize) after unlinking nodes.
///
/// `F` selects the grace-period flavor at compile time; the default
/// [`Blocking`] flavor suits most callers.
pub struct Domain<F: Flavor = Blocking> {
    global: CachePadded<AtomicControlWord>,
    registry: Registry,
    reclaim_lock: TicketMutex<()>,
    _flavor: PhantomData<F>,
}

impl<F: Flavor> Domain<F> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// A domain supporting at most `capacity` concurrently attached
    /// threads. Record storage is allocated up front and never grows;
    /// detached slots are recycled.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            global: CachePadded::new(AtomicControlWord::new(ControlWord::INITIAL)),
            registry: Registry::new(capacity),
            reclaim_lock: TicketMutex::new(()),
            _flavor: PhantomData,
        }
    }

    /// Attach the current OS thread. The handle must stay on this thread
    /// and must be dropped (detaching it) before the domain itself.
    pub fn attach(&self) -> ThreadHandle<'_, F> {
        ThreadHandle::new(self, self.registry.alloc())
    }

    /// The current global control word.
    ///
    /// Lock-free readers use this to test the phase without synchronizing;
    /// the word's nesting bits are pinned to 1 so that an entering reader
    /// can copy it straight into its record.
    pub fn control_word(&self, order: Ordering) -> ControlWord {
        self.global.load(order)
    }

    /// Wait until every critical section active at the call completes.
    ///
    /// On return, writes made before the call are visible to any reader
    /// entering afterwards, and reads performed inside the waited-on
    /// sections happened before it. The wait busy-spins with backoff;
    /// there is no timeout. A reader that never exits its section blocks
    /// this call forever, and calling it while the current thread holds a
    /// [`Critical`](crate::Critical) guard on this domain deadlocks; both
    /// are contract violations by the caller.
    pub fn synchronize(&self) {
        fence(Ordering::Acquire);

        {
            let _serial = self.reclaim_lock.lock();

            // A reader may have sampled the old phase right before the
            // first flip and still be mid-section when its poll drains.
            // The second flip forces every such straggler to complete one
            // full section inside the new phase, which proves it started
            // after the first flip finished.
            self.flip_and_wait();
            self.flip_and_wait();
        }

        fence(Ordering::Release);
    }

    /// Retire `retired` and reclaim it before returning.
    ///
    /// Non-buffering: every call pays a full grace period. Writers
    /// retiring in bulk should prefer [`batch_retire`](Domain::batch_retire).
    pub fn retire(&self, retired: Retired) {
        self.synchronize();
        retired.run();
    }

    /// Retire a batch behind a single grace period.
    ///
    /// Returns only after every callback in the batch has run.
    pub fn batch_retire<I>(&self, batch: I)
    where
        I: IntoIterator<Item = Retired>,
    {
        self.synchronize();

        for retired in batch {
            retired.run();
        }
    }

    /// Force-detach every attached thread.
    ///
    /// Shutdown escape hatch for threads that exited without dropping
    /// their handles. Must not run concurrently with those threads still
    /// using their records.
    pub fn detach_all(&self) {
        self.registry.detach_all();
    }

    /// Maximum number of concurrently attached threads.
    pub fn capacity(&self) -> usize {
        self.registry.capacity()
    }

    /// Peak number of threads ever attached at the same time.
    pub fn high_water(&self) -> usize {
        self.registry.high_water()
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.registry
    }

    fn flip_and_wait(&self) {
        self.global.flip_phase();
        F::reclaimer_fence();

        let global = self.global.load(Ordering::Relaxed);
        let backoff = Backoff::new();

        for record in self.registry.iter() {
            backoff.reset();

            while record.blocks_grace_period(global) {
                if F::ACCELERATED && record.request_fence() {
                    barrier::process_barrier();
                }

                backoff.spin();
            }
        }
    }
}

impl<F: Flavor> Default for Domain<F> {
    fn default() -> Self {
        Self::new()
    }
}
