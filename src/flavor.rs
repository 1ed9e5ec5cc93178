use crate::barrier;
use crate::sync::{fence, Ordering};

mod sealed {
    pub trait Sealed {}
}

/// Build-time grace-period flavor of a [`Domain`](crate::Domain).
///
/// The flavor decides who pays for the ordering between a reader publishing
/// its critical-section entry and a reclaimer flipping the phase. It is a
/// fixed property of the domain type, chosen at compile time; only
/// [`Blocking`] and [`Accelerated`] implement it.
pub trait Flavor: sealed::Sealed + Send + Sync + 'static {
    /// Whether detection may nudge laggard readers through their
    /// fence-request safe points.
    #[doc(hidden)]
    const ACCELERATED: bool;

    /// Runs after a reader publishes its entry word.
    #[doc(hidden)]
    fn reader_fence();

    /// Runs after a reclaimer flips the global phase.
    #[doc(hidden)]
    fn reclaimer_fence();
}

/// General-purpose flavor.
///
/// Readers pay a full fence on outermost critical-section entry, so a
/// reclaimer can detect quiescence by polling alone. This is the simplest
/// flavor and the right default: it needs nothing from the OS and its
/// read-side cost is one `SeqCst` fence.
pub struct Blocking;

impl sealed::Sealed for Blocking {}

impl Flavor for Blocking {
    const ACCELERATED: bool = false;

    fn reader_fence() {
        fence(Ordering::SeqCst);
    }

    fn reclaimer_fence() {
        // Pairs with the reader's entry fence: without it the acquire
        // polls are not ordered against an entry word published under the
        // old phase and the wait can miss a live reader.
        fence(Ordering::SeqCst);
    }
}

/// Barrier-accelerated flavor.
///
/// Read-side entry is only a compiler fence on platforms with a
/// process-wide barrier. The reclaimer pays instead: after each phase flip
/// it forces a full fence on every thread in the process, and it nudges
/// readers that still block the grace period through their per-record
/// fence-request flag. Without the `fast-barrier` feature this flavor is
/// correct but waits like [`Blocking`] does.
pub struct Accelerated;

impl sealed::Sealed for Accelerated {}

impl Flavor for Accelerated {
    const ACCELERATED: bool = true;

    fn reader_fence() {
        barrier::reader_barrier();
    }

    fn reclaimer_fence() {
        barrier::process_barrier();
    }
}
