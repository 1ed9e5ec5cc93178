use crate::control::{AtomicControlWord, ControlWord};
use crate::sync::{fence, AtomicBool, AtomicU32, AtomicU8, Ordering};

const SLOT_FREE: u8 = 0;
const SLOT_LIVE: u8 = 1;

/// Per-thread control block, stored in a fixed registry slot.
///
/// The owning thread is the only writer of `access_control` outside of
/// shutdown; reclaimers read it while detecting a grace period.
/// `needs_fence` is written by reclaimers requesting a full fence and
/// cleared by the owner at its safe points (critical-section entry and
/// exit), replacing the asynchronous signal handler of classic user-space
/// RCU with a cooperative handshake.
pub(crate) struct ThreadRecord {
    access_control: AtomicControlWord,
    needs_fence: AtomicBool,
    state: AtomicU8,
    generation: AtomicU32,
}

impl ThreadRecord {
    pub fn new() -> Self {
        Self {
            access_control: AtomicControlWord::new(ControlWord::IDLE),
            needs_fence: AtomicBool::new(false),
            state: AtomicU8::new(SLOT_FREE),
            generation: AtomicU32::new(0),
        }
    }

    /// Try to take ownership of this slot for an attaching thread.
    pub fn try_claim(&self) -> bool {
        self.state
            .compare_exchange(SLOT_FREE, SLOT_LIVE, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Reset a freshly claimed slot before the owner starts using it. A
    /// stale fence request from the previous tenant must not leak into the
    /// new one.
    pub fn begin_use(&self) {
        self.generation.fetch_add(1, Ordering::Relaxed);
        self.needs_fence.store(false, Ordering::Relaxed);
        self.access_control.store(ControlWord::IDLE, Ordering::Release);
    }

    /// Owner-side detach: publish quiescence and return the slot to the
    /// free pool for reuse by a future attach.
    pub fn release(&self) {
        self.access_control.store(ControlWord::IDLE, Ordering::Release);
        self.needs_fence.store(false, Ordering::Relaxed);
        self.state.store(SLOT_FREE, Ordering::Release);
    }

    pub fn is_live(&self) -> bool {
        self.state.load(Ordering::Acquire) == SLOT_LIVE
    }

    #[cfg(test)]
    pub fn generation(&self) -> u32 {
        self.generation.load(Ordering::Relaxed)
    }

    /// Whether this record still holds up a grace period against `global`:
    /// inside a critical section it entered under the other phase.
    pub fn blocks_grace_period(&self, global: ControlWord) -> bool {
        let word = self.access_control.load(Ordering::Acquire);
        word.nesting() != 0 && !word.same_phase(global)
    }

    pub fn load_access(&self, order: Ordering) -> ControlWord {
        self.access_control.load(order)
    }

    /// Outermost critical-section entry: copy the global word, which
    /// publishes "active, nesting 1" under the current phase.
    pub fn publish_entry(&self, global: ControlWord) {
        debug_assert_eq!(global.nesting(), 1);
        self.access_control.store(global, Ordering::Relaxed);
    }

    pub fn nest(&self) {
        self.access_control.increment_nesting();
    }

    /// Returns the remaining nesting depth.
    pub fn unnest(&self) -> u32 {
        self.access_control.decrement_nesting()
    }

    /// Reclaimer-side acceleration: ask the owner for a full fence. Returns
    /// true if this call set the flag, false if a request was already
    /// pending. A request landing on a record whose owner has detached is
    /// benign; the slot reads quiescent and the flag is cleared on reuse.
    pub fn request_fence(&self) -> bool {
        self.needs_fence
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }

    /// Owner-side safe point: honour a pending fence request.
    pub fn fence_safe_point(&self) {
        if self.needs_fence.load(Ordering::Relaxed) {
            fence(Ordering::SeqCst);
            self.needs_fence.store(false, Ordering::Release);
        }
    }
}
