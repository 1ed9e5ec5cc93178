use crate::sync::{AtomicU32, Ordering};

/// Top bit of a control word: the grace-period phase.
const PHASE_BIT: u32 = 0x8000_0000;

/// Low 31 bits: the critical-section nesting count.
const NEST_MASK: u32 = PHASE_BIT - 1;

/// Snapshot of a control word.
///
/// The same layout serves two roles. The domain-wide global word carries the
/// current phase with its nesting bits pinned to 1, so an entering reader
/// can publish "active, nesting 1, current phase" with a single copy. A
/// thread record's access-control word carries the phase the thread entered
/// under plus its live nesting depth; nesting 0 means quiescent.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ControlWord {
    raw: u32,
}

impl ControlWord {
    /// Initial global word: phase 0, nesting bits pinned to 1.
    pub(crate) const INITIAL: Self = Self::from_raw(1);

    /// A quiescent access-control word.
    pub(crate) const IDLE: Self = Self::from_raw(0);

    pub(crate) const fn from_raw(raw: u32) -> Self {
        Self { raw }
    }

    /// The phase bit, as a bare flag. Reclaimers toggle it once per flip.
    pub fn phase(self) -> bool {
        self.raw & PHASE_BIT != 0
    }

    /// Critical-section nesting depth encoded in this word.
    pub fn nesting(self) -> u32 {
        self.raw & NEST_MASK
    }

    pub(crate) fn same_phase(self, other: ControlWord) -> bool {
        (self.raw ^ other.raw) & PHASE_BIT == 0
    }
}

pub(crate) struct AtomicControlWord {
    raw: AtomicU32,
}

impl AtomicControlWord {
    pub fn new(word: ControlWord) -> Self {
        Self {
            raw: AtomicU32::new(word.raw),
        }
    }

    pub fn load(&self, order: Ordering) -> ControlWord {
        ControlWord::from_raw(self.raw.load(order))
    }

    pub fn store(&self, word: ControlWord, order: Ordering) {
        self.raw.store(word.raw, order);
    }

    /// Bump the nesting count. Only the owning thread writes its own word,
    /// so a relaxed increment suffices.
    pub fn increment_nesting(&self) {
        self.raw.fetch_add(1, Ordering::Relaxed);
    }

    /// Drop one nesting level, releasing the reads performed inside the
    /// section. Returns the remaining depth.
    pub fn decrement_nesting(&self) -> u32 {
        let previous = ControlWord::from_raw(self.raw.fetch_sub(1, Ordering::Release));
        debug_assert!(
            previous.nesting() != 0,
            "critical-section exit without a matching enter"
        );
        previous.nesting() - 1
    }

    /// Toggle the grace-period phase. Sequentially consistent so the flip is
    /// globally ordered against reader entry fences.
    pub fn flip_phase(&self) {
        self.raw.fetch_xor(PHASE_BIT, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::{AtomicControlWord, ControlWord};
    use crate::sync::Ordering;

    #[test]
    fn global_word_layout() {
        let word = ControlWord::INITIAL;
        assert!(!word.phase());
        assert_eq!(word.nesting(), 1);
        assert_eq!(ControlWord::IDLE.nesting(), 0);
    }

    #[test]
    fn flip_changes_phase_only() {
        let atomic = AtomicControlWord::new(ControlWord::INITIAL);
        atomic.flip_phase();

        let word = atomic.load(Ordering::Relaxed);
        assert!(word.phase());
        assert_eq!(word.nesting(), 1);
        assert!(!word.same_phase(ControlWord::INITIAL));

        atomic.flip_phase();
        assert!(atomic.load(Ordering::Relaxed).same_phase(ControlWord::INITIAL));
    }

    #[test]
    fn nesting_round_trip() {
        let atomic = AtomicControlWord::new(ControlWord::IDLE);
        atomic.store(ControlWord::INITIAL, Ordering::Relaxed);
        atomic.increment_nesting();
        assert_eq!(atomic.load(Ordering::Relaxed).nesting(), 2);
        assert_eq!(atomic.decrement_nesting(), 1);
        assert_eq!(atomic.decrement_nesting(), 0);
    }
}
