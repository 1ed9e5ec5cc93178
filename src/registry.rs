use crate::cache_padded::CachePadded;
use crate::record::ThreadRecord;
use crate::sync::{AtomicUsize, Ordering};

pub(crate) const DEFAULT_CAPACITY: usize = 1024;

/// Fixed arena of thread records.
///
/// Slots are claimed lock-free on attach and recycled on detach. Storage
/// never grows or shrinks after construction, so grace-period detection can
/// scan concurrently with attach and detach without ever touching freed
/// memory. The claimed prefix only grows with the peak number of
/// concurrently attached threads, not with the total attach count.
pub(crate) struct Registry {
    slots: Box<[CachePadded<ThreadRecord>]>,
    high_water: CachePadded<AtomicUsize>,
}

impl Registry {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity != 0, "registry capacity must be non-zero");

        let slots = (0..capacity)
            .map(|_| CachePadded::new(ThreadRecord::new()))
            .collect();

        Self {
            slots,
            high_water: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    /// Claim the lowest free slot. Lock-free: a failed claim means another
    /// thread took that slot, so move on to the next.
    pub fn alloc(&self) -> usize {
        for (index, slot) in self.slots.iter().enumerate() {
            if slot.try_claim() {
                slot.begin_use();
                self.raise_high_water(index + 1);
                return index;
            }
        }

        panic!(
            "thread registry exhausted: {} threads already attached",
            self.slots.len()
        );
    }

    /// Owner-side detach of a previously allocated slot.
    pub fn retire(&self, index: usize) {
        self.slots[index].release();
    }

    pub fn record(&self, index: usize) -> &ThreadRecord {
        &self.slots[index]
    }

    /// Force every live record quiescent and free its slot. Only sound once
    /// no attached thread will touch its record again.
    pub fn detach_all(&self) {
        for slot in self.claimed() {
            if slot.is_live() {
                slot.release();
            }
        }
    }

    /// Iterate the claimed prefix, skipping free slots. Over-inclusive by
    /// design: a slot claimed mid-iteration may show up, a slot released
    /// mid-iteration reads as quiescent. No record active at the start of
    /// iteration is omitted.
    pub fn iter(&self) -> impl Iterator<Item = &ThreadRecord> + '_ {
        self.claimed().filter(|record| record.is_live())
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Peak number of simultaneously claimed slots.
    pub fn high_water(&self) -> usize {
        self.high_water.load(Ordering::Acquire)
    }

    fn claimed(&self) -> impl Iterator<Item = &ThreadRecord> + '_ {
        let used = self.high_water().min(self.slots.len());
        self.slots[..used].iter().map(|slot| &**slot)
    }

    fn raise_high_water(&self, used: usize) {
        let mut current = self.high_water.load(Ordering::Relaxed);

        while current < used {
            match self.high_water.compare_exchange(
                current,
                used,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Registry;

    #[test]
    fn alloc_prefers_lowest_slot() {
        let registry = Registry::new(8);

        assert_eq!(registry.alloc(), 0);
        assert_eq!(registry.alloc(), 1);

        registry.retire(0);
        assert_eq!(registry.alloc(), 0);
        assert_eq!(registry.high_water(), 2);
    }

    #[test]
    fn reuse_bumps_generation() {
        let registry = Registry::new(4);

        let index = registry.alloc();
        let first = registry.record(index).generation();
        registry.retire(index);

        let again = registry.alloc();
        assert_eq!(again, index);
        assert_eq!(registry.record(index).generation(), first + 1);
    }

    #[test]
    fn sequential_churn_stays_bounded() {
        let registry = Registry::new(64);

        for _ in 0..100 {
            let index = registry.alloc();
            registry.retire(index);
        }

        assert_eq!(registry.high_water(), 1);
    }

    #[test]
    fn iter_skips_free_slots() {
        let registry = Registry::new(8);

        let a = registry.alloc();
        let _b = registry.alloc();
        registry.retire(a);

        assert_eq!(registry.iter().count(), 1);
    }

    #[test]
    fn detach_all_frees_live_slots() {
        let registry = Registry::new(8);

        registry.alloc();
        registry.alloc();
        registry.detach_all();

        assert_eq!(registry.iter().count(), 0);
        assert_eq!(registry.alloc(), 0);
    }

    #[test]
    #[should_panic(expected = "thread registry exhausted")]
    fn exhaustion_panics() {
        let registry = Registry::new(2);

        registry.alloc();
        registry.alloc();
        registry.alloc();
    }
}
