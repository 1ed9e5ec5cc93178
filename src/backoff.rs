use crate::sync::spin_hint;
use core::cell::Cell;

const SPIN_LIMIT: u32 = 7;

/// Exponential spin backoff for poll loops.
///
/// Grace-period detection busy-waits on peer thread records. A `Backoff`
/// spaces successive polls further and further apart to keep cache traffic
/// down without ever putting the calling thread to sleep.
pub struct Backoff {
    step: Cell<u32>,
}

impl Backoff {
    pub fn new() -> Self {
        Self { step: Cell::new(0) }
    }

    /// Restart the progression, typically when moving on to the next record.
    pub fn reset(&self) {
        self.step.set(0);
    }

    /// Spin for `2^step` iterations and bump the step up to a fixed cap.
    pub fn spin(&self) {
        let step = self.step.get();

        for _ in 0..1u32 << step {
            spin_hint();
        }

        if step < SPIN_LIMIT {
            self.step.set(step + 1);
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{Backoff, SPIN_LIMIT};

    #[test]
    fn step_caps_at_limit() {
        let backoff = Backoff::new();

        for _ in 0..SPIN_LIMIT + 4 {
            backoff.spin();
        }

        assert_eq!(backoff.step.get(), SPIN_LIMIT);
        backoff.reset();
        assert_eq!(backoff.step.get(), 0);
    }
}
