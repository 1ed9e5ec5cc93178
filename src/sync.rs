//! Switchable synchronization primitives.
//!
//! Under `--cfg loom` with the `loom` feature the whole crate runs on loom's
//! model-checked atomics instead of the real ones.

#[cfg(feature = "loom")]
pub(crate) use loom::sync::atomic::{
    fence, AtomicBool, AtomicU32, AtomicU8, AtomicUsize, Ordering,
};

#[cfg(not(feature = "loom"))]
pub(crate) use core::sync::atomic::{
    fence, AtomicBool, AtomicU32, AtomicU8, AtomicUsize, Ordering,
};

#[cfg(feature = "loom")]
pub(crate) fn spin_hint() {
    // Spinning without yielding starves the loom scheduler.
    loom::thread::yield_now();
}

#[cfg(not(feature = "loom"))]
pub(crate) fn spin_hint() {
    core::hint::spin_loop();
}
