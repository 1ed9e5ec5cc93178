//! Loom model checks for grace-period soundness.
//!
//! The two-flip protocol claims that a reader observed as active between
//! the flips cannot slip through by re-entering immediately. These models
//! let loom explore the interleavings that claim depends on.
//!
//! Run with:
//! `RUSTFLAGS="--cfg loom" cargo test --test loom --features loom --release`

#![cfg(loom)]

use loom::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use loom::sync::Arc;
use loom::thread;
use quiesce::{Blocking, Domain, Retired};

#[test]
fn reader_holding_old_pointer_blocks_reclaim() {
    let mut builder = loom::model::Builder::new();
    builder.preemption_bound = Some(3);

    builder.check(|| {
        let domain = Arc::new(Domain::<Blocking>::with_capacity(2));
        // 1 stands in for the published node, 0 for "unlinked".
        let shared = Arc::new(AtomicUsize::new(1));
        let freed = Arc::new(AtomicBool::new(false));

        let reader = {
            let domain = Arc::clone(&domain);
            let shared = Arc::clone(&shared);
            let freed = Arc::clone(&freed);

            thread::spawn(move || {
                let handle = domain.attach();
                let section = handle.enter();

                if shared.load(Ordering::Relaxed) == 1 {
                    // Still reachable from inside the section, so the
                    // grace period cannot have completed.
                    assert!(!freed.load(Ordering::Relaxed));
                }

                drop(section);
            })
        };

        shared.store(0, Ordering::Relaxed);
        domain.synchronize();
        freed.store(true, Ordering::Relaxed);

        reader.join().unwrap();
    });
}

#[test]
fn reentering_reader_does_not_stall_or_break_reclaim() {
    let mut builder = loom::model::Builder::new();
    builder.preemption_bound = Some(3);

    builder.check(|| {
        let domain = Arc::new(Domain::<Blocking>::with_capacity(2));
        let drops = Arc::new(AtomicUsize::new(0));

        let reader = {
            let domain = Arc::clone(&domain);

            thread::spawn(move || {
                let handle = domain.attach();
                // Back-to-back sections straddling the flips.
                drop(handle.enter());
                drop(handle.enter());
            })
        };

        let payload = Arc::clone(&drops);
        let retired = Retired::boxed(Box::new(NotifyDrop(payload)));
        domain.retire(retired);
        assert_eq!(drops.load(Ordering::Relaxed), 1);

        reader.join().unwrap();
    });
}

struct NotifyDrop(Arc<AtomicUsize>);

impl Drop for NotifyDrop {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}
