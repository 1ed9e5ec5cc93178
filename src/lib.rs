//! Grace-period based deferred memory reclamation.
//!
//! Readers traverse shared structures without locks or reference counts;
//! writers unlink nodes and hand them to a [`Domain`], which frees each one
//! only after every reader that could have observed it has left its
//! critical section. The wait for that proof is the grace period.
//!
//! A domain comes in two compile-time [flavors](Flavor). [`Blocking`] makes
//! readers pay a full fence on entry and reclaimers wait by polling.
//! [`Accelerated`] moves the fence cost to the reclaimer, which flushes
//! every thread in the process through an OS-assisted barrier after each
//! phase flip.
//!
//! # Example
//!
//! ```
//! use quiesce::{Domain, Retired};
//!
//! let domain: Domain = Domain::new();
//!
//! // Reader side: attach once per thread, bracket each traversal.
//! let handle = domain.attach();
//! {
//!     let _section = handle.enter();
//!     // lock-free reads of shared structures happen here
//! }
//!
//! // Writer side: unlink, then retire. Returns once the value is freed.
//! domain.retire(Retired::boxed(Box::new(42u64)));
//! ```

mod backoff;
mod barrier;
mod cache_padded;
mod control;
mod domain;
mod flavor;
mod guard;
mod mutex;
mod record;
mod registry;
mod retired;
mod sync;

pub use backoff::Backoff;
pub use cache_padded::CachePadded;
pub use control::ControlWord;
pub use domain::Domain;
pub use flavor::{Accelerated, Blocking, Flavor};
pub use guard::{Critical, ThreadHandle};
pub use retired::Retired;
