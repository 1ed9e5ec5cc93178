use core::fmt;

/// A pointer unlinked from a shared structure, paired with the function that
/// destroys it.
///
/// A `Retired` is created by a writer at the moment of unlinking and is
/// consumed exactly once when the reclamation engine proves no reader can
/// still observe the pointee. It is never cloned and never reused.
pub struct Retired {
    ptr: *mut u8,
    reclaim: unsafe fn(*mut u8),
}

impl Retired {
    /// Wrap a raw pointer with its destructor.
    ///
    /// # Safety
    ///
    /// `ptr` must stay valid until `reclaim` runs, and calling
    /// `reclaim(ptr)` exactly once must be sound once every reader that
    /// could have observed `ptr` has left its critical section.
    pub unsafe fn new(ptr: *mut u8, reclaim: unsafe fn(*mut u8)) -> Self {
        Self { ptr, reclaim }
    }

    /// Retire a boxed value, reclaiming it by dropping the box.
    pub fn boxed<T: Send>(value: Box<T>) -> Self {
        unsafe fn drop_box<T>(ptr: *mut u8) {
            drop(Box::from_raw(ptr as *mut T));
        }

        unsafe { Self::new(Box::into_raw(value) as *mut u8, drop_box::<T>) }
    }

    /// Invoke the destructor. Null pointers are skipped, matching the
    /// convention that a writer may retire a placeholder entry.
    pub(crate) fn run(self) {
        if !self.ptr.is_null() {
            unsafe { (self.reclaim)(self.ptr) }
        }
    }
}

// The destructor runs on whichever thread completes the grace period.
unsafe impl Send for Retired {}

impl fmt::Debug for Retired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retired").field("ptr", &self.ptr).finish()
    }
}
