//! Light and heavy memory barriers.
//!
//! Classic user-space RCU shortens grace periods by signalling peer threads
//! and fencing inside the handler. The portable equivalent used here is an
//! asymmetric barrier pair: readers issue a cheap [`reader_barrier`] on
//! critical-section entry, and reclaimers issue a [`process_barrier`] that
//! forces a full fence on every thread in the process at once.
//!
//! With the `fast-barrier` feature this module compiles an OS-specific
//! heavy barrier (`membarrier(2)` on Linux, `FlushProcessWriteBuffers` on
//! Windows, a page-protection flip on macOS) and the light barrier becomes
//! a compiler fence. On other platforms, or with the feature disabled, both
//! sides fall back to a sequentially consistent fence and detection degrades
//! to pure polling.

#[cfg(all(feature = "fast-barrier", target_os = "linux"))]
pub(crate) use self::linux::{process_barrier, reader_barrier};

#[cfg(all(feature = "fast-barrier", target_os = "windows"))]
pub(crate) use self::windows::{process_barrier, reader_barrier};

#[cfg(all(feature = "fast-barrier", target_os = "macos"))]
pub(crate) use self::macos::{process_barrier, reader_barrier};

#[cfg(not(all(
    feature = "fast-barrier",
    any(target_os = "linux", target_os = "windows", target_os = "macos")
)))]
pub(crate) use self::portable::{process_barrier, reader_barrier};

#[cfg(all(feature = "fast-barrier", target_os = "linux"))]
mod linux {
    use core::sync::atomic::{compiler_fence, fence, Ordering};
    use once_cell::sync::Lazy;

    // One-time detection: query and register for private expedited
    // membarrier support, falling back to plain fences on old kernels.
    static EXPEDITED: Lazy<bool> = Lazy::new(membarrier::register);

    pub fn process_barrier() {
        if *EXPEDITED {
            membarrier::issue();
        } else {
            fence(Ordering::SeqCst);
        }
    }

    pub fn reader_barrier() {
        if *EXPEDITED {
            compiler_fence(Ordering::SeqCst);
        } else {
            fence(Ordering::SeqCst);
        }
    }

    mod membarrier {
        // Command values from linux/membarrier.h.
        const CMD_QUERY: libc::c_int = 0;
        const CMD_PRIVATE_EXPEDITED: libc::c_int = 1 << 3;
        const CMD_REGISTER_PRIVATE_EXPEDITED: libc::c_int = 1 << 4;

        fn sys_membarrier(cmd: libc::c_int) -> libc::c_long {
            unsafe { libc::syscall(libc::SYS_membarrier, cmd, 0 as libc::c_int) }
        }

        pub fn register() -> bool {
            let commands = sys_membarrier(CMD_QUERY);

            if commands < 0
                || commands & CMD_PRIVATE_EXPEDITED as libc::c_long == 0
                || commands & CMD_REGISTER_PRIVATE_EXPEDITED as libc::c_long == 0
            {
                return false;
            }

            sys_membarrier(CMD_REGISTER_PRIVATE_EXPEDITED) >= 0
        }

        pub fn issue() {
            // Registration succeeded, so the expedited command must not
            // fail; continuing without the fence would let a retired
            // pointer be freed under a live reader.
            if sys_membarrier(CMD_PRIVATE_EXPEDITED) < 0 {
                unsafe { libc::abort() }
            }
        }
    }
}

#[cfg(all(feature = "fast-barrier", target_os = "windows"))]
mod windows {
    use core::sync::atomic::{compiler_fence, Ordering};
    use winapi::um::processthreadsapi::FlushProcessWriteBuffers;

    pub fn process_barrier() {
        unsafe {
            FlushProcessWriteBuffers();
        }
    }

    pub fn reader_barrier() {
        compiler_fence(Ordering::SeqCst);
    }
}

#[cfg(all(feature = "fast-barrier", target_os = "macos"))]
mod macos {
    use core::ptr::null_mut;
    use core::sync::atomic::{compiler_fence, Ordering};
    use once_cell::sync::Lazy;
    use std::sync::Mutex;

    struct Page(*mut libc::c_void);

    unsafe impl Send for Page {}
    unsafe impl Sync for Page {}

    // Flipping the protection of a resident page sends an IPI to every
    // core, which serves as a process-wide fence.
    static PAGE: Lazy<Mutex<Page>> = Lazy::new(|| Mutex::new(Page(map_page())));

    fn map_page() -> *mut libc::c_void {
        unsafe {
            let page = libc::mmap(
                null_mut(),
                1,
                libc::PROT_READ,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            );

            assert!(page != libc::MAP_FAILED);
            assert!(libc::mlock(page, 1) >= 0);
            page
        }
    }

    pub fn process_barrier() {
        let page = PAGE.lock().unwrap();

        unsafe {
            assert!(libc::mprotect(page.0, 1, libc::PROT_READ | libc::PROT_WRITE) >= 0);
            assert!(libc::mprotect(page.0, 1, libc::PROT_READ) >= 0);
        }
    }

    pub fn reader_barrier() {
        compiler_fence(Ordering::SeqCst);
    }
}

#[cfg(not(all(
    feature = "fast-barrier",
    any(target_os = "linux", target_os = "windows", target_os = "macos")
)))]
mod portable {
    use core::sync::atomic::{fence, Ordering};

    pub fn process_barrier() {
        fence(Ordering::SeqCst);
    }

    pub fn reader_barrier() {
        fence(Ordering::SeqCst);
    }
}
