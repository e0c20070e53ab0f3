//! Operations on the calling thread
//!
//! Free-function namespace mirroring `Thread`'s surface for the thread
//! that is executing right now: identity, naming, priority, affinity,
//! yielding and exit. One implementation block per OS backend, selected
//! at compile time; affinity and naming are compiled out on Emscripten,
//! which has no real OS threads to pin or label.

use ember_core::ThreadPriority;

cfg_if::cfg_if! {
    if #[cfg(any(target_os = "linux", target_os = "android"))] {
        use crate::affinity::ThreadAffinityMask;
        use crate::sys;

        /// Opaque identity of the calling thread (the kernel tid).
        ///
        /// Comparable across threads of this process, nothing more.
        /// It is NOT a pthread handle.
        pub fn thread_id() -> u64 {
            nix::unistd::gettid().as_raw() as u64
        }

        /// Name the calling thread (kernel limit: 15 bytes)
        pub fn set_name(name: &str) {
            let truncated: Vec<u8> = name.bytes().take(15).collect();
            let cname = std::ffi::CString::new(truncated).unwrap_or_default();
            unsafe {
                libc::pthread_setname_np(libc::pthread_self(), cname.as_ptr());
            }
        }

        /// Read back the calling thread's priority bucket
        pub fn priority() -> ThreadPriority {
            // tid 0 addresses the calling thread
            sys::bucket_from_nice(sys::nice_of(0))
        }

        /// Apply a priority bucket to the calling thread
        pub fn set_priority(priority: ThreadPriority) -> bool {
            sys::set_nice(0, priority)
        }

        /// Read the calling thread's CPU affinity set
        pub fn affinity_mask() -> ThreadAffinityMask {
            // pid 0 addresses the calling thread
            nix::sched::sched_getaffinity(nix::unistd::Pid::from_raw(0))
                .map(ThreadAffinityMask::from_cpu_set)
                .unwrap_or_default()
        }

        /// Pin the calling thread to the CPUs in `mask`
        pub fn set_affinity_mask(mask: ThreadAffinityMask) -> bool {
            nix::sched::sched_setaffinity(nix::unistd::Pid::from_raw(0), mask.cpu_set()).is_ok()
        }
    } else if #[cfg(any(target_os = "macos", target_os = "ios"))] {
        use crate::affinity::ThreadAffinityMask;
        use crate::sys;

        /// Opaque identity of the calling thread (the per-thread 64-bit
        /// id from `pthread_threadid_np`).
        ///
        /// Comparable across threads of this process, nothing more.
        /// It is NOT a pthread handle.
        pub fn thread_id() -> u64 {
            let mut id: u64 = 0;
            unsafe { libc::pthread_threadid_np(libc::pthread_self(), &mut id) };
            id
        }

        /// Name the calling thread
        pub fn set_name(name: &str) {
            let cname = std::ffi::CString::new(name).unwrap_or_default();
            unsafe {
                libc::pthread_setname_np(cname.as_ptr());
            }
        }

        /// Read back the calling thread's precedence bucket
        pub fn priority() -> ThreadPriority {
            sys::precedence_of(sys::current_thread_port()).unwrap_or_default()
        }

        /// Apply a precedence bucket to the calling thread
        pub fn set_priority(priority: ThreadPriority) -> bool {
            sys::set_precedence(sys::current_thread_port(), priority)
        }

        /// Read the calling thread's affinity tag as a mask
        pub fn affinity_mask() -> ThreadAffinityMask {
            sys::affinity_tag_of(sys::current_thread_port())
                .map(ThreadAffinityMask::from_tag)
                .unwrap_or_default()
        }

        /// Install the mask's affinity tag on the calling thread
        pub fn set_affinity_mask(mask: ThreadAffinityMask) -> bool {
            sys::set_affinity_tag(sys::current_thread_port(), mask.tag())
        }
    } else if #[cfg(windows)] {
        use windows_sys::Win32::System::Threading::{
            GetCurrentProcess, GetCurrentThread, GetCurrentThreadId, GetProcessAffinityMask,
            SetThreadAffinityMask, SetThreadDescription,
        };

        use crate::affinity::ThreadAffinityMask;
        use crate::sys;

        /// Opaque identity of the calling thread (the OS thread id).
        ///
        /// Comparable across threads of this process, nothing more.
        pub fn thread_id() -> u64 {
            unsafe { GetCurrentThreadId() as u64 }
        }

        /// Set the calling thread's description
        pub fn set_name(name: &str) {
            let wide: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();
            unsafe {
                let _ = SetThreadDescription(GetCurrentThread(), wide.as_ptr());
            }
        }

        /// Read back the calling thread's priority bucket
        pub fn priority() -> ThreadPriority {
            sys::bucket_from_native(sys::native_priority_of(unsafe { GetCurrentThread() }))
        }

        /// Apply a priority bucket to the calling thread
        pub fn set_priority(priority: ThreadPriority) -> bool {
            sys::set_native_priority(unsafe { GetCurrentThread() }, priority)
        }

        /// Read the calling thread's CPU mask (swap-and-restore; there
        /// is no native getter)
        pub fn affinity_mask() -> ThreadAffinityMask {
            unsafe {
                let mut process_mask: usize = 0;
                let mut system_mask: usize = 0;
                if GetProcessAffinityMask(
                    GetCurrentProcess(),
                    &mut process_mask,
                    &mut system_mask,
                ) == 0
                {
                    return ThreadAffinityMask::default();
                }
                let previous = SetThreadAffinityMask(GetCurrentThread(), process_mask);
                if previous == 0 {
                    return ThreadAffinityMask::default();
                }
                SetThreadAffinityMask(GetCurrentThread(), previous);
                ThreadAffinityMask::from_bits(previous as u64)
            }
        }

        /// Pin the calling thread to the CPUs in `mask`
        pub fn set_affinity_mask(mask: ThreadAffinityMask) -> bool {
            unsafe { SetThreadAffinityMask(GetCurrentThread(), mask.bits() as usize) != 0 }
        }
    } else {
        // No thread identity or control on this target; naming and
        // affinity are compiled out entirely.

        /// Thread identity is unavailable on this target
        pub fn thread_id() -> u64 {
            0
        }

        /// Priority control is unavailable on this target
        pub fn priority() -> ThreadPriority {
            ThreadPriority::default()
        }

        /// Priority control is unavailable on this target
        pub fn set_priority(_priority: ThreadPriority) -> bool {
            false
        }
    }
}

/// Give up the rest of the time slice
#[inline]
pub fn yield_now() {
    std::thread::yield_now();
}

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        /// Terminate the calling thread immediately.
        ///
        /// Destructors of frames live on this thread's stack are not
        /// guaranteed to run; use only on threads that hold nothing
        /// needing cleanup.
        pub fn exit() -> ! {
            unsafe { libc::pthread_exit(std::ptr::null_mut()) }
        }
    } else if #[cfg(windows)] {
        /// Terminate the calling thread immediately.
        ///
        /// Destructors of frames live on this thread's stack are not
        /// guaranteed to run; use only on threads that hold nothing
        /// needing cleanup.
        pub fn exit() -> ! {
            unsafe { windows_sys::Win32::System::Threading::ExitThread(0) };
            unreachable!()
        }
    } else {
        /// Thread exit is unavailable on this target
        pub fn exit() -> ! {
            panic!("thread exit is not supported on this platform");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_thread_id_is_stable_and_unique() {
        let here = thread_id();
        assert_eq!(here, thread_id());

        #[cfg(any(
            target_os = "linux",
            target_os = "android",
            target_os = "macos",
            target_os = "ios",
            windows,
        ))]
        {
            let other = thread::spawn(thread_id).join().unwrap();
            assert_ne!(here, 0);
            assert_ne!(here, other);
        }
    }

    #[test]
    fn test_normal_priority_round_trip() {
        // Normal is exactly representable on every backend.
        if set_priority(ThreadPriority::Normal) {
            assert_eq!(priority(), ThreadPriority::Normal);
        }
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn test_affinity_read_and_restore() {
        let mask = affinity_mask();
        assert!((0..1024).any(|cpu| mask.is_set(cpu)));
        assert!(set_affinity_mask(mask));
    }

    #[cfg(any(
        target_os = "linux",
        target_os = "android",
        target_os = "macos",
        target_os = "ios",
        windows,
    ))]
    #[test]
    fn test_set_name_does_not_crash() {
        thread::spawn(|| {
            set_name("ember-named");
            yield_now();
        })
        .join()
        .unwrap();
    }
}
