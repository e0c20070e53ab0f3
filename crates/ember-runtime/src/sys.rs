//! Low-level per-OS priority plumbing shared by `Thread` and `this_thread`
//!
//! The five `ThreadPriority` buckets translate to disjoint native
//! scales: nice values on Linux/Android, Mach precedence importance on
//! Apple, native priority levels on Windows. All mappings are lossy in
//! the same way: writing a bucket and reading it back yields the same
//! bucket, not the same native number.

#![allow(dead_code)]

use ember_core::ThreadPriority;

cfg_if::cfg_if! {
    if #[cfg(any(target_os = "linux", target_os = "android"))] {
        /// Nice value written for each bucket
        pub(crate) fn nice_for(priority: ThreadPriority) -> libc::c_int {
            match priority {
                ThreadPriority::Highest => -20,
                ThreadPriority::High => -10,
                ThreadPriority::Normal => 0,
                ThreadPriority::Low => 10,
                ThreadPriority::Lowest => 19,
            }
        }

        /// Bucket a nice value read back from the kernel
        pub(crate) fn bucket_from_nice(nice: libc::c_int) -> ThreadPriority {
            if nice <= -15 {
                ThreadPriority::Highest
            } else if nice <= -5 {
                ThreadPriority::High
            } else if nice <= 5 {
                ThreadPriority::Normal
            } else if nice <= 15 {
                ThreadPriority::Low
            } else {
                ThreadPriority::Lowest
            }
        }

        /// Set the nice value of the thread with kernel id `tid`
        /// (0 = calling thread)
        pub(crate) fn set_nice(tid: libc::c_int, priority: ThreadPriority) -> bool {
            let ret = unsafe {
                libc::setpriority(libc::PRIO_PROCESS, tid as libc::id_t, nice_for(priority))
            };
            ret == 0
        }

        /// Read the nice value of the thread with kernel id `tid`
        /// (0 = calling thread)
        pub(crate) fn nice_of(tid: libc::c_int) -> libc::c_int {
            unsafe { libc::getpriority(libc::PRIO_PROCESS, tid as libc::id_t) }
        }
    } else if #[cfg(any(target_os = "macos", target_os = "ios"))] {
        use libc::{c_int, c_uint};

        pub(crate) type ThreadPort = libc::mach_port_t;

        pub(crate) const KERN_SUCCESS: c_int = 0;
        pub(crate) const THREAD_PRECEDENCE_POLICY: c_uint = 3;
        pub(crate) const THREAD_AFFINITY_POLICY: c_uint = 4;
        pub(crate) const THREAD_PRECEDENCE_POLICY_COUNT: c_uint = 1;
        pub(crate) const THREAD_AFFINITY_POLICY_COUNT: c_uint = 1;

        #[repr(C)]
        pub(crate) struct ThreadPrecedencePolicyData {
            pub importance: c_int,
        }

        #[repr(C)]
        pub(crate) struct ThreadAffinityPolicyData {
            pub affinity_tag: c_int,
        }

        extern "C" {
            pub(crate) fn thread_policy_set(
                thread: ThreadPort,
                flavor: c_uint,
                policy_info: *mut c_int,
                count: c_uint,
            ) -> c_int;

            pub(crate) fn thread_policy_get(
                thread: ThreadPort,
                flavor: c_uint,
                policy_info: *mut c_int,
                count: *mut c_uint,
                get_default: *mut c_uint,
            ) -> c_int;
        }

        /// Mach port of the calling thread
        pub(crate) fn current_thread_port() -> ThreadPort {
            unsafe { libc::pthread_mach_thread_np(libc::pthread_self()) }
        }

        /// Precedence importance written for each bucket (disjoint scale
        /// from the Linux nice table; higher means more important)
        pub(crate) fn importance_for(priority: ThreadPriority) -> c_int {
            match priority {
                ThreadPriority::Highest => 10,
                ThreadPriority::High => 5,
                ThreadPriority::Normal => 0,
                ThreadPriority::Low => -5,
                ThreadPriority::Lowest => -10,
            }
        }

        /// Bucket an importance value read back from Mach
        pub(crate) fn bucket_from_importance(importance: c_int) -> ThreadPriority {
            if importance >= 8 {
                ThreadPriority::Highest
            } else if importance >= 3 {
                ThreadPriority::High
            } else if importance >= -3 {
                ThreadPriority::Normal
            } else if importance >= -8 {
                ThreadPriority::Low
            } else {
                ThreadPriority::Lowest
            }
        }

        /// Apply a precedence bucket to a Mach thread port
        pub(crate) fn set_precedence(port: ThreadPort, priority: ThreadPriority) -> bool {
            let mut policy = ThreadPrecedencePolicyData {
                importance: importance_for(priority),
            };
            let ret = unsafe {
                thread_policy_set(
                    port,
                    THREAD_PRECEDENCE_POLICY,
                    &mut policy as *mut _ as *mut c_int,
                    THREAD_PRECEDENCE_POLICY_COUNT,
                )
            };
            ret == KERN_SUCCESS
        }

        /// Read the precedence bucket of a Mach thread port
        pub(crate) fn precedence_of(port: ThreadPort) -> Option<ThreadPriority> {
            let mut policy = ThreadPrecedencePolicyData { importance: 0 };
            let mut count = THREAD_PRECEDENCE_POLICY_COUNT;
            let mut get_default: c_uint = 0;
            let ret = unsafe {
                thread_policy_get(
                    port,
                    THREAD_PRECEDENCE_POLICY,
                    &mut policy as *mut _ as *mut c_int,
                    &mut count,
                    &mut get_default,
                )
            };
            (ret == KERN_SUCCESS).then(|| bucket_from_importance(policy.importance))
        }

        /// Apply an affinity tag to a Mach thread port
        pub(crate) fn set_affinity_tag(port: ThreadPort, tag: c_int) -> bool {
            let mut policy = ThreadAffinityPolicyData { affinity_tag: tag };
            let ret = unsafe {
                thread_policy_set(
                    port,
                    THREAD_AFFINITY_POLICY,
                    &mut policy as *mut _ as *mut c_int,
                    THREAD_AFFINITY_POLICY_COUNT,
                )
            };
            ret == KERN_SUCCESS
        }

        /// Read the affinity tag of a Mach thread port
        pub(crate) fn affinity_tag_of(port: ThreadPort) -> Option<c_int> {
            let mut policy = ThreadAffinityPolicyData { affinity_tag: 0 };
            let mut count = THREAD_AFFINITY_POLICY_COUNT;
            let mut get_default: c_uint = 0;
            let ret = unsafe {
                thread_policy_get(
                    port,
                    THREAD_AFFINITY_POLICY,
                    &mut policy as *mut _ as *mut c_int,
                    &mut count,
                    &mut get_default,
                )
            };
            (ret == KERN_SUCCESS).then_some(policy.affinity_tag)
        }
    } else if #[cfg(windows)] {
        use windows_sys::Win32::Foundation::HANDLE;
        use windows_sys::Win32::System::Threading::{
            GetThreadPriority, SetThreadPriority, THREAD_PRIORITY_ABOVE_NORMAL,
            THREAD_PRIORITY_BELOW_NORMAL, THREAD_PRIORITY_HIGHEST, THREAD_PRIORITY_LOWEST,
            THREAD_PRIORITY_NORMAL,
        };

        /// Native priority level written for each bucket
        pub(crate) fn native_priority_for(priority: ThreadPriority) -> i32 {
            match priority {
                ThreadPriority::Highest => THREAD_PRIORITY_HIGHEST,
                ThreadPriority::High => THREAD_PRIORITY_ABOVE_NORMAL,
                ThreadPriority::Normal => THREAD_PRIORITY_NORMAL,
                ThreadPriority::Low => THREAD_PRIORITY_BELOW_NORMAL,
                ThreadPriority::Lowest => THREAD_PRIORITY_LOWEST,
            }
        }

        /// Bucket a native priority level read back from the OS
        pub(crate) fn bucket_from_native(level: i32) -> ThreadPriority {
            if level <= THREAD_PRIORITY_LOWEST {
                ThreadPriority::Lowest
            } else if level == THREAD_PRIORITY_BELOW_NORMAL {
                ThreadPriority::Low
            } else if level == THREAD_PRIORITY_NORMAL {
                ThreadPriority::Normal
            } else if level == THREAD_PRIORITY_ABOVE_NORMAL {
                ThreadPriority::High
            } else {
                ThreadPriority::Highest
            }
        }

        pub(crate) fn set_native_priority(handle: HANDLE, priority: ThreadPriority) -> bool {
            unsafe { SetThreadPriority(handle, native_priority_for(priority)) != 0 }
        }

        pub(crate) fn native_priority_of(handle: HANDLE) -> i32 {
            unsafe { GetThreadPriority(handle) }
        }
    }
}
