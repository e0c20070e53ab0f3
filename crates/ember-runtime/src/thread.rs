//! Owned OS thread handle
//!
//! `Thread` wraps at most one live OS thread: Unstarted → Running →
//! {Joined | Detached | Cancelled}. `run()` is the only
//! Unstarted→Running transition; join/detach/cancel clear the handle
//! again. Operations on a thread that is not running log a warning and
//! return a default/false value.
//!
//! The lifecycle methods are platform-neutral; naming, priority and
//! affinity have one implementation block per OS backend, selected at
//! compile time. Affinity and naming are compiled out on targets
//! without real OS threads (Emscripten).
//!
//! Dropping a `Thread` that is still running merely drops the handle:
//! the OS thread keeps running detached. Callers that need the thread
//! gone must join, cancel or signal it themselves.

use std::thread::{self, JoinHandle};

use ember_core::cwarn;
#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    windows,
)))]
use ember_core::ThreadPriority;

#[cfg(any(target_os = "linux", target_os = "android"))]
use std::sync::{
    atomic::{AtomicI32, Ordering},
    Arc,
};

/// Handle to at most one live OS thread
pub struct Thread {
    handle: Option<JoinHandle<()>>,

    /// Kernel thread id, published by the spawned thread before it runs
    /// user code. Priority and affinity calls target this id.
    #[cfg(any(target_os = "linux", target_os = "android"))]
    tid: Arc<AtomicI32>,
}

impl Thread {
    /// Create a handle in the not-running state
    pub fn new() -> Self {
        Self {
            handle: None,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            tid: Arc::new(AtomicI32::new(0)),
        }
    }

    /// Create a handle and immediately start `f` on a new OS thread
    pub fn spawn<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let mut thread = Self::new();
        thread.run(f);
        thread
    }

    /// True while this handle owns a running (or joinable) OS thread
    #[inline]
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Start `f` on a new OS thread.
    ///
    /// Ownership of the closure moves into the spawned thread, so there
    /// is no lifetime coupling between this handle and thread startup.
    /// OS spawn failure aborts the process: the engine cannot run
    /// without its threading substrate. Calling `run` while already
    /// running logs a warning and does nothing (the closure is dropped
    /// without being called).
    pub fn run<F>(&mut self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.handle.is_some() {
            cwarn!("Thread::run() called on a thread that is already running");
            return;
        }

        #[cfg(any(target_os = "linux", target_os = "android"))]
        let tid = {
            self.tid.store(0, Ordering::Relaxed);
            Arc::clone(&self.tid)
        };

        let handle = thread::Builder::new()
            .spawn(move || {
                #[cfg(any(target_os = "linux", target_os = "android"))]
                tid.store(nix::unistd::gettid().as_raw(), Ordering::Release);
                f();
            })
            .expect("failed to spawn OS thread");
        self.handle = Some(handle);
    }

    /// Block until the thread terminates.
    ///
    /// Returns `false` (with a warning) when the thread was never
    /// started, or when the thread panicked.
    pub fn join(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => handle.join().is_ok(),
            None => {
                cwarn!("Thread::join() called on a thread that is not running");
                false
            }
        }
    }

    /// Release the handle; the OS thread keeps running on its own
    pub fn detach(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                drop(handle);
                true
            }
            None => {
                cwarn!("Thread::detach() called on a thread that is not running");
                false
            }
        }
    }

    /// Abruptly terminate the thread.
    ///
    /// Non-cooperative: the target gets no chance to unwind, so it must
    /// not hold locks or resources needing cleanup. Prefer a shutdown
    /// flag wherever possible. Unavailable on Android and Emscripten
    /// (warning + `false`).
    pub fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => Self::cancel_native(handle),
            None => {
                cwarn!("Thread::cancel() called on a thread that is not running");
                false
            }
        }
    }

    #[cfg(all(unix, not(any(target_os = "android", target_os = "emscripten"))))]
    fn cancel_native(handle: JoinHandle<()>) -> bool {
        use std::os::unix::thread::JoinHandleExt;
        let ret = unsafe { libc::pthread_cancel(handle.as_pthread_t()) };
        // The cancelled thread reclaims itself once the dropped handle
        // detaches it.
        drop(handle);
        ret == 0
    }

    #[cfg(windows)]
    fn cancel_native(handle: JoinHandle<()>) -> bool {
        use std::os::windows::io::AsRawHandle;
        use windows_sys::Win32::System::Threading::TerminateThread;
        let ret = unsafe { TerminateThread(handle.as_raw_handle() as _, 0) };
        drop(handle);
        ret != 0
    }

    #[cfg(any(target_os = "android", target_os = "emscripten"))]
    fn cancel_native(handle: JoinHandle<()>) -> bool {
        cwarn!("Thread::cancel() is not supported on this platform");
        drop(handle);
        false
    }
}

// ── Per-platform naming / priority / affinity ──

cfg_if::cfg_if! {
    if #[cfg(any(target_os = "linux", target_os = "android"))] {
        use ember_core::ThreadPriority;

        use crate::affinity::ThreadAffinityMask;
        use crate::sys;

        impl Thread {
            /// Wait for the spawned thread to publish its kernel id.
            /// Only called once the handle exists, so the store is
            /// already in flight.
            fn tid(&self) -> libc::c_int {
                let mut tid = self.tid.load(Ordering::Acquire);
                while tid == 0 {
                    thread::yield_now();
                    tid = self.tid.load(Ordering::Acquire);
                }
                tid
            }

            /// Set the scheduler-visible name (kernel limit: 15 bytes).
            /// Warning + no-op when the thread is not running.
            pub fn set_name(&self, name: &str) {
                use std::os::unix::thread::JoinHandleExt;
                let Some(handle) = self.handle.as_ref() else {
                    cwarn!("Thread::set_name() called on a thread that is not running");
                    return;
                };
                let truncated: Vec<u8> = name.bytes().take(15).collect();
                let cname = std::ffi::CString::new(truncated).unwrap_or_default();
                let ret = unsafe {
                    libc::pthread_setname_np(handle.as_pthread_t(), cname.as_ptr())
                };
                if ret != 0 {
                    cwarn!("Thread::set_name() failed for {:?}", name);
                }
            }

            /// Read back the thread's priority bucket (lossy mapping;
            /// the bucket round-trips, the nice value does not).
            /// Returns `Normal` with a warning when not running.
            pub fn priority(&self) -> ThreadPriority {
                if self.handle.is_none() {
                    cwarn!("Thread::priority() called on a thread that is not running");
                    return ThreadPriority::default();
                }
                sys::bucket_from_nice(sys::nice_of(self.tid()))
            }

            /// Apply a priority bucket. Returns `false` with a warning
            /// when not running, or when the OS refuses (raising above
            /// `Normal` typically needs elevated privileges).
            pub fn set_priority(&self, priority: ThreadPriority) -> bool {
                if self.handle.is_none() {
                    cwarn!("Thread::set_priority() called on a thread that is not running");
                    return false;
                }
                sys::set_nice(self.tid(), priority)
            }

            /// Read the thread's CPU affinity set. Returns a default
            /// mask with a warning when not running.
            pub fn affinity_mask(&self) -> ThreadAffinityMask {
                if self.handle.is_none() {
                    cwarn!("Thread::affinity_mask() called on a thread that is not running");
                    return ThreadAffinityMask::default();
                }
                nix::sched::sched_getaffinity(nix::unistd::Pid::from_raw(self.tid()))
                    .map(ThreadAffinityMask::from_cpu_set)
                    .unwrap_or_default()
            }

            /// Pin the thread to the CPUs in `mask`. Returns `false`
            /// with a warning when not running.
            pub fn set_affinity_mask(&self, mask: ThreadAffinityMask) -> bool {
                if self.handle.is_none() {
                    cwarn!("Thread::set_affinity_mask() called on a thread that is not running");
                    return false;
                }
                nix::sched::sched_setaffinity(
                    nix::unistd::Pid::from_raw(self.tid()),
                    mask.cpu_set(),
                )
                .is_ok()
            }
        }
    } else if #[cfg(any(target_os = "macos", target_os = "ios"))] {
        use ember_core::ThreadPriority;

        use crate::affinity::ThreadAffinityMask;
        use crate::sys;

        impl Thread {
            fn port(&self) -> sys::ThreadPort {
                use std::os::unix::thread::JoinHandleExt;
                let handle = self.handle.as_ref().expect("caller checked handle");
                unsafe { libc::pthread_mach_thread_np(handle.as_pthread_t()) }
            }

            /// Apple can only name the calling thread; naming another
            /// thread warns and does nothing.
            pub fn set_name(&self, name: &str) {
                let _ = name;
                if self.handle.is_none() {
                    cwarn!("Thread::set_name() called on a thread that is not running");
                    return;
                }
                cwarn!("Thread::set_name() can only name the calling thread on this platform");
            }

            /// Read back the precedence bucket. Returns `Normal` with a
            /// warning when not running.
            pub fn priority(&self) -> ThreadPriority {
                if self.handle.is_none() {
                    cwarn!("Thread::priority() called on a thread that is not running");
                    return ThreadPriority::default();
                }
                sys::precedence_of(self.port()).unwrap_or_default()
            }

            /// Apply a precedence bucket. Returns `false` with a warning
            /// when not running.
            pub fn set_priority(&self, priority: ThreadPriority) -> bool {
                if self.handle.is_none() {
                    cwarn!("Thread::set_priority() called on a thread that is not running");
                    return false;
                }
                sys::set_precedence(self.port(), priority)
            }

            /// Read the thread's affinity tag as a mask. Returns a
            /// default mask with a warning when not running.
            pub fn affinity_mask(&self) -> ThreadAffinityMask {
                if self.handle.is_none() {
                    cwarn!("Thread::affinity_mask() called on a thread that is not running");
                    return ThreadAffinityMask::default();
                }
                sys::affinity_tag_of(self.port())
                    .map(ThreadAffinityMask::from_tag)
                    .unwrap_or_default()
            }

            /// Install the mask's affinity tag. Returns `false` with a
            /// warning when not running.
            pub fn set_affinity_mask(&self, mask: ThreadAffinityMask) -> bool {
                if self.handle.is_none() {
                    cwarn!("Thread::set_affinity_mask() called on a thread that is not running");
                    return false;
                }
                sys::set_affinity_tag(self.port(), mask.tag())
            }
        }
    } else if #[cfg(windows)] {
        use ember_core::ThreadPriority;

        use crate::affinity::ThreadAffinityMask;
        use crate::sys;

        impl Thread {
            fn win_handle(&self) -> windows_sys::Win32::Foundation::HANDLE {
                use std::os::windows::io::AsRawHandle;
                self.handle
                    .as_ref()
                    .map(|h| h.as_raw_handle() as _)
                    .expect("caller checked handle")
            }

            /// Set the thread description. Warning + no-op when the
            /// thread is not running.
            pub fn set_name(&self, name: &str) {
                use windows_sys::Win32::System::Threading::SetThreadDescription;
                if self.handle.is_none() {
                    cwarn!("Thread::set_name() called on a thread that is not running");
                    return;
                }
                let wide: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();
                unsafe {
                    let _ = SetThreadDescription(self.win_handle(), wide.as_ptr());
                }
            }

            /// Read back the priority bucket. Returns `Normal` with a
            /// warning when not running.
            pub fn priority(&self) -> ThreadPriority {
                if self.handle.is_none() {
                    cwarn!("Thread::priority() called on a thread that is not running");
                    return ThreadPriority::default();
                }
                sys::bucket_from_native(sys::native_priority_of(self.win_handle()))
            }

            /// Apply a priority bucket. Returns `false` with a warning
            /// when not running.
            pub fn set_priority(&self, priority: ThreadPriority) -> bool {
                if self.handle.is_none() {
                    cwarn!("Thread::set_priority() called on a thread that is not running");
                    return false;
                }
                sys::set_native_priority(self.win_handle(), priority)
            }

            /// Read the thread's CPU mask. Windows has no
            /// GetThreadAffinityMask; the mask is read by swapping in
            /// the process mask and restoring what was there. Returns a
            /// default mask with a warning when not running.
            pub fn affinity_mask(&self) -> ThreadAffinityMask {
                use windows_sys::Win32::System::Threading::{
                    GetCurrentProcess, GetProcessAffinityMask, SetThreadAffinityMask,
                };
                if self.handle.is_none() {
                    cwarn!("Thread::affinity_mask() called on a thread that is not running");
                    return ThreadAffinityMask::default();
                }
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
                    let previous = SetThreadAffinityMask(self.win_handle(), process_mask);
                    if previous == 0 {
                        return ThreadAffinityMask::default();
                    }
                    SetThreadAffinityMask(self.win_handle(), previous);
                    ThreadAffinityMask::from_bits(previous as u64)
                }
            }

            /// Pin the thread to the CPUs in `mask`. Returns `false`
            /// with a warning when not running.
            pub fn set_affinity_mask(&self, mask: ThreadAffinityMask) -> bool {
                use windows_sys::Win32::System::Threading::SetThreadAffinityMask;
                if self.handle.is_none() {
                    cwarn!("Thread::set_affinity_mask() called on a thread that is not running");
                    return false;
                }
                unsafe { SetThreadAffinityMask(self.win_handle(), mask.bits() as usize) != 0 }
            }
        }
    } else {
        // No thread control on this target; naming and affinity are
        // compiled out entirely, priority degrades to warnings.
        impl Thread {
            pub fn priority(&self) -> ThreadPriority {
                if self.handle.is_none() {
                    cwarn!("Thread::priority() called on a thread that is not running");
                }
                ThreadPriority::default()
            }

            pub fn set_priority(&self, _priority: ThreadPriority) -> bool {
                if self.handle.is_none() {
                    cwarn!("Thread::set_priority() called on a thread that is not running");
                }
                false
            }
        }
    }
}

impl Default for Thread {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::ThreadPriority;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Flag the test thread spins on so the Thread stays running while
    /// the test pokes at it
    fn gated_thread(counter: Arc<AtomicUsize>, gate: Arc<AtomicBool>) -> Thread {
        Thread::spawn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            while !gate.load(Ordering::Acquire) {
                thread::yield_now();
            }
        })
    }

    #[test]
    fn test_ops_on_unstarted_thread() {
        let mut thread = Thread::new();
        assert!(!thread.is_running());
        assert!(!thread.join());
        assert!(!thread.detach());
        assert!(!thread.cancel());
        assert_eq!(thread.priority(), ThreadPriority::Normal);
        assert!(!thread.set_priority(ThreadPriority::Low));

        #[cfg(any(
            target_os = "linux",
            target_os = "android",
            target_os = "macos",
            target_os = "ios",
            windows,
        ))]
        {
            use crate::affinity::ThreadAffinityMask;
            thread.set_name("nobody");
            assert!(!thread.set_affinity_mask(ThreadAffinityMask::default()));
            assert!(!thread.affinity_mask().is_set(0));
        }
    }

    #[test]
    fn test_run_and_join() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);

        let mut thread = Thread::new();
        thread.run(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert!(thread.is_running());
        assert!(thread.join());
        assert!(!thread.is_running());
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        // Joining again warns and fails.
        assert!(!thread.join());
    }

    #[test]
    fn test_double_run_is_noop() {
        let counter = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(AtomicBool::new(false));
        let mut thread = gated_thread(Arc::clone(&counter), Arc::clone(&gate));

        // Second run must not spawn another OS thread.
        let c = Arc::clone(&counter);
        thread.run(move || {
            c.fetch_add(1000, Ordering::SeqCst);
        });

        gate.store(true, Ordering::Release);
        assert!(thread.join());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_detach() {
        let done = Arc::new(AtomicBool::new(false));
        let d = Arc::clone(&done);
        let mut thread = Thread::spawn(move || {
            d.store(true, Ordering::Release);
        });
        assert!(thread.detach());
        assert!(!thread.is_running());

        while !done.load(Ordering::Acquire) {
            thread::yield_now();
        }
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn test_normal_priority_round_trip() {
        let counter = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(AtomicBool::new(false));
        let mut thread = gated_thread(counter, Arc::clone(&gate));

        // Normal maps to nice 0, which never needs privileges.
        assert!(thread.set_priority(ThreadPriority::Normal));
        assert_eq!(thread.priority(), ThreadPriority::Normal);

        gate.store(true, Ordering::Release);
        assert!(thread.join());
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn test_affinity_read_and_restore() {
        let counter = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(AtomicBool::new(false));
        let mut thread = gated_thread(counter, Arc::clone(&gate));

        let mask = thread.affinity_mask();
        assert!((0..1024).any(|cpu| mask.is_set(cpu)));
        // Re-applying the current mask is always permitted.
        assert!(thread.set_affinity_mask(mask));

        gate.store(true, Ordering::Release);
        assert!(thread.join());
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn test_set_name_running() {
        let counter = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(AtomicBool::new(false));
        let mut thread = gated_thread(counter, Arc::clone(&gate));

        thread.set_name("ember-worker");
        gate.store(true, Ordering::Release);
        assert!(thread.join());
    }
}
