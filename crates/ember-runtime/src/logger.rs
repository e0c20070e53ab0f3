//! Asynchronous log thread
//!
//! Consumer side of the engine's logging pipeline: one dedicated
//! low-priority thread drains the `LogEntryQueue` that the `conlog`
//! macros feed and writes records to stderr or a log file. Producers
//! never block; a saturated queue drops lines instead of stalling the
//! threads doing real work.
//!
//! The logger is a process-lifetime singleton: starting it takes
//! ownership of the console sink for good (`LoggerError::AlreadyRunning`
//! on a second start). Shutdown is cooperative: the drain loop is told
//! to stop via a flag and exits only once the queue is dry; the thread
//! is never cancelled.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use ember_core::constants::MAX_ENTRY_LENGTH;
use ember_core::{conlog, LogEntryQueue, ThreadPriority};

use crate::config::LoggerConfig;
use crate::error::LoggerError;
use crate::thread::Thread;
use crate::this_thread;

/// Handle to the running log thread
pub struct LogThread {
    queue: Arc<LogEntryQueue>,
    thread: Thread,
    shutdown: Arc<AtomicBool>,
}

impl LogThread {
    /// Start the drain thread and route the console log macros through
    /// its queue.
    pub fn start(config: LoggerConfig) -> Result<Self, LoggerError> {
        config.validate().map_err(LoggerError::InvalidConfig)?;
        conlog::set_log_level(config.level);
        conlog::set_flush_enabled(config.flush);

        let mut sink: Box<dyn Write + Send> = match &config.file {
            Some(path) => Box::new(BufWriter::new(File::create(path)?)),
            None => Box::new(io::stderr()),
        };

        let queue = Arc::new(LogEntryQueue::new());
        if !conlog::install_queue(Arc::clone(&queue)) {
            return Err(LoggerError::AlreadyRunning);
        }

        let drain_queue = Arc::clone(&queue);
        let shutdown = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&shutdown);
        let poll = config.poll_interval;

        let thread = Thread::spawn(move || {
            #[cfg(any(
                target_os = "linux",
                target_os = "android",
                target_os = "macos",
                target_os = "ios",
                windows,
            ))]
            this_thread::set_name("ember-log");
            let _ = this_thread::set_priority(ThreadPriority::Lowest);

            let mut record = [0u8; MAX_ENTRY_LENGTH];
            loop {
                let copied = drain_queue.dequeue(&mut record);
                if copied > 0 {
                    let _ = sink.write_all(&record[..copied]);
                    let _ = sink.write_all(b"\n");
                    continue;
                }

                let _ = sink.flush();
                // Stop only once the queue is dry so records enqueued
                // before the shutdown request still reach the sink.
                if stop.load(Ordering::Acquire) && drain_queue.is_empty() {
                    break;
                }
                thread::sleep(poll);
            }
            let _ = sink.flush();
        });

        Ok(Self {
            queue,
            thread,
            shutdown,
        })
    }

    /// The queue producers feed. The `conlog` macros use it
    /// automatically; engine code with pre-formatted lines can enqueue
    /// directly.
    pub fn queue(&self) -> &Arc<LogEntryQueue> {
        &self.queue
    }

    /// Request stop, drain the queue dry and join the thread.
    ///
    /// Lines logged after shutdown land in the abandoned queue until it
    /// fills, then drop; the singleton sink is not returned.
    pub fn shutdown(mut self) {
        self.shutdown.store(true, Ordering::Release);
        self.thread.join();
    }
}

impl Drop for LogThread {
    fn drop(&mut self) {
        if self.thread.is_running() {
            self.shutdown.store(true, Ordering::Release);
            self.thread.join();
        }
    }
}
