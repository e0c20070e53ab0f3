//! # ember - engine concurrency core
//!
//! Threading substrate and asynchronous logging pipeline for the ember
//! 2D game engine.
//!
//! ## Features
//!
//! - **Threads**: owned OS threads with naming, 5-level priority and
//!   CPU affinity control across Linux, Apple and Windows backends
//! - **Lock-free logging**: any thread logs through wait-bounded
//!   `LogEntryQueue::enqueue`; one low-priority thread drains to
//!   stderr or a file
//! - **Never stalls the hot path**: a saturated log queue drops lines
//!   instead of blocking the producer
//!
//! ## Quick Start
//!
//! ```ignore
//! use ember::{start_logging, LoggerConfig, Thread, cinfo};
//!
//! fn main() {
//!     let logger = start_logging(LoggerConfig::from_env()).unwrap();
//!
//!     let mut worker = Thread::spawn(|| {
//!         cinfo!("worker online, id {}", ember::this_thread::thread_id());
//!     });
//!     worker.join();
//!
//!     logger.shutdown();
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Engine / Game Threads                      │
//! │           cinfo!(), cwarn!(), Thread, this_thread           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ enqueue (lock-free, MPSC)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       LogEntryQueue                         │
//! │        fixed byte ring, 2-byte framed records, atomics      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ dequeue (single consumer)
//!                              ▼
//!                    ┌───────────────────┐
//!                    │    "ember-log"    │
//!                    │  drain Thread     │──► stderr / log file
//!                    └───────────────────┘
//! ```

// Re-export core types
pub use ember_core::{LogEntryQueue, LogLevel, ThreadPriority};

// Re-export console log macros
pub use ember_core::{cdebug, cerror, cinfo, ctrace, cwarn};
pub use ember_core::conlog::{init as init_conlog, set_flush_enabled, set_log_level};

// Re-export env utilities
pub use ember_core::{env_get, env_get_bool, env_get_opt};

// Re-export runtime types
pub use ember_runtime::{this_thread, LogThread, LoggerConfig, LoggerError, Thread, ThreadAffinityMask};

/// Start the asynchronous log thread.
///
/// Takes ownership of the console sink for the process lifetime; a
/// second call returns `LoggerError::AlreadyRunning`.
pub fn start_logging(config: LoggerConfig) -> Result<LogThread, LoggerError> {
    LogThread::start(config)
}

/// Start the asynchronous log thread configured from `EMBER_LOG_*`
/// environment variables.
pub fn start_logging_from_env() -> Result<LogThread, LoggerError> {
    LogThread::start(LoggerConfig::from_env())
}
