//! # ember-core
//!
//! Core types for the ember engine's concurrency substrate.
//!
//! This crate is platform-agnostic and contains no OS-specific code.
//! All platform-specific implementations are in `ember-runtime`.
//!
//! ## Modules
//!
//! - `priority` - Thread priority levels
//! - `log_queue` - Lock-free MPSC byte ring for log records
//! - `conlog` - Console log macros with optional queue routing
//! - `env` - Environment variable utilities

pub mod priority;
pub mod log_queue;
pub mod conlog;
pub mod env;

// Re-exports for convenience
pub use priority::ThreadPriority;
pub use log_queue::LogEntryQueue;
pub use conlog::LogLevel;
pub use env::{env_get, env_get_bool, env_get_opt};

/// Constants for log record framing and buffer layout
pub mod constants {
    /// Maximum size of a single log record, including room for the
    /// trailing NUL written on dequeue (payload is at most
    /// `MAX_ENTRY_LENGTH - 1` bytes)
    pub const MAX_ENTRY_LENGTH: usize = 512;

    /// Sizing heuristic: how many average-sized records the queue should
    /// hold. Most log lines are far shorter than `MAX_ENTRY_LENGTH`, so
    /// the buffer is sized for the average case, not the worst case.
    pub const MAX_NUM_ENTRIES: usize = 128;

    /// Physical size of the log ring in bytes. Must be a power of two:
    /// the 32-bit cursors wrap, and only a capacity that divides 2^32
    /// keeps `pos % LOG_BUFFER_LENGTH` consistent across the wrap.
    pub const LOG_BUFFER_LENGTH: usize = 8192;

    /// Size of the little-endian length header preceding each record
    pub const LENGTH_HEADER_SIZE: usize = 2;
}
