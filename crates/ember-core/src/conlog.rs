//! Console log macros for the engine
//!
//! Leveled logging front end used by every engine thread. Lines are
//! formatted into a fixed stack buffer and handed to the asynchronous
//! logger's `LogEntryQueue` when one is installed; before the logger is
//! up (or in tools that never start it) lines go straight to stderr.
//! A full queue drops the line; the hot path never blocks on logging.
//!
//! # Environment Variables
//!
//! - `EMBER_LOG_LEVEL=<level>` - off, error, warn, info, debug, trace (or 0-5)
//! - `EMBER_LOG_FLUSH=1` - flush stderr after each direct write
//!
//! # Usage
//!
//! ```ignore
//! use ember_core::{cerror, cwarn, cinfo, cdebug, ctrace};
//!
//! cinfo!("renderer backend: {}", name);
//! cwarn!("texture {} exceeds atlas page", id);
//! ```

use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use crate::constants::MAX_ENTRY_LENGTH;
use crate::env::env_get_bool;
use crate::log_queue::LogEntryQueue;

/// Log levels, most severe first
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => LogLevel::Off,
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    /// Parse "error"/"warn"/etc. or a numeric level; `None` on anything else
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "1" => Some(LogLevel::Error),
            "warn" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            LogLevel::Off => "",
            LogLevel::Error => "[E]",
            LogLevel::Warn => "[W]",
            LogLevel::Info => "[I]",
            LogLevel::Debug => "[D]",
            LogLevel::Trace => "[T]",
        }
    }
}

// Global configuration (initialized once)
static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);
static FLUSH_ENABLED: AtomicBool = AtomicBool::new(false);
static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Queue sink installed by the asynchronous logger. Install-once: once a
/// logger owns the console output it keeps it for the process lifetime.
static QUEUE_SINK: OnceLock<Arc<LogEntryQueue>> = OnceLock::new();

/// Initialize the level and flush flag from environment variables
///
/// Called automatically on first log, but can be called explicitly for
/// deterministic initialization.
pub fn init() {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return; // Already initialized
    }

    if let Ok(val) = std::env::var("EMBER_LOG_LEVEL") {
        if let Some(level) = LogLevel::parse(&val) {
            LOG_LEVEL.store(level as u8, Ordering::Relaxed);
        }
    }
    FLUSH_ENABLED.store(env_get_bool("EMBER_LOG_FLUSH", false), Ordering::Relaxed);
}

/// Get the current log level
#[inline]
pub fn log_level() -> LogLevel {
    if !INITIALIZED.load(Ordering::Relaxed) {
        init();
    }
    LogLevel::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

/// Set the log level programmatically
pub fn set_log_level(level: LogLevel) {
    INITIALIZED.store(true, Ordering::SeqCst);
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

/// Set the direct-write flush mode programmatically
pub fn set_flush_enabled(enabled: bool) {
    FLUSH_ENABLED.store(enabled, Ordering::Relaxed);
}

/// Check if a log level is enabled
#[inline]
pub fn level_enabled(level: LogLevel) -> bool {
    level as u8 <= log_level() as u8
}

/// Route all subsequent log lines through `queue`.
///
/// Returns `false` (and changes nothing) if a sink was already
/// installed. The asynchronous logger calls this when it starts.
pub fn install_queue(queue: Arc<LogEntryQueue>) -> bool {
    QUEUE_SINK.set(queue).is_ok()
}

/// True once a queue sink has been installed
pub fn queue_installed() -> bool {
    QUEUE_SINK.get().is_some()
}

/// Fixed-capacity formatting target; overflow truncates silently.
/// Truncation may split a multi-byte character at the boundary.
struct FixedCursor<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl<'a> FixedCursor<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, len: 0 }
    }

    fn bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

impl fmt::Write for FixedCursor<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = self.buf.len() - self.len;
        let take = s.len().min(room);
        self.buf[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
        Ok(())
    }
}

/// Internal: format one line and deliver it
#[doc(hidden)]
pub fn _conlog_impl(level: LogLevel, args: fmt::Arguments<'_>) {
    if !level_enabled(level) {
        return;
    }

    let mut storage = [0u8; MAX_ENTRY_LENGTH - 1];
    let mut cursor = FixedCursor::new(&mut storage);
    {
        use fmt::Write as _;
        let _ = write!(cursor, "{} ", level.prefix());
        let _ = cursor.write_fmt(args);
    }
    let line = cursor.bytes();
    if line.is_empty() {
        return;
    }

    if let Some(queue) = QUEUE_SINK.get() {
        // Full queue: drop the line. The producer side must never stall.
        let _ = queue.enqueue(line);
        return;
    }

    let stderr = std::io::stderr();
    let mut handle = stderr.lock();
    let _ = handle.write_all(line);
    let _ = handle.write_all(b"\n");
    if FLUSH_ENABLED.load(Ordering::Relaxed) {
        let _ = handle.flush();
    }
}

// ============================================================================
// Public Macros
// ============================================================================

/// Error level log (always shown unless logging is off)
#[macro_export]
macro_rules! cerror {
    ($($arg:tt)*) => {{
        $crate::conlog::_conlog_impl(
            $crate::conlog::LogLevel::Error,
            format_args!($($arg)*)
        );
    }};
}

/// Warning level log
#[macro_export]
macro_rules! cwarn {
    ($($arg:tt)*) => {{
        $crate::conlog::_conlog_impl(
            $crate::conlog::LogLevel::Warn,
            format_args!($($arg)*)
        );
    }};
}

/// Info level log
#[macro_export]
macro_rules! cinfo {
    ($($arg:tt)*) => {{
        $crate::conlog::_conlog_impl(
            $crate::conlog::LogLevel::Info,
            format_args!($($arg)*)
        );
    }};
}

/// Debug level log
#[macro_export]
macro_rules! cdebug {
    ($($arg:tt)*) => {{
        $crate::conlog::_conlog_impl(
            $crate::conlog::LogLevel::Debug,
            format_args!($($arg)*)
        );
    }};
}

/// Trace level log (most verbose)
#[macro_export]
macro_rules! ctrace {
    ($($arg:tt)*) => {{
        $crate::conlog::_conlog_impl(
            $crate::conlog::LogLevel::Trace,
            format_args!($($arg)*)
        );
    }};
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MAX_ENTRY_LENGTH;

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Trace);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(LogLevel::parse("warn"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("WARN"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("4"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("verbose"), None);
        assert_eq!(LogLevel::from_u8(99), LogLevel::Trace);
    }

    #[test]
    fn test_fixed_cursor_truncates() {
        use fmt::Write as _;
        let mut storage = [0u8; 8];
        let mut cursor = FixedCursor::new(&mut storage);
        write!(cursor, "0123456789").unwrap();
        assert_eq!(cursor.bytes(), b"01234567");

        // Further writes stay silently dropped.
        write!(cursor, "x").unwrap();
        assert_eq!(cursor.bytes(), b"01234567");
    }

    #[test]
    fn test_queue_routing_and_filtering() {
        let queue = Arc::new(LogEntryQueue::new());
        assert!(install_queue(Arc::clone(&queue)));
        // Install-once: a second logger cannot steal the sink.
        assert!(!install_queue(Arc::new(LogEntryQueue::new())));
        assert!(queue_installed());

        set_log_level(LogLevel::Info);
        crate::cinfo!("frame {} ready", 7);
        crate::cdebug!("suppressed at info level");

        let mut dest = [0u8; MAX_ENTRY_LENGTH];
        let n = queue.dequeue(&mut dest);
        assert_eq!(&dest[..n], b"[I] frame 7 ready");
        // The debug line was filtered before reaching the queue.
        assert_eq!(queue.dequeue(&mut dest), 0);
    }
}
