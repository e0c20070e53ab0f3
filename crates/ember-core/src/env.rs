//! Environment variable utilities
//!
//! Generic `env_get<T>` parsing with defaults, used by the console log
//! layer and the logger configuration.
//!
//! ```ignore
//! use ember_core::env::{env_get, env_get_bool};
//!
//! let poll_us: u64 = env_get("EMBER_LOG_POLL_US", 500);
//! let flush: bool = env_get_bool("EMBER_LOG_FLUSH", false);
//! ```

use std::str::FromStr;

/// Get environment variable parsed as type T, or return default
///
/// Works with any type that implements `FromStr`; parse failures fall
/// back to the default.
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Get environment variable as boolean
///
/// Accepts "1", "true", "yes", "on" (case-insensitive) as true.
/// Any other set value is false; unset returns the default.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

/// Get environment variable as optional value
///
/// Returns `Some(T)` if the variable is set and parses successfully,
/// `None` otherwise.
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_get_default() {
        let val: usize = env_get("__EMBER_TEST_UNSET__", 42);
        assert_eq!(val, 42);
    }

    #[test]
    fn test_env_get_set_and_invalid() {
        std::env::set_var("__EMBER_TEST_NUM__", "123");
        let val: usize = env_get("__EMBER_TEST_NUM__", 0);
        assert_eq!(val, 123);

        std::env::set_var("__EMBER_TEST_NUM__", "not_a_number");
        let val: usize = env_get("__EMBER_TEST_NUM__", 99);
        assert_eq!(val, 99);
        std::env::remove_var("__EMBER_TEST_NUM__");
    }

    #[test]
    fn test_env_get_bool_variants() {
        assert!(env_get_bool("__EMBER_TEST_UNSET__", true));
        assert!(!env_get_bool("__EMBER_TEST_UNSET__", false));

        std::env::set_var("__EMBER_TEST_BOOL__", "YES");
        assert!(env_get_bool("__EMBER_TEST_BOOL__", false));

        std::env::set_var("__EMBER_TEST_BOOL__", "garbage");
        assert!(!env_get_bool("__EMBER_TEST_BOOL__", true));
        std::env::remove_var("__EMBER_TEST_BOOL__");
    }

    #[test]
    fn test_env_get_opt() {
        let val: Option<u16> = env_get_opt("__EMBER_TEST_UNSET__");
        assert!(val.is_none());

        std::env::set_var("__EMBER_TEST_OPT__", "8080");
        let val: Option<u16> = env_get_opt("__EMBER_TEST_OPT__");
        assert_eq!(val, Some(8080));
        std::env::remove_var("__EMBER_TEST_OPT__");
    }
}
