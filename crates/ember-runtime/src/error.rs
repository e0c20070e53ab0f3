//! Error types for the ember runtime

use core::fmt;

/// Errors from starting or configuring the asynchronous logger
#[derive(Debug)]
pub enum LoggerError {
    /// A logger already owns the console sink for this process
    AlreadyRunning,

    /// Configuration rejected by `LoggerConfig::validate`
    InvalidConfig(&'static str),

    /// Opening the log file failed
    Io(std::io::Error),
}

impl fmt::Display for LoggerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoggerError::AlreadyRunning => write!(f, "a log thread is already running"),
            LoggerError::InvalidConfig(reason) => write!(f, "invalid logger config: {}", reason),
            LoggerError::Io(err) => write!(f, "log sink error: {}", err),
        }
    }
}

impl std::error::Error for LoggerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoggerError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LoggerError {
    fn from(err: std::io::Error) -> Self {
        LoggerError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            format!("{}", LoggerError::AlreadyRunning),
            "a log thread is already running"
        );
        assert_eq!(
            format!("{}", LoggerError::InvalidConfig("poll interval must be non-zero")),
            "invalid logger config: poll interval must be non-zero"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: LoggerError = io_err.into();
        assert!(matches!(err, LoggerError::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
