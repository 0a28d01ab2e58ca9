//! Logging macros for ergonomic log message formatting.
//!
//! These macros provide a convenient interface for logging with automatic
//! string formatting, similar to `println!` and `format!`. Each expands to
//! a call returning [`Result`](crate::Result).
//!
//! # Examples
//!
//! ```
//! use rust_logit::prelude::*;
//! use rust_logit::info;
//!
//! let logger = Logger::builder().store(ConsoleStore::new()).build().unwrap();
//!
//! // Basic logging
//! info!(logger, "Server started").unwrap();
//!
//! // With format arguments
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port).unwrap();
//! ```

/// Log a formatted message at any bound level.
///
/// # Examples
///
/// ```
/// # use rust_logit::prelude::*;
/// # let logger = Logger::builder().levels(["audit"]).store(ConsoleStore::new()).build().unwrap();
/// use rust_logit::log;
/// log!(logger, "audit", "Simple message").unwrap();
/// log!(logger, "audit", "Error code: {}", 500).unwrap();
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log($level, format!($($arg)+))
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::DEBUG, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::INFO, $($arg)+)
    };
}

/// Log a warning-level message.
///
/// # Examples
///
/// ```
/// # use rust_logit::prelude::*;
/// # let logger = Logger::builder().store(ConsoleStore::new()).build().unwrap();
/// use rust_logit::warn;
/// warn!(logger, "Retry attempt {} of {}", 3, 5).unwrap();
/// ```
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::WARN, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::ERROR, $($arg)+)
    };
}
