//! Error types for the logger system

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// A call argument was rejected before anything was written
    #[error("Invalid argument '{argument}': {message}")]
    InvalidArgument { argument: String, message: String },

    /// Level name with no handler bound on this logger
    #[error("Unknown log level '{0}'")]
    UnknownLevel(String),

    /// Failure reported by the underlying store
    #[error("Backend error ({backend}): {message}")]
    Backend { backend: String, message: String },

    /// The stream source cannot be read any more
    #[error("Stream source unavailable: {0}")]
    SourceUnavailable(String),

    /// A persisted record failed to decode while streaming
    #[error("Malformed record at offset {offset}: {source}")]
    MalformedRecord {
        offset: u64,
        #[source]
        source: serde_json::Error,
    },

    /// Streaming was requested outside of a Tokio runtime
    #[error("No Tokio runtime available to drive the stream")]
    NoRuntime,

    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl LoggerError {
    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(argument: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidArgument {
            argument: argument.into(),
            message: message.into(),
        }
    }

    /// Create a backend error
    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::Backend {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create a malformed record error
    pub fn malformed(offset: u64, source: serde_json::Error) -> Self {
        LoggerError::MalformedRecord { offset, source }
    }

    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Whether a stream session must end after reporting this error.
    ///
    /// Record boundaries cannot be trusted after a decode failure, a
    /// vanished source has nothing left to read, and an invalid request
    /// fails the same way on every poll.
    pub fn ends_stream(&self) -> bool {
        matches!(
            self,
            LoggerError::MalformedRecord { .. }
                | LoggerError::SourceUnavailable(_)
                | LoggerError::InvalidArgument { .. }
                | LoggerError::NoRuntime
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = LoggerError::config("Logger", "missing store");
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));

        let err = LoggerError::invalid_argument("cause", "not an error");
        assert!(matches!(err, LoggerError::InvalidArgument { .. }));

        let err = LoggerError::backend("document", "connection refused");
        assert!(matches!(err, LoggerError::Backend { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = LoggerError::config("Logger", "a store is required");
        assert_eq!(
            err.to_string(),
            "Invalid configuration for Logger: a store is required"
        );

        let err = LoggerError::UnknownLevel("verbose".to_string());
        assert_eq!(err.to_string(), "Unknown log level 'verbose'");

        let err = LoggerError::backend("list", "key is not a list");
        assert_eq!(err.to_string(), "Backend error (list): key is not a list");
    }

    #[test]
    fn test_ends_stream() {
        let decode = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        assert!(LoggerError::malformed(12, decode).ends_stream());
        assert!(LoggerError::SourceUnavailable("gone".into()).ends_stream());
        assert!(LoggerError::invalid_argument("offset", "wrong cursor").ends_stream());
        assert!(!LoggerError::backend("list", "timeout").ends_stream());
    }

    #[test]
    fn test_io_operation_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = LoggerError::io_operation("clearing log file", "cannot remove file", io_err);

        assert!(matches!(err, LoggerError::IoOperation { .. }));
        assert!(err.to_string().contains("clearing log file"));
        assert!(err.to_string().contains("cannot remove file"));
    }
}
