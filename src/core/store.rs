//! Store trait for log persistence backends

use super::{error::Result, log_entry::LogEntry, stream::LogStream, stream::StreamOptions};

/// Completion callback for [`Store::clear`]
pub type ClearCallback = Box<dyn FnOnce(Result<()>) + Send + 'static>;

/// Acknowledgement callback for [`Store::write_with`]
pub type WriteCallback = Box<dyn FnOnce(Result<()>) + Send + 'static>;

/// A persistence backend a logger writes to
///
/// `write` hands an entry over to the backend; backends that are not ready
/// yet queue it rather than fail. `write_with` does the same and reports
/// whether the backend actually persisted the entry. `clear` removes
/// everything persisted and reports completion through its callback,
/// possibly from another task.
///
/// # Example
///
/// ```
/// use rust_logit::core::{ClearCallback, LogEntry, Result, Store};
/// use parking_lot::Mutex;
///
/// #[derive(Default)]
/// struct MemoryStore {
///     entries: Mutex<Vec<LogEntry>>,
/// }
///
/// impl Store for MemoryStore {
///     fn write(&self, entry: LogEntry) -> Result<()> {
///         self.entries.lock().push(entry);
///         Ok(())
///     }
///
///     fn clear(&self, callback: ClearCallback) {
///         self.entries.lock().clear();
///         callback(Ok(()));
///     }
///
///     fn name(&self) -> &str {
///         "memory"
///     }
/// }
/// ```
pub trait Store: Send + Sync {
    fn write(&self, entry: LogEntry) -> Result<()>;
    fn clear(&self, callback: ClearCallback);
    fn name(&self) -> &str;

    /// Write `entry` and report the backend's acknowledgement to `callback`
    ///
    /// Stores that persist synchronously acknowledge with the result of
    /// `write`, before returning. Stores that persist in the background
    /// invoke `callback` once the backend accepted or rejected the entry.
    fn write_with(&self, entry: LogEntry, callback: WriteCallback) {
        callback(self.write(entry));
    }

    /// The streaming capability, if this backend has one
    fn as_streaming(&self) -> Option<&dyn StreamingStore> {
        None
    }
}

/// A store that can replay and tail what it persisted
pub trait StreamingStore: Store {
    /// Start a stream session
    ///
    /// Must be called from within a Tokio runtime; otherwise the returned
    /// stream reports [`LoggerError::NoRuntime`](super::LoggerError::NoRuntime)
    /// and ends.
    fn stream(&self, options: StreamOptions) -> LogStream;
}
