//! Core logger types and traits

pub mod entry_builder;
pub mod error;
pub mod level;
pub mod log_entry;
pub mod logger;
pub mod message;
pub mod metrics;
pub mod stack;
pub mod store;
pub mod stream;

pub use entry_builder::{EntryBuilder, StackPolicy};
pub use error::{LoggerError, Result};
pub use level::Level;
pub use log_entry::{CallSite, ErrorInfo, LogEntry};
pub use logger::{LevelHandler, Logger, LoggerBuilder, LoggerConfig};
pub use message::{Cause, Message};
pub use metrics::LoggerMetrics;
pub use stack::{CapturedError, RawStack, StackInspector, DEFAULT_STACK_DEPTH};
pub use store::{ClearCallback, Store, StreamingStore, WriteCallback};
pub use stream::{
    spawn_stream, Batch, LogStream, StreamControl, StreamCursor, StreamEvent, StreamOptions,
    StreamSource, StreamState, DEFAULT_POLL_INTERVAL, DEFAULT_TAIL_INTERVAL,
};
