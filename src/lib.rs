//! # Rust Logit
//!
//! A structured logger that enriches every call with level, timestamp and,
//! on demand, the caller's stack before handing the entry to a pluggable
//! store.
//!
//! ## Features
//!
//! - **Open level set**: any level names, each bound to its own handler
//! - **Call-site capture**: stack and source location per level or per call
//! - **Error enrichment**: error summary, or full error stack on request
//! - **Pluggable stores**: console, file, list and document backends
//! - **Streaming**: replay and tail what a store persisted, stoppable at any time
//!
//! ## Example
//!
//! ```
//! use rust_logit::prelude::*;
//!
//! let logger = Logger::builder()
//!     .store(ConsoleStore::new())
//!     .build()
//!     .unwrap();
//!
//! logger.info("ready").unwrap();
//!
//! let err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
//! logger
//!     .error_with(Message::structured("flush failed").with_error_stack(), Cause::error(&err))
//!     .unwrap();
//! ```

pub mod core;
pub mod macros;
pub mod stores;

pub mod prelude {
    pub use crate::core::{
        Cause, LogEntry, LogStream, Logger, LoggerBuilder, LoggerConfig, LoggerError, Message,
        Result, Store, StreamEvent, StreamOptions, StreamingStore,
    };
    pub use crate::stores::{ConsoleStore, FileStore};
}

pub use core::{
    CallSite, Cause, ErrorInfo, Level, LogEntry, LogStream, Logger, LoggerBuilder, LoggerConfig,
    LoggerError, LoggerMetrics, Message, Result, Store, StreamControl, StreamCursor, StreamEvent,
    StreamOptions, StreamState, StreamingStore,
};
pub use stores::{ConsoleStore, DocumentStore, FileStore, ListStore};
