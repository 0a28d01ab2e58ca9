//! Store implementations

pub mod console;
pub mod document;
pub mod file;
pub mod list;

pub use console::ConsoleStore;
pub use document::{
    DocumentBackend, DocumentStore, DocumentStoreConfig, MemoryDocumentBackend, ReadyState,
};
pub use file::FileStore;
pub use list::{ListBackend, ListStore, MemoryListBackend};

pub use crate::core::{Store, StreamingStore};
