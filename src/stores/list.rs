//! List store implementation
//!
//! Persists entries as JSON strings appended to a named list in a key-value
//! backend, and streams them back page by page by list index.

use crate::core::{
    spawn_stream, Batch, ClearCallback, LogEntry, LogStream, LoggerError, Result, Store,
    StreamCursor, StreamOptions, StreamSource, StreamingStore, DEFAULT_POLL_INTERVAL,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// List key used when none is configured
pub const DEFAULT_KEY: &str = "logit";

/// Records fetched per page while streaming
pub const DEFAULT_RANGE_SIZE: u64 = 300;

/// Key-value backend holding lists of strings
///
/// Indices are zero-based and `lrange` bounds are inclusive.
pub trait ListBackend: Send + Sync {
    /// Append `value` to the list at `key`, returning the new length
    fn rpush(&self, key: &str, value: String) -> Result<u64>;

    fn lrange(&self, key: &str, start: u64, stop: u64) -> Result<Vec<String>>;

    fn del(&self, key: &str) -> Result<()>;
}

/// In-process list backend
#[derive(Debug, Default)]
pub struct MemoryListBackend {
    lists: Mutex<HashMap<String, Vec<String>>>,
}

impl MemoryListBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, key: &str) -> usize {
        self.lists.lock().get(key).map_or(0, Vec::len)
    }

    pub fn is_empty(&self, key: &str) -> bool {
        self.len(key) == 0
    }
}

impl ListBackend for MemoryListBackend {
    fn rpush(&self, key: &str, value: String) -> Result<u64> {
        let mut lists = self.lists.lock();
        let list = lists.entry(key.to_string()).or_default();
        list.push(value);
        Ok(list.len() as u64)
    }

    fn lrange(&self, key: &str, start: u64, stop: u64) -> Result<Vec<String>> {
        let lists = self.lists.lock();
        let Some(list) = lists.get(key) else {
            return Ok(Vec::new());
        };

        let len = list.len() as u64;
        if start >= len || start > stop {
            return Ok(Vec::new());
        }
        let end = stop.min(len - 1);
        Ok(list[start as usize..=end as usize].to_vec())
    }

    fn del(&self, key: &str) -> Result<()> {
        self.lists.lock().remove(key);
        Ok(())
    }
}

/// Store appending entries to a list in a [`ListBackend`]
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use rust_logit::core::{LogEntry, Store};
/// use rust_logit::stores::{ListStore, MemoryListBackend};
///
/// let backend = Arc::new(MemoryListBackend::new());
/// let store = ListStore::new(backend.clone(), "app-logs").with_range_size(100);
///
/// store.write(LogEntry::new("info", "hello")).unwrap();
/// assert_eq!(backend.len("app-logs"), 1);
/// ```
pub struct ListStore {
    backend: Arc<dyn ListBackend>,
    key: String,
    range_size: u64,
}

impl ListStore {
    pub fn new(backend: Arc<dyn ListBackend>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            range_size: DEFAULT_RANGE_SIZE,
        }
    }

    /// Store on the default key
    pub fn with_default_key(backend: Arc<dyn ListBackend>) -> Self {
        Self::new(backend, DEFAULT_KEY)
    }

    /// Records fetched per page while streaming, at least one
    #[must_use]
    pub fn with_range_size(mut self, range_size: u64) -> Self {
        self.range_size = range_size.max(1);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn range_size(&self) -> u64 {
        self.range_size
    }
}

impl Store for ListStore {
    fn write(&self, entry: LogEntry) -> Result<()> {
        let value = serde_json::to_string(&entry)?;
        self.backend.rpush(&self.key, value)?;
        Ok(())
    }

    fn clear(&self, callback: ClearCallback) {
        callback(self.backend.del(&self.key));
    }

    fn name(&self) -> &str {
        "list"
    }

    fn as_streaming(&self) -> Option<&dyn StreamingStore> {
        Some(self)
    }
}

impl StreamingStore for ListStore {
    fn stream(&self, options: StreamOptions) -> LogStream {
        let resume = options.resume_at("list index", |cursor| match cursor {
            StreamCursor::Index(index) => Some(index),
            _ => None,
        });
        let (next, pending) = match resume {
            Ok(next) => (next.unwrap_or(0), None),
            Err(err) => (0, Some(err)),
        };
        let source = ListSource {
            backend: Arc::clone(&self.backend),
            key: self.key.clone(),
            range_size: self.range_size,
            next,
            pending,
        };
        spawn_stream(source, &options, DEFAULT_POLL_INTERVAL)
    }
}

struct ListSource {
    backend: Arc<dyn ListBackend>,
    key: String,
    range_size: u64,
    /// Index of the next record to deliver
    next: u64,
    /// Failure reported on the next fetch, after any records before it
    pending: Option<LoggerError>,
}

#[async_trait]
impl StreamSource for ListSource {
    fn name(&self) -> &str {
        "list"
    }

    fn cursor(&self) -> StreamCursor {
        StreamCursor::Index(self.next)
    }

    async fn fetch(&mut self) -> Result<Batch> {
        if let Some(err) = self.pending.take() {
            return Err(err);
        }

        let stop = self.next.saturating_add(self.range_size - 1);
        let values = self.backend.lrange(&self.key, self.next, stop)?;
        let full_page = values.len() as u64 == self.range_size;

        let mut entries = Vec::with_capacity(values.len());
        for (i, value) in values.iter().enumerate() {
            match serde_json::from_str(value) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    self.pending = Some(LoggerError::malformed(self.next + i as u64, e));
                    break;
                }
            }
        }

        self.next += entries.len() as u64;
        Ok(Batch {
            entries,
            cursor: self.cursor(),
            more: full_page || self.pending.is_some(),
        })
    }
}
