//! Document store implementation
//!
//! The backend needs a connection handshake before it accepts records. A
//! background worker performs the handshake; until it completes, writes are
//! queued and clears deferred. On readiness a deferred clear runs first,
//! then the queued writes are inserted in their original order, once.

use crate::core::{
    spawn_stream, Batch, ClearCallback, LogEntry, LogStream, LoggerError, Result, Store,
    StreamCursor, StreamOptions, StreamSource, StreamingStore, WriteCallback,
    DEFAULT_POLL_INTERVAL,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::mem;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};

/// Document database the store persists to
///
/// `find_after` returns records with a timestamp strictly greater than the
/// given one, ordered by timestamp and then insertion order.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    async fn connect(&self) -> Result<()>;

    async fn ensure_index(&self, field: &str) -> Result<()>;

    async fn insert(&self, entries: Vec<LogEntry>) -> Result<()>;

    async fn find_after(&self, timestamp: i64) -> Result<Vec<LogEntry>>;

    async fn remove_all(&self) -> Result<()>;

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentStoreConfig {
    /// Default delay between stream polls
    pub poll_interval: Duration,
    /// Fields indexed after connecting
    pub indexes: Vec<String>,
}

impl Default for DocumentStoreConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            indexes: Vec::new(),
        }
    }
}

/// Connection lifecycle of a [`DocumentStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadyState {
    Connecting,
    /// Connected, with every queued write flushed
    Ready,
    Failed(String),
    Closed,
}

/// An accepted write and whoever waits for its acknowledgement
struct QueuedWrite {
    entry: LogEntry,
    ack: Option<WriteCallback>,
}

/// Report an insert outcome to its waiter, or log a failure nobody awaits
fn acknowledge(ack: Option<WriteCallback>, result: Result<()>) {
    match ack {
        Some(ack) => ack(result),
        None => {
            if let Err(err) = result {
                tracing::error!(error = %err, "document insert failed");
            }
        }
    }
}

enum Command {
    Write(QueuedWrite),
    Clear(ClearCallback),
    Close,
}

/// Work accepted before the backend became ready
#[derive(Default)]
struct Pending {
    ready: bool,
    failed: Option<String>,
    queue: Vec<QueuedWrite>,
    clears: Vec<ClearCallback>,
}

/// Store backed by a [`DocumentBackend`]
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use rust_logit::core::{LogEntry, Store};
/// use rust_logit::stores::{DocumentStore, DocumentStoreConfig, MemoryDocumentBackend};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> rust_logit::Result<()> {
/// let backend = Arc::new(MemoryDocumentBackend::new());
/// let store = DocumentStore::connect(backend.clone(), DocumentStoreConfig::default())?;
///
/// // Queued until the handshake completes
/// store.write(LogEntry::new("info", "early"))?;
///
/// store.wait_ready().await?;
/// assert_eq!(backend.documents().len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct DocumentStore {
    backend: Arc<dyn DocumentBackend>,
    config: DocumentStoreConfig,
    pending: Arc<Mutex<Pending>>,
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ReadyState>,
}

impl DocumentStore {
    /// Start connecting to `backend` in the background
    ///
    /// # Errors
    ///
    /// [`LoggerError::NoRuntime`] when called outside a Tokio runtime.
    pub fn connect(backend: Arc<dyn DocumentBackend>, config: DocumentStoreConfig) -> Result<Self> {
        let handle = Handle::try_current().map_err(|_| LoggerError::NoRuntime)?;

        let pending = Arc::new(Mutex::new(Pending::default()));
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ReadyState::Connecting);

        handle.spawn(run_worker(
            Arc::clone(&backend),
            config.indexes.clone(),
            Arc::clone(&pending),
            commands_rx,
            state_tx,
        ));

        Ok(Self {
            backend,
            config,
            pending,
            commands: commands_tx,
            state: state_rx,
        })
    }

    pub fn config(&self) -> &DocumentStoreConfig {
        &self.config
    }

    pub fn ready_state(&self) -> ReadyState {
        self.state.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        *self.state.borrow() == ReadyState::Ready
    }

    /// Wait until the handshake finished and queued writes were flushed
    pub async fn wait_ready(&self) -> Result<()> {
        let mut state = self.state.clone();
        let outcome = match state.wait_for(|s| *s != ReadyState::Connecting).await {
            Ok(current) => current.clone(),
            Err(_) => ReadyState::Closed,
        };

        match outcome {
            ReadyState::Ready | ReadyState::Connecting => Ok(()),
            ReadyState::Failed(reason) => Err(LoggerError::backend(
                "document",
                format!("connection failed: {}", reason),
            )),
            ReadyState::Closed => Err(LoggerError::backend("document", "store is closed")),
        }
    }

    /// Close the connection after all previously accepted work is done
    pub async fn close(&self) -> Result<()> {
        tracing::debug!("closing document store");
        if self.commands.send(Command::Close).is_err() {
            return Ok(());
        }

        let mut state = self.state.clone();
        let _ = state
            .wait_for(|s| matches!(s, ReadyState::Closed | ReadyState::Failed(_)))
            .await;
        Ok(())
    }
}

impl DocumentStore {
    /// Queue `write` until ready, or hand it to the worker
    ///
    /// A rejected write is returned with the error so its acknowledgement
    /// can still be delivered.
    fn submit(&self, write: QueuedWrite) -> std::result::Result<(), (LoggerError, QueuedWrite)> {
        {
            let mut pending = self.pending.lock();
            if let Some(reason) = &pending.failed {
                let err = LoggerError::backend("document", format!("connection failed: {}", reason));
                return Err((err, write));
            }
            if !pending.ready {
                tracing::debug!(entry = %write.entry.message, "queueing entry until connected");
                pending.queue.push(write);
                return Ok(());
            }
        }

        if let Err(mpsc::error::SendError(Command::Write(write))) =
            self.commands.send(Command::Write(write))
        {
            return Err((LoggerError::backend("document", "store is closed"), write));
        }
        Ok(())
    }
}

impl Store for DocumentStore {
    fn write(&self, entry: LogEntry) -> Result<()> {
        self.submit(QueuedWrite { entry, ack: None })
            .map_err(|(err, _)| err)
    }

    fn write_with(&self, entry: LogEntry, callback: WriteCallback) {
        let write = QueuedWrite {
            entry,
            ack: Some(callback),
        };
        if let Err((err, write)) = self.submit(write) {
            acknowledge(write.ack, Err(err));
        }
    }

    fn clear(&self, callback: ClearCallback) {
        let callback = {
            let mut pending = self.pending.lock();
            if let Some(reason) = &pending.failed {
                let reason = format!("connection failed: {}", reason);
                drop(pending);
                callback(Err(LoggerError::backend("document", reason)));
                return;
            }
            if !pending.ready {
                tracing::debug!("deferring clear until connected");
                pending.clears.push(callback);
                return;
            }
            callback
        };

        if let Err(mpsc::error::SendError(command)) = self.commands.send(Command::Clear(callback)) {
            if let Command::Clear(callback) = command {
                callback(Err(LoggerError::backend("document", "store is closed")));
            }
        }
    }

    fn name(&self) -> &str {
        "document"
    }

    fn as_streaming(&self) -> Option<&dyn StreamingStore> {
        Some(self)
    }
}

impl StreamingStore for DocumentStore {
    fn stream(&self, options: StreamOptions) -> LogStream {
        let resume = options.resume_at("timestamp watermark", |cursor| match cursor {
            StreamCursor::Watermark(timestamp) => Some(timestamp),
            _ => None,
        });
        let (watermark, pending) = match resume {
            Ok(watermark) => (watermark.unwrap_or(i64::MIN), None),
            Err(err) => (i64::MIN, Some(err)),
        };
        let source = DocumentSource {
            backend: Arc::clone(&self.backend),
            state: self.state.clone(),
            watermark,
            pending,
        };
        spawn_stream(source, &options, self.config.poll_interval)
    }
}

async fn handshake(backend: &dyn DocumentBackend, indexes: &[String]) -> Result<()> {
    backend.connect().await?;
    tracing::debug!("connected to document backend");

    for index in indexes {
        backend.ensure_index(index).await?;
    }
    if !indexes.is_empty() {
        tracing::debug!(count = indexes.len(), "ensured indexes");
    }
    Ok(())
}

async fn run_worker(
    backend: Arc<dyn DocumentBackend>,
    indexes: Vec<String>,
    pending: Arc<Mutex<Pending>>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    state: watch::Sender<ReadyState>,
) {
    if let Err(err) = handshake(backend.as_ref(), &indexes).await {
        let reason = err.to_string();
        tracing::error!(error = %err, "document store connection failed");

        let (dropped, clears) = {
            let mut pending = pending.lock();
            pending.failed = Some(reason.clone());
            (mem::take(&mut pending.queue), mem::take(&mut pending.clears))
        };
        if !dropped.is_empty() {
            tracing::error!(count = dropped.len(), "dropping entries queued before connection");
        }
        for write in dropped {
            if let Some(ack) = write.ack {
                ack(Err(LoggerError::backend(
                    "document",
                    format!("connection failed: {}", reason),
                )));
            }
        }
        for callback in clears {
            callback(Err(LoggerError::backend(
                "document",
                format!("connection failed: {}", reason),
            )));
        }
        let _ = state.send(ReadyState::Failed(reason));
        return;
    }

    let (queue, clears) = {
        let mut pending = pending.lock();
        pending.ready = true;
        (mem::take(&mut pending.queue), mem::take(&mut pending.clears))
    };

    if !clears.is_empty() {
        tracing::debug!(callbacks = clears.len(), "running deferred clear");
        let result = backend.remove_all().await;
        for callback in clears {
            callback(share_result(&result));
        }
    }
    if !queue.is_empty() {
        tracing::debug!(count = queue.len(), "flushing queued entries");
        let (entries, acks): (Vec<_>, Vec<_>) =
            queue.into_iter().map(|write| (write.entry, write.ack)).unzip();
        let result = backend.insert(entries).await;
        if let Err(err) = &result {
            tracing::error!(error = %err, "failed to flush queued entries");
        }
        for ack in acks.into_iter().flatten() {
            ack(share_result(&result));
        }
    }
    let _ = state.send(ReadyState::Ready);

    while let Some(command) = commands.recv().await {
        match command {
            Command::Write(QueuedWrite { entry, ack }) => {
                acknowledge(ack, backend.insert(vec![entry]).await);
            }
            Command::Clear(callback) => callback(backend.remove_all().await),
            Command::Close => break,
        }
    }

    // Refuse work that raced the close
    commands.close();
    while let Ok(command) = commands.try_recv() {
        let closed = || LoggerError::backend("document", "store is closed");
        match command {
            Command::Write(QueuedWrite { ack, .. }) => acknowledge(ack, Err(closed())),
            Command::Clear(callback) => callback(Err(closed())),
            Command::Close => {}
        }
    }

    if let Err(err) = backend.close().await {
        tracing::warn!(error = %err, "closing document backend failed");
    }
    let _ = state.send(ReadyState::Closed);
}

fn share_result(result: &Result<()>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(err) => Err(LoggerError::backend("document", err.to_string())),
    }
}

/// Polls for records newer than the last delivered timestamp
///
/// Records sharing the watermark's timestamp but inserted after the poll
/// that set it are not delivered.
struct DocumentSource {
    backend: Arc<dyn DocumentBackend>,
    state: watch::Receiver<ReadyState>,
    watermark: i64,
    pending: Option<LoggerError>,
}

#[async_trait]
impl StreamSource for DocumentSource {
    fn name(&self) -> &str {
        "document"
    }

    fn cursor(&self) -> StreamCursor {
        StreamCursor::Watermark(self.watermark)
    }

    async fn fetch(&mut self) -> Result<Batch> {
        if let Some(err) = self.pending.take() {
            return Err(err);
        }

        let state = match self.state.wait_for(|s| *s != ReadyState::Connecting).await {
            Ok(current) => current.clone(),
            Err(_) => ReadyState::Closed,
        };
        match state {
            ReadyState::Ready | ReadyState::Connecting => {}
            ReadyState::Failed(reason) => {
                return Err(LoggerError::SourceUnavailable(format!(
                    "document store connection failed: {}",
                    reason
                )))
            }
            ReadyState::Closed => {
                return Err(LoggerError::SourceUnavailable(
                    "document store is closed".to_string(),
                ))
            }
        }

        let entries = self.backend.find_after(self.watermark).await?;
        if let Some(last) = entries.last() {
            self.watermark = last.timestamp;
        }
        Ok(Batch::new(entries, self.cursor()))
    }
}

/// In-process document backend
#[derive(Debug, Default)]
pub struct MemoryDocumentBackend {
    documents: Mutex<Vec<LogEntry>>,
    indexes: Mutex<Vec<String>>,
    connect_delay: Duration,
    connect_failure: Option<String>,
    insert_failure: Option<String>,
    connected: AtomicBool,
    removals: AtomicUsize,
}

impl MemoryDocumentBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay the handshake by `delay`
    #[must_use]
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    /// Make the handshake fail with `reason`
    #[must_use]
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.connect_failure = Some(reason.into());
        self
    }

    /// Make every insert fail with `reason`
    #[must_use]
    pub fn rejecting_inserts(mut self, reason: impl Into<String>) -> Self {
        self.insert_failure = Some(reason.into());
        self
    }

    pub fn documents(&self) -> Vec<LogEntry> {
        self.documents.lock().clone()
    }

    pub fn indexes(&self) -> Vec<String> {
        self.indexes.lock().clone()
    }

    /// Number of `remove_all` calls served
    pub fn removals(&self) -> usize {
        self.removals.load(Ordering::SeqCst)
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LoggerError::backend("memory-document", "not connected"))
        }
    }
}

#[async_trait]
impl DocumentBackend for MemoryDocumentBackend {
    async fn connect(&self) -> Result<()> {
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        if let Some(reason) = &self.connect_failure {
            return Err(LoggerError::backend("memory-document", reason.clone()));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn ensure_index(&self, field: &str) -> Result<()> {
        self.ensure_connected()?;
        let mut indexes = self.indexes.lock();
        if !indexes.iter().any(|existing| existing == field) {
            indexes.push(field.to_string());
        }
        Ok(())
    }

    async fn insert(&self, entries: Vec<LogEntry>) -> Result<()> {
        self.ensure_connected()?;
        if let Some(reason) = &self.insert_failure {
            return Err(LoggerError::backend("memory-document", reason.clone()));
        }
        self.documents.lock().extend(entries);
        Ok(())
    }

    async fn find_after(&self, timestamp: i64) -> Result<Vec<LogEntry>> {
        self.ensure_connected()?;
        let mut found: Vec<LogEntry> = self
            .documents
            .lock()
            .iter()
            .filter(|entry| entry.timestamp > timestamp)
            .cloned()
            .collect();
        found.sort_by_key(|entry| entry.timestamp);
        Ok(found)
    }

    async fn remove_all(&self) -> Result<()> {
        self.ensure_connected()?;
        self.documents.lock().clear();
        self.removals.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delayed_backend() -> Arc<MemoryDocumentBackend> {
        Arc::new(MemoryDocumentBackend::new().with_connect_delay(Duration::from_millis(30)))
    }

    fn messages(entries: &[LogEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.message.as_str()).collect()
    }

    #[test]
    fn test_connect_requires_runtime() {
        let result = DocumentStore::connect(
            Arc::new(MemoryDocumentBackend::new()),
            DocumentStoreConfig::default(),
        );
        assert!(matches!(result, Err(LoggerError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_queued_writes_flush_in_order() {
        let backend = delayed_backend();
        let store = DocumentStore::connect(backend.clone(), DocumentStoreConfig::default()).unwrap();

        for message in ["one", "two", "three"] {
            store.write(LogEntry::new("info", message)).unwrap();
        }
        assert!(!store.is_ready());
        assert!(backend.documents().is_empty());

        store.wait_ready().await.unwrap();
        assert_eq!(messages(&backend.documents()), ["one", "two", "three"]);

        store.write(LogEntry::new("info", "four")).unwrap();
        store.close().await.unwrap();
        assert_eq!(backend.documents().len(), 4);
        assert_eq!(store.ready_state(), ReadyState::Closed);
    }

    #[tokio::test]
    async fn test_deferred_clear_runs_once_before_flush() {
        let backend = delayed_backend();
        let store = DocumentStore::connect(backend.clone(), DocumentStoreConfig::default()).unwrap();
        let fired = Arc::new(Mutex::new(Vec::new()));

        store.write(LogEntry::new("info", "a")).unwrap();
        let fired_clone = Arc::clone(&fired);
        store.clear(Box::new(move |result| fired_clone.lock().push(result.is_ok())));
        store.write(LogEntry::new("info", "b")).unwrap();

        store.wait_ready().await.unwrap();

        assert_eq!(*fired.lock(), [true]);
        assert_eq!(backend.removals(), 1);
        assert_eq!(messages(&backend.documents()), ["a", "b"]);
    }

    #[tokio::test]
    async fn test_clear_after_ready() {
        let backend = Arc::new(MemoryDocumentBackend::new());
        let store = DocumentStore::connect(backend.clone(), DocumentStoreConfig::default()).unwrap();
        store.wait_ready().await.unwrap();
        store.write(LogEntry::new("info", "gone")).unwrap();

        let (tx, rx) = tokio::sync::oneshot::channel();
        store.clear(Box::new(move |result| {
            let _ = tx.send(result.is_ok());
        }));

        assert!(rx.await.unwrap());
        assert!(backend.documents().is_empty());
    }

    #[tokio::test]
    async fn test_indexes_ensured() {
        let backend = Arc::new(MemoryDocumentBackend::new());
        let config = DocumentStoreConfig {
            indexes: vec!["timestamp".to_string(), "level".to_string()],
            ..Default::default()
        };
        let store = DocumentStore::connect(backend.clone(), config).unwrap();
        store.wait_ready().await.unwrap();

        assert_eq!(backend.indexes(), ["timestamp", "level"]);
    }

    #[tokio::test]
    async fn test_connection_failure_reported() {
        let backend = Arc::new(MemoryDocumentBackend::new().failing("refused"));
        let store = DocumentStore::connect(backend, DocumentStoreConfig::default()).unwrap();
        let fired = Arc::new(Mutex::new(None));

        let fired_clone = Arc::clone(&fired);
        store.clear(Box::new(move |result| {
            *fired_clone.lock() = Some(result.is_err());
        }));

        assert!(store.wait_ready().await.is_err());
        assert_eq!(*fired.lock(), Some(true));
        assert!(store.write(LogEntry::new("info", "late")).is_err());

        let err = store
            .stream(StreamOptions::replay())
            .read_to_end()
            .await
            .unwrap_err();
        assert!(matches!(err, LoggerError::SourceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_stream_waits_for_connection() {
        let backend = delayed_backend();
        let store = DocumentStore::connect(backend, DocumentStoreConfig::default()).unwrap();
        store
            .write(LogEntry::new("info", "queued").with_timestamp(1))
            .unwrap();

        let entries = store
            .stream(StreamOptions::replay())
            .read_to_end()
            .await
            .unwrap();
        assert_eq!(messages(&entries), ["queued"]);
    }

    #[tokio::test]
    async fn test_source_advances_watermark() {
        let backend = Arc::new(MemoryDocumentBackend::new());
        let store = DocumentStore::connect(backend.clone(), DocumentStoreConfig::default()).unwrap();
        store.wait_ready().await.unwrap();
        backend
            .insert(vec![
                LogEntry::new("info", "t10").with_timestamp(10),
                LogEntry::new("info", "t20").with_timestamp(20),
            ])
            .await
            .unwrap();

        let mut source = DocumentSource {
            backend: backend.clone(),
            state: store.state.clone(),
            watermark: 10,
            pending: None,
        };
        let batch = source.fetch().await.unwrap();
        assert_eq!(messages(&batch.entries), ["t20"]);
        assert_eq!(batch.cursor, StreamCursor::Watermark(20));

        assert!(source.fetch().await.unwrap().entries.is_empty());
    }

    fn ack_sink() -> (Arc<Mutex<Vec<bool>>>, impl Fn() -> WriteCallback) {
        let acks = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&acks);
        let make = move || -> WriteCallback {
            let sink = Arc::clone(&sink);
            Box::new(move |result: Result<()>| sink.lock().push(result.is_ok()))
        };
        (acks, make)
    }

    #[tokio::test]
    async fn test_insert_failure_reaches_write_callback() {
        let backend = Arc::new(
            MemoryDocumentBackend::new()
                .with_connect_delay(Duration::from_millis(20))
                .rejecting_inserts("disk full"),
        );
        let store = DocumentStore::connect(backend.clone(), DocumentStoreConfig::default()).unwrap();
        let (acks, ack) = ack_sink();

        store.write_with(LogEntry::new("info", "queued"), ack());
        store.wait_ready().await.unwrap();
        assert_eq!(*acks.lock(), [false]);

        let (tx, rx) = tokio::sync::oneshot::channel();
        store.write_with(
            LogEntry::new("info", "direct"),
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        );
        let err = rx.await.unwrap().unwrap_err();
        assert!(err.to_string().contains("disk full"));
        assert!(backend.documents().is_empty());
    }

    #[tokio::test]
    async fn test_write_callbacks_acknowledged_on_success() {
        let backend = delayed_backend();
        let store = DocumentStore::connect(backend, DocumentStoreConfig::default()).unwrap();
        let (acks, ack) = ack_sink();

        store.write_with(LogEntry::new("info", "early"), ack());
        store.wait_ready().await.unwrap();
        store.write_with(LogEntry::new("info", "late"), ack());
        store.close().await.unwrap();

        assert_eq!(*acks.lock(), [true, true]);

        store.write_with(LogEntry::new("info", "closed"), ack());
        assert_eq!(*acks.lock(), [true, true, false]);
    }

    #[tokio::test]
    async fn test_queued_write_callbacks_fail_with_connection() {
        let backend = Arc::new(
            MemoryDocumentBackend::new()
                .with_connect_delay(Duration::from_millis(20))
                .failing("refused"),
        );
        let store = DocumentStore::connect(backend, DocumentStoreConfig::default()).unwrap();
        let (acks, ack) = ack_sink();

        store.write_with(LogEntry::new("info", "queued"), ack());
        assert!(store.wait_ready().await.is_err());
        assert_eq!(*acks.lock(), [false]);
    }

    #[tokio::test]
    async fn test_foreign_cursor_rejected() {
        let store = DocumentStore::connect(
            Arc::new(MemoryDocumentBackend::new()),
            DocumentStoreConfig::default(),
        )
        .unwrap();

        let err = store
            .stream(StreamOptions::replay().with_offset(StreamCursor::Index(0)))
            .read_to_end()
            .await
            .unwrap_err();
        assert!(matches!(err, LoggerError::InvalidArgument { .. }));
    }
}
