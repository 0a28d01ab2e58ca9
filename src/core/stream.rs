//! Backend-agnostic replay and tailing of persisted entries
//!
//! A stream session repeatedly polls a [`StreamSource`] from a spawned Tokio
//! task. Each poll delivers every entry at or after the session cursor in
//! insertion order, then the session either ends (replay only) or sleeps
//! for the poll interval and polls again (tailing) until stopped.
//!
//! ```text
//! Replaying ──(pass complete, follow)──▶ Tailing
//!     │                                     │
//!     ├──(pass complete, no follow)──▶ Ended │
//!     └──────────────(stop)──────────▶ Stopped ◀──(stop)
//! ```
//!
//! Stopping is race-free: the stop flag is checked before every emitted
//! entry and again on the consuming side, and a poll in flight when the
//! session stops is dropped along with its results.

use super::error::{LoggerError, Result};
use super::log_entry::LogEntry;
use async_trait::async_trait;
use futures::Stream;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Notify};

/// Poll interval for remote backends when none is requested
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Poll interval for local stores when none is requested
pub const DEFAULT_TAIL_INTERVAL: Duration = Duration::from_millis(100);

/// Position of a session in a backend's data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamCursor {
    /// Byte offset just past the last complete record
    Offset(u64),
    /// Index of the next record in a list
    Index(u64),
    /// Timestamp of the last delivered record
    Watermark(i64),
}

/// Options for [`StreamingStore::stream`](super::StreamingStore::stream)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOptions {
    /// Delay between polls, the store's default when `None`
    pub interval: Option<Duration>,
    /// End after one pass over the existing data instead of tailing
    pub end: bool,
    /// Resume position, the start of the data when `None`
    pub offset: Option<StreamCursor>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            interval: None,
            end: true,
            offset: None,
        }
    }
}

impl StreamOptions {
    /// Replay what is stored, then end
    pub fn replay() -> Self {
        Self::default()
    }

    /// Replay what is stored, then keep polling every `interval`
    pub fn follow(interval: Duration) -> Self {
        Self {
            interval: Some(interval),
            end: false,
            offset: None,
        }
    }

    #[must_use]
    pub fn with_offset(mut self, offset: StreamCursor) -> Self {
        self.offset = Some(offset);
        self
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Resume position for a backend that understands `kind` cursors
    ///
    /// `Ok(None)` when no offset was requested.
    ///
    /// # Errors
    ///
    /// [`LoggerError::InvalidArgument`] when the offset is a cursor of
    /// another kind.
    pub fn resume_at<T>(
        &self,
        kind: &str,
        accept: impl FnOnce(StreamCursor) -> Option<T>,
    ) -> Result<Option<T>> {
        let Some(cursor) = self.offset else {
            return Ok(None);
        };
        accept(cursor).map(Some).ok_or_else(|| {
            LoggerError::invalid_argument(
                "offset",
                format!("expected a {} cursor, got {:?}", kind, cursor),
            )
        })
    }
}

/// Lifecycle of a stream session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Replaying,
    Tailing,
    /// Stopped by the consumer
    Stopped,
    /// Ran out of data with tailing off, or hit a terminal error
    Ended,
}

impl StreamState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamState::Stopped | StreamState::Ended)
    }
}

/// Events delivered by a [`LogStream`]
#[derive(Debug)]
pub enum StreamEvent {
    Data(LogEntry),
    Error(LoggerError),
    /// Always the last event of a session
    End,
}

/// Result of one poll
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub entries: Vec<LogEntry>,
    /// Cursor just past the last entry of this batch
    pub cursor: StreamCursor,
    /// More data is known to be available right away
    pub more: bool,
}

impl Batch {
    pub fn new(entries: Vec<LogEntry>, cursor: StreamCursor) -> Self {
        Self {
            entries,
            cursor,
            more: false,
        }
    }
}

/// Per-backend half of the stream protocol
///
/// The source owns its cursor and any partial-record buffer; `fetch`
/// returns everything past the cursor and advances it.
#[async_trait]
pub trait StreamSource: Send + 'static {
    fn name(&self) -> &str;

    fn cursor(&self) -> StreamCursor;

    /// Whether the backend can keep delivering new entries after a pass
    fn supports_tailing(&self) -> bool {
        true
    }

    async fn fetch(&mut self) -> Result<Batch>;
}

struct Session {
    stopped: AtomicBool,
    stop_signal: Notify,
    state: Mutex<StreamState>,
    cursor: Mutex<StreamCursor>,
    events: mpsc::UnboundedSender<StreamEvent>,
}

impl Session {
    fn new(events: mpsc::UnboundedSender<StreamEvent>, cursor: StreamCursor) -> Self {
        Self {
            stopped: AtomicBool::new(false),
            stop_signal: Notify::new(),
            state: Mutex::new(StreamState::Replaying),
            cursor: Mutex::new(cursor),
            events,
        }
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    async fn wait_stopped(&self) {
        loop {
            let notified = self.stop_signal.notified();
            if self.is_stopped() {
                return;
            }
            notified.await;
        }
    }

    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            self.stop_signal.notify_waiters();
        }
        self.finish(StreamState::Stopped);
    }

    /// Enter a terminal state and emit `End`, at most once per session
    fn finish(&self, terminal: StreamState) {
        let mut state = self.state.lock();
        if state.is_terminal() {
            return;
        }
        *state = terminal;
        let _ = self.events.send(StreamEvent::End);
    }

    fn enter_tailing(&self) {
        let mut state = self.state.lock();
        if *state == StreamState::Replaying {
            *state = StreamState::Tailing;
        }
    }

    /// Returns `false` once nobody is listening any more
    fn emit(&self, event: StreamEvent) -> bool {
        self.events.send(event).is_ok()
    }
}

/// Cloneable handle to stop a session and observe its progress
#[derive(Clone)]
pub struct StreamControl {
    session: Arc<Session>,
}

impl StreamControl {
    /// Stop the session; stopping twice is a no-op
    pub fn stop(&self) {
        self.session.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.session.is_stopped()
    }

    pub fn state(&self) -> StreamState {
        *self.session.state.lock()
    }

    /// Position just past the last delivered entry, usable as a resume offset
    pub fn cursor(&self) -> StreamCursor {
        *self.session.cursor.lock()
    }
}

impl std::fmt::Debug for StreamControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamControl")
            .field("state", &self.state())
            .field("cursor", &self.cursor())
            .finish()
    }
}

type DataListener = Box<dyn FnMut(LogEntry) + Send + 'static>;
type ErrorListener = Box<dyn FnMut(LoggerError) + Send + 'static>;
type EndListener = Box<dyn FnOnce() + Send + 'static>;

/// A running stream session
///
/// Consume it either by pulling events (`recv`, or as a [`futures::Stream`])
/// or by registering listeners and calling [`LogStream::listen`]. Events
/// are buffered until consumed, so listeners registered after the session
/// started miss nothing. Dropping the stream stops the session.
///
/// # Example
///
/// ```no_run
/// use rust_logit::core::{StreamEvent, StreamOptions, StreamingStore};
/// use rust_logit::stores::FileStore;
///
/// # async fn example() -> rust_logit::Result<()> {
/// let store = FileStore::new("/var/log/app.jsonl")?;
/// let mut stream = store.stream(StreamOptions::replay());
///
/// while let Some(event) = stream.recv().await {
///     match event {
///         StreamEvent::Data(entry) => println!("{}: {}", entry.level, entry.message),
///         StreamEvent::Error(err) => eprintln!("stream error: {}", err),
///         StreamEvent::End => break,
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct LogStream {
    events: mpsc::UnboundedReceiver<StreamEvent>,
    control: StreamControl,
    on_data: Option<DataListener>,
    on_error: Option<ErrorListener>,
    on_end: Option<EndListener>,
    done: bool,
}

impl LogStream {
    fn new(events: mpsc::UnboundedReceiver<StreamEvent>, session: Arc<Session>) -> Self {
        Self {
            events,
            control: StreamControl { session },
            on_data: None,
            on_error: None,
            on_end: None,
            done: false,
        }
    }

    /// Next event, `None` after `End`
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        futures::StreamExt::next(self).await
    }

    /// Drain a replay session into a vector
    ///
    /// # Errors
    ///
    /// Returns the first error event the session reports.
    pub async fn read_to_end(mut self) -> Result<Vec<LogEntry>> {
        let mut entries = Vec::new();
        while let Some(event) = self.recv().await {
            match event {
                StreamEvent::Data(entry) => entries.push(entry),
                StreamEvent::Error(err) => return Err(err),
                StreamEvent::End => break,
            }
        }
        Ok(entries)
    }

    #[must_use]
    pub fn on_data(mut self, listener: impl FnMut(LogEntry) + Send + 'static) -> Self {
        self.on_data = Some(Box::new(listener));
        self
    }

    #[must_use]
    pub fn on_error(mut self, listener: impl FnMut(LoggerError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(listener));
        self
    }

    #[must_use]
    pub fn on_end(mut self, listener: impl FnOnce() + Send + 'static) -> Self {
        self.on_end = Some(Box::new(listener));
        self
    }

    /// Deliver events to the registered listeners from a background task
    ///
    /// Outside a Tokio runtime the already-buffered events are delivered
    /// synchronously instead.
    pub fn listen(self) -> StreamControl {
        let control = self.control.clone();
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(self.dispatch());
            }
            Err(_) => self.dispatch_buffered(),
        }
        control
    }

    pub fn control(&self) -> StreamControl {
        self.control.clone()
    }

    /// Stop the session; no `Data` event is delivered afterwards
    pub fn stop(&self) {
        self.control.stop();
    }

    pub fn state(&self) -> StreamState {
        self.control.state()
    }

    pub fn cursor(&self) -> StreamCursor {
        self.control.cursor()
    }

    async fn dispatch(mut self) {
        while let Some(event) = self.recv().await {
            self.deliver(event);
        }
    }

    fn dispatch_buffered(mut self) {
        while let Ok(event) = self.events.try_recv() {
            if matches!(event, StreamEvent::Data(_)) && self.control.is_stopped() {
                continue;
            }
            let end = matches!(event, StreamEvent::End);
            self.deliver(event);
            if end {
                break;
            }
        }
    }

    fn deliver(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Data(entry) => {
                if let Some(listener) = self.on_data.as_mut() {
                    listener(entry);
                }
            }
            StreamEvent::Error(err) => match self.on_error.as_mut() {
                Some(listener) => listener(err),
                None => tracing::warn!(error = %err, "unhandled stream error"),
            },
            StreamEvent::End => {
                if let Some(listener) = self.on_end.take() {
                    listener();
                }
            }
        }
    }
}

impl Stream for LogStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if self.done {
                return Poll::Ready(None);
            }
            match self.events.poll_recv(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(None) => {
                    self.done = true;
                    return Poll::Ready(None);
                }
                Poll::Ready(Some(StreamEvent::Data(_))) if self.control.is_stopped() => continue,
                Poll::Ready(Some(StreamEvent::End)) => {
                    self.done = true;
                    return Poll::Ready(Some(StreamEvent::End));
                }
                Poll::Ready(Some(event)) => return Poll::Ready(Some(event)),
            }
        }
    }
}

impl Drop for LogStream {
    fn drop(&mut self) {
        self.control.stop();
    }
}

/// Start a session over `source`
///
/// `default_interval` applies when the options name no interval. The
/// session runs on the current Tokio runtime; without one it reports
/// [`LoggerError::NoRuntime`] and ends immediately.
pub fn spawn_stream<S: StreamSource>(
    source: S,
    options: &StreamOptions,
    default_interval: Duration,
) -> LogStream {
    let (tx, rx) = mpsc::unbounded_channel();
    let session = Arc::new(Session::new(tx, source.cursor()));
    let interval = options.interval.unwrap_or(default_interval);
    let follow = !options.end;

    match Handle::try_current() {
        Ok(handle) => {
            handle.spawn(drive(source, follow, interval, Arc::clone(&session)));
        }
        Err(_) => {
            session.emit(StreamEvent::Error(LoggerError::NoRuntime));
            session.finish(StreamState::Ended);
        }
    }

    LogStream::new(rx, session)
}

async fn drive<S: StreamSource>(
    mut source: S,
    follow: bool,
    interval: Duration,
    session: Arc<Session>,
) {
    let follow = follow && source.supports_tailing();

    loop {
        let fetched = tokio::select! {
            biased;
            () = session.wait_stopped() => return,
            fetched = source.fetch() => fetched,
        };
        if session.is_stopped() {
            return;
        }

        match fetched {
            Ok(batch) => {
                for entry in batch.entries {
                    if session.is_stopped() || !session.emit(StreamEvent::Data(entry)) {
                        return;
                    }
                }
                *session.cursor.lock() = batch.cursor;

                if batch.more {
                    continue;
                }
                if !follow {
                    session.finish(StreamState::Ended);
                    return;
                }
                session.enter_tailing();
            }
            Err(err) if err.ends_stream() => {
                tracing::warn!(source = source.name(), error = %err, "stream ended by error");
                session.emit(StreamEvent::Error(err));
                session.finish(StreamState::Ended);
                return;
            }
            Err(err) => {
                tracing::warn!(source = source.name(), error = %err, "stream poll failed");
                if !session.emit(StreamEvent::Error(err)) {
                    return;
                }
            }
        }

        tokio::select! {
            biased;
            () = session.wait_stopped() => return,
            () = tokio::time::sleep(interval) => {}
        }
    }
}
