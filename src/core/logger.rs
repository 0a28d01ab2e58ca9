//! Main logger implementation

use super::{
    entry_builder::{EntryBuilder, StackPolicy},
    error::{LoggerError, Result},
    level::Level,
    log_entry::{CallSite, LogEntry},
    message::{Cause, Message},
    metrics::LoggerMetrics,
    stack::{CapturedError, RawStack, DEFAULT_STACK_DEPTH},
    store::Store,
    stream::{LogStream, StreamOptions},
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::mem;
use std::sync::Arc;

/// Handler bound to one level name: builds the entry and writes it
pub type LevelHandler = Arc<dyn Fn(Message, Option<Cause>) -> Result<()> + Send + Sync>;

/// Progress of one write's acknowledgement
enum Ack {
    Waiting,
    Settled(Result<()>),
    /// The write call returned before the store acknowledged
    Detached,
}

fn record(metrics: &LoggerMetrics, result: &Result<()>) {
    match result {
        Ok(()) => { metrics.record_logged(); }
        Err(_) => { metrics.record_failed(); }
    }
}

/// Construction-time logger settings
///
/// Fixed for the logger's lifetime.
#[derive(Clone)]
pub struct LoggerConfig {
    /// Level names to bind handlers for
    pub levels: Vec<String>,
    /// Levels whose entries always carry the call stack
    pub stack_levels: Vec<String>,
    /// Maximum number of frames kept per captured stack
    pub stack_depth: usize,
    /// Extra caller frames to drop from captured stacks
    pub skip_frames: usize,
    pub store: Option<Arc<dyn Store>>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            levels: Level::DEFAULTS.iter().map(|l| l.to_string()).collect(),
            stack_levels: StackPolicy::DEFAULT_STACK_LEVELS
                .iter()
                .map(|l| l.to_string())
                .collect(),
            stack_depth: DEFAULT_STACK_DEPTH,
            skip_frames: 0,
            store: None,
        }
    }
}

impl fmt::Debug for LoggerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerConfig")
            .field("levels", &self.levels)
            .field("stack_levels", &self.stack_levels)
            .field("stack_depth", &self.stack_depth)
            .field("skip_frames", &self.skip_frames)
            .field("store", &self.store.as_ref().map(|s| s.name().to_string()))
            .finish()
    }
}

/// Logger façade
///
/// Binds each configured level name to a handler that enriches the message
/// and writes the entry to the store.
///
/// # Example
///
/// ```
/// use rust_logit::prelude::*;
///
/// let logger = Logger::builder()
///     .store(ConsoleStore::new())
///     .build()
///     .expect("store configured");
///
/// logger.info("server started").unwrap();
/// logger.log("warn", "disk almost full").unwrap();
/// assert!(logger.log("verbose", "no such level").is_err());
/// ```
pub struct Logger {
    store: Arc<dyn Store>,
    builder: Arc<EntryBuilder>,
    handlers: HashMap<Level, LevelHandler>,
    levels: Vec<Level>,
    metrics: Arc<LoggerMetrics>,
}

impl Logger {
    /// Create a logger from `config`
    ///
    /// # Errors
    ///
    /// Fails with [`LoggerError::InvalidConfiguration`] when no store is
    /// bound, a level name is blank, or the stack depth is zero.
    pub fn new(config: LoggerConfig) -> Result<Self> {
        let store = config
            .store
            .ok_or_else(|| LoggerError::config("Logger", "a store is required"))?;

        if config.stack_depth == 0 {
            return Err(LoggerError::config("Logger", "stack depth must be at least 1"));
        }

        let mut levels: Vec<Level> = Vec::with_capacity(config.levels.len());
        for name in config.levels {
            let level: Level = name
                .parse()
                .map_err(|message: String| LoggerError::config("Logger", message))?;
            if !levels.contains(&level) {
                levels.push(level);
            }
        }

        let policy = StackPolicy::new(config.stack_levels)
            .with_depth(config.stack_depth)
            .with_skip_frames(config.skip_frames);
        let builder = Arc::new(EntryBuilder::new(policy));
        let metrics = Arc::new(LoggerMetrics::new());

        let handlers = levels
            .iter()
            .map(|level| {
                let handler = Self::bind_level(
                    level.clone(),
                    Arc::clone(&builder),
                    Arc::clone(&store),
                    Arc::clone(&metrics),
                );
                (level.clone(), handler)
            })
            .collect();

        Ok(Self {
            store,
            builder,
            handlers,
            levels,
            metrics,
        })
    }

    fn bind_level(
        level: Level,
        builder: Arc<EntryBuilder>,
        store: Arc<dyn Store>,
        metrics: Arc<LoggerMetrics>,
    ) -> LevelHandler {
        Arc::new(move |message, cause| {
            let entry = builder.build(&level, message, cause)?;
            Self::persist(store.as_ref(), &metrics, entry)
        })
    }

    /// Hand `entry` to the store, counting it once the store acknowledged it
    ///
    /// A store that acknowledges before returning has its result passed
    /// back to the caller. Later acknowledgements are only counted, and
    /// rejections are reported through `tracing`.
    fn persist(store: &dyn Store, metrics: &Arc<LoggerMetrics>, entry: LogEntry) -> Result<()> {
        let ack = Arc::new(Mutex::new(Ack::Waiting));

        let ack_slot = Arc::clone(&ack);
        let ack_metrics = Arc::clone(metrics);
        store.write_with(
            entry,
            Box::new(move |result| {
                let mut slot = ack_slot.lock();
                if matches!(*slot, Ack::Waiting) {
                    *slot = Ack::Settled(result);
                    return;
                }
                drop(slot);
                if let Err(err) = &result {
                    tracing::error!(error = %err, "store rejected an accepted entry");
                }
                record(&ack_metrics, &result);
            }),
        );

        let settled = mem::replace(&mut *ack.lock(), Ack::Detached);
        match settled {
            Ack::Settled(result) => {
                record(metrics, &result);
                result
            }
            Ack::Waiting | Ack::Detached => Ok(()),
        }
    }

    /// Log through the handler bound to `level`
    ///
    /// # Errors
    ///
    /// [`LoggerError::UnknownLevel`] if no handler is bound to `level`, or
    /// whatever the store returns.
    pub fn log(&self, level: &str, message: impl Into<Message>) -> Result<()> {
        self.dispatch(level, message.into(), None)
    }

    /// Log with an error cause through the handler bound to `level`
    ///
    /// # Errors
    ///
    /// Additionally fails with [`LoggerError::InvalidArgument`] when `cause`
    /// is a present value that is not an error.
    pub fn log_with(
        &self,
        level: &str,
        message: impl Into<Message>,
        cause: impl Into<Cause>,
    ) -> Result<()> {
        self.dispatch(level, message.into(), Some(cause.into()))
    }

    fn dispatch(&self, level: &str, message: Message, cause: Option<Cause>) -> Result<()> {
        let handler = self
            .handlers
            .get(level)
            .ok_or_else(|| LoggerError::UnknownLevel(level.to_string()))?;
        handler(message, cause)
    }

    /// Log through `level` and wait until the store persisted the entry
    ///
    /// Unlike [`Logger::log`], which returns once the store accepted the
    /// entry, this also surfaces failures of stores that write in the
    /// background.
    ///
    /// # Errors
    ///
    /// [`LoggerError::UnknownLevel`] if no handler is bound to `level`,
    /// otherwise the store's acknowledgement.
    pub async fn log_async(&self, level: &str, message: impl Into<Message>) -> Result<()> {
        let (level, _) = self
            .handlers
            .get_key_value(level)
            .ok_or_else(|| LoggerError::UnknownLevel(level.to_string()))?;
        let entry = self.builder.build(level, message.into(), None)?;

        let (tx, rx) = tokio::sync::oneshot::channel();
        let metrics = Arc::clone(&self.metrics);
        self.store.write_with(
            entry,
            Box::new(move |result| {
                record(&metrics, &result);
                let _ = tx.send(result);
            }),
        );
        rx.await.map_err(|_| {
            LoggerError::backend(self.store.name(), "write acknowledgement was dropped")
        })?
    }

    /// Build and write an entry for any level, bound or not
    pub fn write(
        &self,
        level: impl Into<Level>,
        message: impl Into<Message>,
        cause: Option<Cause>,
    ) -> Result<()> {
        let entry = self.builder.build(&level.into(), message.into(), cause)?;
        Self::persist(self.store.as_ref(), &self.metrics, entry)
    }

    #[inline]
    pub fn debug(&self, message: impl Into<Message>) -> Result<()> {
        self.log(Level::DEBUG, message)
    }

    #[inline]
    pub fn info(&self, message: impl Into<Message>) -> Result<()> {
        self.log(Level::INFO, message)
    }

    #[inline]
    pub fn warn(&self, message: impl Into<Message>) -> Result<()> {
        self.log(Level::WARN, message)
    }

    #[inline]
    pub fn error(&self, message: impl Into<Message>) -> Result<()> {
        self.log(Level::ERROR, message)
    }

    /// Helper for logging a failure at error level
    pub fn error_with(&self, message: impl Into<Message>, cause: impl Into<Cause>) -> Result<()> {
        self.log_with(Level::ERROR, message, cause)
    }

    /// Helper for logging a failure at warn level
    pub fn warn_with(&self, message: impl Into<Message>, cause: impl Into<Cause>) -> Result<()> {
        self.log_with(Level::WARN, message, cause)
    }

    /// Whether a handler is bound to `level`
    pub fn has_level(&self, level: &str) -> bool {
        self.handlers.contains_key(level)
    }

    /// Bound levels in configuration order
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn stack_policy(&self) -> &StackPolicy {
        self.builder.policy()
    }

    /// Stack and call site this logger would attach, for the current call
    /// or for `error`
    pub fn stack_data(&self, error: Option<&CapturedError>) -> (RawStack, Option<CallSite>) {
        self.builder.stack_data(error)
    }

    /// Whether the bound store supports streaming
    pub fn can_stream(&self) -> bool {
        self.store.as_streaming().is_some()
    }

    /// Replay, and optionally tail, what the store persisted
    ///
    /// `None` when the store has no streaming capability.
    pub fn stream(&self, options: StreamOptions) -> Option<LogStream> {
        self.store
            .as_streaming()
            .map(|streaming| streaming.stream(options))
    }

    /// Clear the store, reporting completion to `callback`
    pub fn clear(&self, callback: impl FnOnce(Result<()>) + Send + 'static) {
        self.store.clear(Box::new(callback));
    }

    /// Clear the store and wait for completion
    pub async fn clear_async(&self) -> Result<()> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.clear(move |result| {
            let _ = tx.send(result);
        });
        rx.await.map_err(|_| {
            LoggerError::backend(self.store.name(), "clear completion was dropped")
        })?
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Get the logger metrics for detailed observability
    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("store", &self.store.name())
            .field("levels", &self.levels)
            .field("stack_policy", self.builder.policy())
            .finish()
    }
}

/// Builder for constructing Logger with a fluent API
///
/// # Example
/// ```
/// use rust_logit::prelude::*;
///
/// let logger = Logger::builder()
///     .store(ConsoleStore::new())
///     .levels(["trace", "info", "alert"])
///     .stack_levels(["alert"])
///     .stack_depth(5)
///     .build()
///     .unwrap();
///
/// assert!(logger.has_level("alert"));
/// assert!(!logger.has_level("debug"));
/// ```
pub struct LoggerBuilder {
    config: LoggerConfig,
}

impl LoggerBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            config: LoggerConfig::default(),
        }
    }

    /// Bind the store entries are written to
    #[must_use = "builder methods return a new value"]
    pub fn store<S: Store + 'static>(mut self, store: S) -> Self {
        self.config.store = Some(Arc::new(store));
        self
    }

    /// Bind a store shared with other owners
    #[must_use = "builder methods return a new value"]
    pub fn shared_store(mut self, store: Arc<dyn Store>) -> Self {
        self.config.store = Some(store);
        self
    }

    /// Replace the default level names
    #[must_use = "builder methods return a new value"]
    pub fn levels<I, S>(mut self, levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.levels = levels.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the levels that always capture the stack
    #[must_use = "builder methods return a new value"]
    pub fn stack_levels<I, S>(mut self, levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.stack_levels = levels.into_iter().map(Into::into).collect();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn stack_depth(mut self, depth: usize) -> Self {
        self.config.stack_depth = depth;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn skip_frames(mut self, frames: usize) -> Self {
        self.config.skip_frames = frames;
        self
    }

    /// Build the Logger
    pub fn build(self) -> Result<Logger> {
        Logger::new(self.config)
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    /// Create a builder for Logger
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }
}
