//! Log entry enrichment
//!
//! Turns a level, a [`Message`] and an optional [`Cause`] into a
//! [`LogEntry`], capturing the call stack when the level or the message
//! asks for it.

use super::error::{LoggerError, Result};
use super::level::Level;
use super::log_entry::{CallSite, ErrorInfo, LogEntry};
use super::message::{Cause, Message};
use super::stack::{CapturedError, RawStack, StackInspector, DEFAULT_STACK_DEPTH};
use chrono::Utc;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};

/// Which entries carry a captured stack, and how much of it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackPolicy {
    stack_levels: HashSet<Level>,
    depth: usize,
    skip_frames: usize,
}

impl StackPolicy {
    /// Levels that capture the stack when none are configured
    pub const DEFAULT_STACK_LEVELS: [&'static str; 2] = [Level::DEBUG, Level::ERROR];

    pub fn new<I, L>(stack_levels: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Level>,
    {
        Self {
            stack_levels: stack_levels.into_iter().map(Into::into).collect(),
            depth: DEFAULT_STACK_DEPTH,
            skip_frames: 0,
        }
    }

    /// Maximum number of frames kept per stack
    #[must_use]
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Additional caller frames to drop, for wrappers around the logger
    #[must_use]
    pub fn with_skip_frames(mut self, skip_frames: usize) -> Self {
        self.skip_frames = skip_frames;
        self
    }

    pub fn requires_stack(&self, level: &str) -> bool {
        self.stack_levels.contains(level)
    }

    pub fn stack_levels(&self) -> impl Iterator<Item = &Level> {
        self.stack_levels.iter()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn skip_frames(&self) -> usize {
        self.skip_frames
    }
}

impl Default for StackPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_STACK_LEVELS)
    }
}

/// Builds enriched entries for one logger
///
/// Timestamps are non-decreasing across all entries built by the same
/// builder, even if the wall clock steps backwards.
#[derive(Debug)]
pub struct EntryBuilder {
    policy: StackPolicy,
    inspector: StackInspector,
    last_timestamp: AtomicI64,
}

impl EntryBuilder {
    pub fn new(policy: StackPolicy) -> Self {
        Self {
            inspector: StackInspector::new(policy.depth),
            policy,
            last_timestamp: AtomicI64::new(i64::MIN),
        }
    }

    pub fn policy(&self) -> &StackPolicy {
        &self.policy
    }

    /// Build one entry
    ///
    /// # Errors
    ///
    /// Fails with [`LoggerError::InvalidArgument`] when `cause` is a present
    /// value that is not an error.
    pub fn build(&self, level: &Level, message: Message, cause: Option<Cause>) -> Result<LogEntry> {
        let error = match cause.filter(Cause::is_present) {
            Some(Cause::Error(error)) => Some(error),
            Some(Cause::Value(value)) => {
                return Err(LoggerError::invalid_argument(
                    "cause",
                    format!("expected an error, got {}", describe(&value)),
                ))
            }
            None => None,
        };

        let capture_stack = message.wants_stack() || self.policy.requires_stack(level.as_str());
        let want_error_stack = message.wants_error_stack();

        let (text, details) = match message {
            Message::Plain(text) => (text, None),
            Message::Structured {
                message, details, ..
            } => (message, details),
        };

        let mut entry = LogEntry {
            level: level.clone(),
            message: text,
            timestamp: 0,
            details,
            stack: None,
            call_site: None,
            error_info: None,
        };

        if capture_stack {
            let stack = self.inspector.capture(self.policy.skip_frames);
            entry.call_site = self.inspector.parse(&stack);
            entry.stack = Some(stack.into_frames());
        }

        if let Some(error) = error {
            entry.error_info = Some(if want_error_stack {
                self.error_info(&error)
            } else {
                ErrorInfo::summary(error.summary())
            });
        }

        entry.timestamp = self.next_timestamp();
        Ok(entry)
    }

    /// Stack and call site for the current call, or for `error` if given
    pub fn stack_data(&self, error: Option<&CapturedError>) -> (RawStack, Option<CallSite>) {
        let stack = match error {
            Some(error) => self.inspector.from_error(error).1,
            None => self.inspector.capture(self.policy.skip_frames),
        };
        let call_site = self.inspector.parse(&stack);
        (stack, call_site)
    }

    fn error_info(&self, error: &CapturedError) -> ErrorInfo {
        let (summary, stack) = self.inspector.from_error(error);
        ErrorInfo {
            message: summary,
            call_site: self.inspector.parse(&stack),
            stack: Some(stack.into_frames()),
        }
    }

    fn next_timestamp(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let previous = self.last_timestamp.fetch_max(now, Ordering::SeqCst);
        previous.max(now)
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
