//! Call-stack capture and call-site extraction
//!
//! Stacks are kept as one string per frame, rendered as
//! `at <function> (<path>:<line>:<column>)`, or `at <function>` when the
//! frame carries no source location. Externally supplied traces may also
//! use the bare `at <path>:<line>:<column>` form; both parse into a
//! [`CallSite`].

use super::log_entry::CallSite;
use once_cell::sync::Lazy;
use regex::Regex;
use std::backtrace::Backtrace;
use std::fmt;

/// Default number of frames retained per stack
pub const DEFAULT_STACK_DEPTH: usize = 10;

const CRATE_NAME: &str = env!("CARGO_CRATE_NAME");

/// Scopes (relative to this crate) whose frames belong to the logging
/// machinery and are elided from captured stacks.
const MACHINERY_SCOPES: &[&str] = &[
    "::core::stack::StackInspector",
    "::core::stack::CapturedError",
    "::core::message::Cause",
    "::core::entry_builder::EntryBuilder",
    "::core::logger::Logger",
];

/// Runtime frames that may sit between machinery frames and the caller
const RUNTIME_PREFIXES: &[&str] = &["std::", "core::", "alloc::", "__rust"];

static NAMED_FRAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"at\s+(.*)\s+\((.*):(\d+):(\d+)\)").unwrap_or_else(|_| unreachable!())
});

static BARE_FRAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"at\s+()(.*):(\d+):(\d+)").unwrap_or_else(|_| unreachable!()));

static BACKTRACE_SYMBOL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\s*\d+:\s+|\s+)(\S.*?)\s*$").unwrap_or_else(|_| unreachable!())
});

static BACKTRACE_LOCATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*at\s+(.+?):(\d+)(?::(\d+))?\s*$").unwrap_or_else(|_| unreachable!())
});

/// Ordered frame strings, innermost first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawStack {
    frames: Vec<String>,
}

impl RawStack {
    pub fn new(frames: Vec<String>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    pub fn first(&self) -> Option<&str> {
        self.frames.first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn into_frames(self) -> Vec<String> {
        self.frames
    }
}

struct Frame {
    function: String,
    location: Option<(String, u32, u32)>,
}

impl Frame {
    fn render(&self) -> String {
        match &self.location {
            Some((path, line, column)) => {
                format!("at {} ({}:{}:{})", self.function, path, line, column)
            }
            None => format!("at {}", self.function),
        }
    }

    fn is_machinery(&self) -> bool {
        let name = self.function.trim_start_matches('<');
        name.strip_prefix(CRATE_NAME)
            .is_some_and(|rest| MACHINERY_SCOPES.iter().any(|scope| rest.starts_with(scope)))
    }

    fn is_runtime(&self) -> bool {
        let name = self.function.trim_start_matches('<');
        RUNTIME_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
    }
}

/// Captures the current stack and extracts call sites from frame strings
#[derive(Debug, Clone, Copy)]
pub struct StackInspector {
    depth: usize,
}

impl Default for StackInspector {
    fn default() -> Self {
        Self::new(DEFAULT_STACK_DEPTH)
    }
}

impl StackInspector {
    /// Create an inspector retaining at most `depth` frames per stack
    pub fn new(depth: usize) -> Self {
        Self {
            depth: depth.max(1),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Capture the caller's stack
    ///
    /// Frames of the backtrace facility and of the logging machinery are
    /// elided so the first retained frame is the code that issued the log
    /// call; `skip_frames` drops that many further caller frames.
    pub fn capture(&self, skip_frames: usize) -> RawStack {
        let backtrace = Backtrace::force_capture();
        let frames = Self::read_backtrace(&backtrace.to_string());
        let start = Self::caller_start(&frames);

        RawStack::new(
            frames
                .iter()
                .skip(start + skip_frames)
                .take(self.depth)
                .map(Frame::render)
                .collect(),
        )
    }

    /// Extract the call site from the first frame of `stack`
    ///
    /// Returns `None` when the stack is empty or its first frame matches
    /// neither the named nor the bare frame format.
    pub fn parse(&self, stack: &RawStack) -> Option<CallSite> {
        stack.first().and_then(Self::parse_frame)
    }

    /// Split an error's trace into its summary line and its frames
    pub fn from_error(&self, error: &CapturedError) -> (String, RawStack) {
        let mut lines = error.trace().lines();
        let summary = lines.next().unwrap_or_default().to_string();
        let frames = lines
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .take(self.depth)
            .map(String::from)
            .collect();

        (summary, RawStack::new(frames))
    }

    pub fn parse_frame(frame: &str) -> Option<CallSite> {
        let caps = NAMED_FRAME
            .captures(frame)
            .or_else(|| BARE_FRAME.captures(frame))?;

        let function = caps.get(1).map_or("", |m| m.as_str()).trim().to_string();
        let path = caps.get(2)?.as_str().trim().to_string();
        let line = caps.get(3)?.as_str().parse().ok()?;
        let column = caps.get(4)?.as_str().parse().ok()?;
        let file = path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(path.as_str())
            .to_string();

        Some(CallSite {
            function,
            path,
            file,
            line,
            column,
        })
    }

    /// Turn `std::backtrace::Backtrace` display output into frames
    ///
    /// Each symbol line (numbered, or indented for inlined frames) starts a
    /// frame; an `at path:line[:col]` line attaches its location.
    fn read_backtrace(text: &str) -> Vec<Frame> {
        let mut frames: Vec<Frame> = Vec::new();

        for line in text.lines() {
            if let Some(caps) = BACKTRACE_LOCATION.captures(line) {
                if let Some(frame) = frames.last_mut().filter(|f| f.location.is_none()) {
                    let line_no = caps[2].parse().unwrap_or(0);
                    let column = caps.get(3).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
                    frame.location = Some((caps[1].to_string(), line_no, column));
                }
            } else if let Some(caps) = BACKTRACE_SYMBOL.captures(line) {
                frames.push(Frame {
                    function: caps[1].to_string(),
                    location: None,
                });
            }
        }

        frames
    }

    /// Index of the first frame outside the backtrace facility and the
    /// logging machinery
    fn caller_start(frames: &[Frame]) -> usize {
        match frames.iter().position(Frame::is_machinery) {
            Some(first) => frames[first..]
                .iter()
                .position(|f| !f.is_machinery() && !f.is_runtime())
                .map_or(frames.len(), |offset| first + offset),
            None => frames
                .iter()
                .position(|f| !f.is_runtime())
                .unwrap_or(frames.len()),
        }
    }
}

/// An error captured together with a stack trace
///
/// The trace's first line is the error summary and every following line is
/// a frame, the shape [`StackInspector::from_error`] expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedError {
    trace: String,
}

impl CapturedError {
    /// Capture `error` along with the stack of the code observing it
    pub fn new<E: std::error::Error + ?Sized>(error: &E) -> Self {
        let summary = sanitize_summary(&error.to_string());
        let stack = StackInspector::default().capture(0);

        let mut trace = summary;
        for frame in stack.frames() {
            trace.push('\n');
            trace.push_str(frame);
        }
        Self { trace }
    }

    /// Wrap an externally produced trace (summary line, then one frame per line)
    pub fn from_trace(trace: impl Into<String>) -> Self {
        Self {
            trace: trace.into(),
        }
    }

    /// The error's summary line
    pub fn summary(&self) -> &str {
        self.trace.lines().next().unwrap_or_default()
    }

    pub fn trace(&self) -> &str {
        &self.trace
    }
}

impl fmt::Display for CapturedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.summary())
    }
}

impl std::error::Error for CapturedError {}

/// Keep a multi-line error message on the summary line
fn sanitize_summary(message: &str) -> String {
    message
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named_frame() {
        let site = StackInspector::parse_frame("at app::handlers::login (./src/handlers.rs:42:13)")
            .expect("named frame parses");

        assert_eq!(site.function, "app::handlers::login");
        assert_eq!(site.path, "./src/handlers.rs");
        assert_eq!(site.file, "handlers.rs");
        assert_eq!(site.line, 42);
        assert_eq!(site.column, 13);
    }

    #[test]
    fn test_parse_bare_frame() {
        let site = StackInspector::parse_frame("    at /srv/app/main.rs:7:1").expect("bare frame parses");

        assert_eq!(site.function, "");
        assert_eq!(site.path, "/srv/app/main.rs");
        assert_eq!(site.file, "main.rs");
        assert_eq!((site.line, site.column), (7, 1));
    }

    #[test]
    fn test_parse_trait_impl_frame() {
        let frame = "at <app::Job as core::ops::Drop>::drop (src/job.rs:10:5)";
        let site = StackInspector::parse_frame(frame).expect("frame parses");
        assert_eq!(site.function, "<app::Job as core::ops::Drop>::drop");
        assert_eq!(site.file, "job.rs");
    }

    #[test]
    fn test_unparseable_frame_keeps_stack() {
        let inspector = StackInspector::default();
        let stack = RawStack::new(vec!["at <unknown>".to_string()]);

        assert!(inspector.parse(&stack).is_none());
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_read_backtrace_output() {
        let text = "   0: std::backtrace::Backtrace::force_capture\n             at /rustc/lib/std/src/backtrace.rs:312:9\n   1: rust_logit::core::stack::StackInspector::capture\n             at ./src/core/stack.rs:120:25\n   2: app::run\n             at ./src/app.rs:8:5\n      app::run::inner\n             at ./src/app.rs:3:9\n   3: main\n";
        let frames = StackInspector::read_backtrace(text);

        assert_eq!(frames.len(), 5);
        assert_eq!(frames[2].render(), "at app::run (./src/app.rs:8:5)");
        assert_eq!(frames[3].render(), "at app::run::inner (./src/app.rs:3:9)");
        assert_eq!(frames[4].render(), "at main");
        assert_eq!(StackInspector::caller_start(&frames), 2);
    }

    #[test]
    fn test_capture_starts_outside_inspector() {
        let stack = StackInspector::default().capture(0);

        assert!(!stack.is_empty());
        assert!(stack.len() <= DEFAULT_STACK_DEPTH);
        let first = stack.first().unwrap();
        assert!(!first.contains("StackInspector::capture"), "first frame: {}", first);
    }

    #[test]
    fn test_capture_respects_depth() {
        let stack = StackInspector::new(2).capture(0);
        assert!(stack.len() <= 2);
    }

    #[test]
    fn test_from_error_splits_summary() {
        let error = CapturedError::from_trace(
            "Error: OMG\n    at handler (/srv/app.rs:10:2)\n    at /srv/main.rs:3:1\n",
        );
        let inspector = StackInspector::default();
        let (summary, stack) = inspector.from_error(&error);

        assert_eq!(summary, "Error: OMG");
        assert_eq!(stack.len(), 2);
        let site = inspector.parse(&stack).unwrap();
        assert_eq!(site.function, "handler");
        assert_eq!(site.line, 10);
    }

    #[test]
    fn test_captured_error_summary_is_single_line() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "first\nsecond");
        let captured = CapturedError::new(&io);

        assert_eq!(captured.summary(), "first\\nsecond");
        assert_eq!(captured.to_string(), "first\\nsecond");
        assert!(captured.trace().lines().count() > 1);
    }
}
