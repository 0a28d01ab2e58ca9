//! Log call arguments: the message and the optional error cause

use super::stack::CapturedError;
use serde_json::Value;

/// What a level call logs
///
/// # Example
///
/// ```
/// use rust_logit::Message;
/// use serde_json::json;
///
/// let plain: Message = "cache warmed".into();
/// let structured = Message::structured("payment failed")
///     .with_error_stack()
///     .with_details(json!({"order": 1042}));
///
/// assert_eq!(plain.text(), "cache warmed");
/// assert!(structured.wants_error_stack());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Plain(String),
    Structured {
        message: String,
        /// Capture the call stack regardless of the level's policy
        want_stack: bool,
        /// Attach the error's own stack, not only its summary
        want_error_stack: bool,
        details: Option<Value>,
    },
}

impl Message {
    pub fn structured(message: impl Into<String>) -> Self {
        Message::Structured {
            message: message.into(),
            want_stack: false,
            want_error_stack: false,
            details: None,
        }
    }

    /// Force stack capture for this call
    #[must_use]
    pub fn with_stack(self) -> Self {
        match self.into_structured() {
            Message::Structured {
                message,
                want_error_stack,
                details,
                ..
            } => Message::Structured {
                message,
                want_stack: true,
                want_error_stack,
                details,
            },
            plain => plain,
        }
    }

    /// Attach the full stack of the supplied error
    #[must_use]
    pub fn with_error_stack(self) -> Self {
        match self.into_structured() {
            Message::Structured {
                message,
                want_stack,
                details,
                ..
            } => Message::Structured {
                message,
                want_stack,
                want_error_stack: true,
                details,
            },
            plain => plain,
        }
    }

    /// Attach an opaque payload stored verbatim on the entry
    #[must_use]
    pub fn with_details(self, payload: Value) -> Self {
        match self.into_structured() {
            Message::Structured {
                message,
                want_stack,
                want_error_stack,
                ..
            } => Message::Structured {
                message,
                want_stack,
                want_error_stack,
                details: Some(payload),
            },
            plain => plain,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Message::Plain(text) => text,
            Message::Structured { message, .. } => message,
        }
    }

    pub fn wants_stack(&self) -> bool {
        matches!(self, Message::Structured { want_stack: true, .. })
    }

    pub fn wants_error_stack(&self) -> bool {
        matches!(
            self,
            Message::Structured {
                want_error_stack: true,
                ..
            }
        )
    }

    fn into_structured(self) -> Self {
        match self {
            Message::Plain(message) => Message::structured(message),
            structured => structured,
        }
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::Plain(text.to_string())
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::Plain(text)
    }
}

/// The optional third argument of a level call
///
/// Only [`Cause::Error`] is accepted as an error; a [`Cause::Value`] that is
/// not falsy (`null`, `false`, `0`, `""`) is rejected when the entry is built.
#[derive(Debug, Clone, PartialEq)]
pub enum Cause {
    Error(CapturedError),
    Value(Value),
}

impl Cause {
    /// Capture `error` at the calling site
    pub fn error<E: std::error::Error + ?Sized>(error: &E) -> Self {
        Cause::Error(CapturedError::new(error))
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Cause::Value(value.into())
    }

    /// Whether the argument counts as supplied at all
    pub fn is_present(&self) -> bool {
        match self {
            Cause::Error(_) => true,
            Cause::Value(value) => is_truthy(value),
        }
    }
}

impl From<CapturedError> for Cause {
    fn from(error: CapturedError) -> Self {
        Cause::Error(error)
    }
}

impl From<Value> for Cause {
    fn from(value: Value) -> Self {
        Cause::Value(value)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
