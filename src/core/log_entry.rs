//! Log entry structure

use super::level::Level;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Source location attributed to a log call or to an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    /// Function or method name, empty for anonymous frames
    pub function: String,
    pub path: String,
    /// Last segment of `path`
    pub file: String,
    pub line: u32,
    pub column: u32,
}

/// Error attached to an entry
///
/// `stack` and `call_site` are only present when the caller asked for the
/// error's own stack; otherwise only the summary message is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_site: Option<CallSite>,
}

impl ErrorInfo {
    pub fn summary(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
            call_site: None,
        }
    }
}

/// One persisted record
///
/// Serialized as a single JSON object; byte-oriented stores write one per line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: Level,
    pub message: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_site: Option<CallSite>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ErrorInfo>,
}

impl LogEntry {
    pub fn new(level: impl Into<Level>, message: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            message: message.into(),
            timestamp: Utc::now().timestamp_millis(),
            details: None,
            stack: None,
            call_site: None,
            error_info: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_error_info(mut self, info: ErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Timestamp as a UTC date, `None` if out of chrono's range
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }

    /// Serialize as one JSON line terminated by `\n`
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
