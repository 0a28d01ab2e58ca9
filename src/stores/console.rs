//! Console store implementation

use crate::core::{ClearCallback, LogEntry, Result, Store};
use parking_lot::Mutex;
use std::io::{self, Write};

/// Printed after every entry
pub const SEPARATOR: &str = "=========================";

/// Terminal escape that clears the screen
const CLEAR_SCREEN: &str = "\x1b[2J";

/// Writes each entry as one JSON line followed by a separator line
///
/// Has no streaming capability. Output goes to stdout unless another
/// writer is supplied.
///
/// # Example
///
/// ```
/// use rust_logit::core::{LogEntry, Store};
/// use rust_logit::stores::ConsoleStore;
///
/// let store = ConsoleStore::with_writer(Box::new(std::io::sink()));
/// store.write(LogEntry::new("info", "hello")).unwrap();
/// assert!(store.as_streaming().is_none());
/// ```
pub struct ConsoleStore {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleStore {
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl Default for ConsoleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for ConsoleStore {
    fn write(&self, entry: LogEntry) -> Result<()> {
        let line = entry.to_json_line()?;
        let mut writer = self.writer.lock();
        writer.write_all(line.as_bytes())?;
        writeln!(writer, "{}", SEPARATOR)?;
        writer.flush()?;
        Ok(())
    }

    fn clear(&self, callback: ClearCallback) {
        let result = {
            let mut writer = self.writer.lock();
            writer
                .write_all(CLEAR_SCREEN.as_bytes())
                .and_then(|()| writer.flush())
                .map_err(Into::into)
        };
        callback(result);
    }

    fn name(&self) -> &str {
        "console"
    }
}
