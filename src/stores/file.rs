//! File store implementation
//!
//! Entries are appended as JSON lines. Streaming reads the file from a byte
//! offset, keeping any incomplete trailing line until its newline arrives.

use crate::core::{
    spawn_stream, Batch, ClearCallback, LogEntry, LogStream, LoggerError, Result, Store,
    StreamCursor, StreamOptions, StreamSource, StreamingStore, DEFAULT_TAIL_INTERVAL,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Most bytes read from the file per poll
const READ_CHUNK: u64 = 64 * 1024;

pub struct FileStore {
    path: PathBuf,
    writer: Mutex<Option<BufWriter<File>>>,
}

impl FileStore {
    /// Open `path` for appending, creating it and its parent directories
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created or opened
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let writer = Self::open(&path)?;

        Ok(Self {
            path,
            writer: Mutex::new(Some(writer)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(path: &Path) -> io::Result<BufWriter<File>> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(BufWriter::new(file))
    }
}

impl Store for FileStore {
    fn write(&self, entry: LogEntry) -> Result<()> {
        let line = entry.to_json_line()?;
        let mut guard = self.writer.lock();

        // Reopen after a clear removed the file
        if guard.is_none() {
            *guard = Some(Self::open(&self.path)?);
        }
        if let Some(writer) = guard.as_mut() {
            writer.write_all(line.as_bytes())?;
            writer.flush()?;
        }
        Ok(())
    }

    fn clear(&self, callback: ClearCallback) {
        let result = {
            let mut guard = self.writer.lock();
            if let Some(mut writer) = guard.take() {
                let _ = writer.flush();
            }
            match std::fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(LoggerError::io_operation(
                    "clearing log file",
                    self.path.display().to_string(),
                    e,
                )),
            }
        };
        tracing::debug!(path = %self.path.display(), ok = result.is_ok(), "file store cleared");
        callback(result);
    }

    fn name(&self) -> &str {
        "file"
    }

    fn as_streaming(&self) -> Option<&dyn StreamingStore> {
        Some(self)
    }
}

impl StreamingStore for FileStore {
    fn stream(&self, options: StreamOptions) -> LogStream {
        let resume = options.resume_at("byte offset", |cursor| match cursor {
            StreamCursor::Offset(offset) => Some(offset),
            _ => None,
        });
        let (start, pending) = match resume {
            Ok(start) => (start.unwrap_or(0), None),
            Err(err) => (0, Some(err)),
        };
        let source = FileSource {
            path: self.path.clone(),
            read_pos: start,
            residual: Vec::new(),
            pending,
        };
        spawn_stream(source, &options, DEFAULT_TAIL_INTERVAL)
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.get_mut().as_mut() {
            let _ = writer.flush();
        }
    }
}

/// Byte-offset reader over a JSON lines file
struct FileSource {
    path: PathBuf,
    /// Bytes read from the file so far
    read_pos: u64,
    /// Incomplete trailing line
    residual: Vec<u8>,
    /// Failure reported on the next fetch, after any entries before it
    pending: Option<LoggerError>,
}

impl FileSource {
    /// Offset of the first byte not yet consumed as a record
    fn record_pos(&self) -> u64 {
        self.read_pos - self.residual.len() as u64
    }

    /// Append up to [`READ_CHUNK`] new bytes to the residual buffer
    ///
    /// Returns whether the file holds more unread bytes.
    async fn read_new_bytes(&mut self) -> Result<bool> {
        let mut file = match tokio::fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(LoggerError::SourceUnavailable(format!(
                    "{} no longer exists",
                    self.path.display()
                )))
            }
            Err(e) => {
                return Err(LoggerError::io_operation(
                    "opening log file for streaming",
                    self.path.display().to_string(),
                    e,
                ))
            }
        };

        let len = file.metadata().await?.len();
        if len < self.read_pos {
            tracing::debug!(path = %self.path.display(), "log file shrank, rereading from start");
            self.read_pos = 0;
            self.residual.clear();
        }
        if len == self.read_pos {
            return Ok(false);
        }

        let want = (len - self.read_pos).min(READ_CHUNK);
        file.seek(SeekFrom::Start(self.read_pos)).await?;
        let before = self.residual.len();
        (&mut file).take(want).read_to_end(&mut self.residual).await?;

        self.read_pos += (self.residual.len() - before) as u64;
        Ok(self.read_pos < len)
    }

    /// Decode every complete line in the residual buffer
    fn drain_records(&mut self) -> Vec<LogEntry> {
        let base = self.record_pos();
        let mut entries = Vec::new();
        let mut consumed = 0;

        while let Some(newline) = self.residual[consumed..].iter().position(|b| *b == b'\n') {
            let line_start = consumed;
            let line = self.residual[line_start..line_start + newline].trim_ascii();
            consumed = line_start + newline + 1;

            if line.is_empty() {
                continue;
            }
            match serde_json::from_slice::<LogEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    self.pending = Some(LoggerError::malformed(base + line_start as u64, e));
                    consumed = line_start;
                    break;
                }
            }
        }

        self.residual.drain(..consumed);
        entries
    }
}

#[async_trait]
impl StreamSource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    fn cursor(&self) -> StreamCursor {
        StreamCursor::Offset(self.record_pos())
    }

    async fn fetch(&mut self) -> Result<Batch> {
        if let Some(err) = self.pending.take() {
            return Err(err);
        }

        let unread = self.read_new_bytes().await?;
        let entries = self.drain_records();

        let mut batch = Batch::new(entries, self.cursor());
        // A decode failure is reported on the next fetch, right after the good records
        batch.more = unread || self.pending.is_some();
        Ok(batch)
    }
}
