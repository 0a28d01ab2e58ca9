//! Stream protocol tests across the streaming stores
//!
//! These tests verify:
//! - Replay returns exactly what was written, in write order
//! - Stopping a tailing session halts delivery for every backend
//! - Resuming from a session cursor
//! - Listeners registered late miss nothing
//! - Document store readiness and write acknowledgements through the logger

use futures::StreamExt;
use parking_lot::Mutex;
use rust_logit::core::{ErrorInfo, LogEntry, StreamCursor, StreamState};
use rust_logit::prelude::*;
use rust_logit::stores::{
    DocumentStore, DocumentStoreConfig, ListStore, MemoryDocumentBackend, MemoryListBackend,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::{sleep, timeout};

const INTERVAL: Duration = Duration::from_millis(50);

async fn wait_for_count(received: &Mutex<Vec<String>>, count: usize) {
    timeout(Duration::from_secs(5), async {
        loop {
            if received.lock().len() >= count {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timed out waiting for stream data");
}

/// Two entries written after the stream starts are delivered; after `stop`
/// a third one never is.
async fn assert_stop_halts_delivery(logger: &Logger) {
    let stream = logger
        .stream(StreamOptions::follow(INTERVAL))
        .expect("store supports streaming");

    let received = Arc::new(Mutex::new(Vec::new()));
    let ended = Arc::new(Mutex::new(0));

    let received_clone = Arc::clone(&received);
    let ended_clone = Arc::clone(&ended);
    let control = stream
        .on_data(move |entry| received_clone.lock().push(entry.message))
        .on_end(move || *ended_clone.lock() += 1)
        .listen();

    logger.info("first").unwrap();
    // Distinct timestamps keep watermark-based backends exact
    sleep(Duration::from_millis(5)).await;
    logger.info("second").unwrap();

    wait_for_count(&received, 2).await;
    assert!(!control.state().is_terminal());

    control.stop();
    control.stop();
    logger.info("third").unwrap();

    sleep(INTERVAL * 3).await;
    assert_eq!(*received.lock(), ["first", "second"]);
    assert_eq!(*ended.lock(), 1);
    assert_eq!(control.state(), StreamState::Stopped);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_halts_file_stream() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let logger = Logger::builder()
        .store(FileStore::new(temp_dir.path().join("app.jsonl")).unwrap())
        .build()
        .unwrap();

    assert_stop_halts_delivery(&logger).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_halts_list_stream() {
    let logger = Logger::builder()
        .store(ListStore::with_default_key(Arc::new(MemoryListBackend::new())))
        .build()
        .unwrap();

    assert_stop_halts_delivery(&logger).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_halts_document_stream() {
    let store = DocumentStore::connect(
        Arc::new(MemoryDocumentBackend::new()),
        DocumentStoreConfig::default(),
    )
    .unwrap();
    store.wait_ready().await.unwrap();
    let logger = Logger::builder().store(store).build().unwrap();

    assert_stop_halts_delivery(&logger).await;
}

#[tokio::test]
async fn test_file_replay_round_trip() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = FileStore::new(temp_dir.path().join("round_trip.jsonl")).unwrap();

    let written: Vec<LogEntry> = (0..25)
        .map(|i| {
            let entry = LogEntry::new(if i % 2 == 0 { "info" } else { "warn" }, format!("entry {}", i))
                .with_timestamp(1_700_000_000_000 + i);
            match i % 5 {
                0 => entry.with_details(json!({"n": i, "nested": {"ok": true}})),
                1 => entry.with_error_info(ErrorInfo::summary(format!("failure {}", i))),
                _ => entry,
            }
        })
        .collect();
    for entry in &written {
        store.write(entry.clone()).unwrap();
    }

    let replayed = store
        .stream(StreamOptions::replay())
        .read_to_end()
        .await
        .unwrap();

    assert_eq!(replayed, written);
}

#[tokio::test]
async fn test_resume_from_cursor() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = FileStore::new(temp_dir.path().join("resume.jsonl")).unwrap();
    for i in 0..3 {
        store.write(LogEntry::new("info", format!("old {}", i))).unwrap();
    }

    let mut first = store.stream(StreamOptions::replay());
    let mut count = 0;
    while let Some(event) = first.next().await {
        if let StreamEvent::Data(_) = event {
            count += 1;
        }
    }
    assert_eq!(count, 3);
    let cursor = first.cursor();
    assert!(matches!(cursor, StreamCursor::Offset(offset) if offset > 0));

    store.write(LogEntry::new("info", "new")).unwrap();

    let resumed = store
        .stream(StreamOptions::replay().with_offset(cursor))
        .read_to_end()
        .await
        .unwrap();
    let messages: Vec<_> = resumed.into_iter().map(|e| e.message).collect();
    assert_eq!(messages, ["new"]);
}

#[tokio::test]
async fn test_listeners_registered_late_miss_nothing() {
    let backend = Arc::new(MemoryListBackend::new());
    let logger = Logger::builder()
        .store(ListStore::new(backend, "late"))
        .build()
        .unwrap();
    for i in 0..5 {
        logger.info(format!("m{}", i)).unwrap();
    }

    let stream = logger.stream(StreamOptions::replay()).unwrap();
    sleep(Duration::from_millis(50)).await;

    let (tx, rx) = tokio::sync::oneshot::channel();
    let received = Arc::new(Mutex::new(Vec::new()));
    let received_clone = Arc::clone(&received);
    stream
        .on_data(move |entry| received_clone.lock().push(entry.message))
        .on_end(move || {
            let _ = tx.send(());
        })
        .listen();

    timeout(Duration::from_secs(5), rx)
        .await
        .expect("stream did not end")
        .unwrap();
    assert_eq!(*received.lock(), ["m0", "m1", "m2", "m3", "m4"]);
}

#[tokio::test]
async fn test_malformed_line_ends_file_stream() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("corrupt.jsonl");
    let store = FileStore::new(&path).unwrap();
    store.write(LogEntry::new("info", "good")).unwrap();
    {
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"not json at all\n").unwrap();
    }
    store.write(LogEntry::new("info", "unreachable")).unwrap();

    let mut stream = store.stream(StreamOptions::follow(INTERVAL));
    let mut events = Vec::new();
    while let Some(event) = timeout(Duration::from_secs(5), stream.recv())
        .await
        .expect("stream stalled")
    {
        events.push(event);
    }

    assert_eq!(events.len(), 3);
    assert!(matches!(&events[0], StreamEvent::Data(entry) if entry.message == "good"));
    assert!(matches!(
        &events[1],
        StreamEvent::Error(LoggerError::MalformedRecord { .. })
    ));
    assert!(matches!(events[2], StreamEvent::End));
    assert_eq!(stream.state(), StreamState::Ended);
}

#[tokio::test]
async fn test_document_clear_before_ready_through_logger() {
    let backend = Arc::new(MemoryDocumentBackend::new().with_connect_delay(Duration::from_millis(50)));
    let store = Arc::new(
        DocumentStore::connect(backend.clone(), DocumentStoreConfig::default()).unwrap(),
    );
    let logger = Logger::builder().shared_store(store.clone()).build().unwrap();

    logger.info("queued 1").unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel();
    logger.clear(move |result| {
        let _ = tx.send(result.is_ok());
    });
    logger.info("queued 2").unwrap();
    assert_eq!(backend.removals(), 0);

    assert!(timeout(Duration::from_secs(5), rx).await.unwrap().unwrap());
    store.wait_ready().await.unwrap();

    assert_eq!(backend.removals(), 1);
    let messages: Vec<_> = backend.documents().into_iter().map(|e| e.message).collect();
    assert_eq!(messages, ["queued 1", "queued 2"]);
}

#[tokio::test]
async fn test_document_insert_failure_reaches_logger() {
    let backend = Arc::new(MemoryDocumentBackend::new().rejecting_inserts("disk full"));
    let store = Arc::new(
        DocumentStore::connect(backend.clone(), DocumentStoreConfig::default()).unwrap(),
    );
    store.wait_ready().await.unwrap();
    let logger = Logger::builder().shared_store(store.clone()).build().unwrap();

    // Accepted for the background worker, rejected by the backend later
    logger.info("lost").unwrap();
    timeout(Duration::from_secs(5), async {
        while logger.metrics().failed_count() < 1 {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("rejection never counted");
    assert_eq!(logger.metrics().total_logged(), 0);

    let err = logger.log_async("info", "also lost").await.unwrap_err();
    assert!(matches!(err, LoggerError::Backend { .. }));
    assert!(err.to_string().contains("disk full"));
    assert_eq!(logger.metrics().failed_count(), 2);
    assert!(backend.documents().is_empty());
}

#[tokio::test]
async fn test_clear_async_on_file_store() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("clear.jsonl");
    let logger = Logger::builder()
        .store(FileStore::new(&path).unwrap())
        .build()
        .unwrap();

    logger.info("before").unwrap();
    logger.clear_async().await.unwrap();
    assert!(!path.exists());

    let stream = logger.stream(StreamOptions::replay()).unwrap();
    let err = stream.read_to_end().await.unwrap_err();
    assert!(matches!(err, LoggerError::SourceUnavailable(_)));
}

#[test]
fn test_console_store_cannot_stream() {
    let logger = Logger::builder()
        .store(ConsoleStore::with_writer(Box::new(std::io::sink())))
        .build()
        .unwrap();

    assert!(!logger.can_stream());
    assert!(logger.stream(StreamOptions::replay()).is_none());
}
