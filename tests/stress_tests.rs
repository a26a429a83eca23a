//! Stress tests for concurrent emission
//!
//! These tests verify:
//! - Concurrent producers sharing one syslog sink never interleave messages
//! - Routers keep producers alive when the sink fails on every call
//! - The push sink accounts for every record under overflow

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_log_generator::prelude::*;
use rust_log_generator::sinks::{Facility, PushConfig, PushSink, SyslogSink, Transport};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Transport that writes each message in small pieces, yielding in between,
/// so unsynchronised callers would interleave
#[derive(Clone, Default)]
struct ChunkedTransport {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl Transport for ChunkedTransport {
    fn send(&mut self, buf: &[u8]) -> std::io::Result<()> {
        for chunk in buf.chunks(7) {
            self.bytes.lock().extend_from_slice(chunk);
            thread::yield_now();
        }
        self.bytes.lock().push(b'\n');
        Ok(())
    }
}

#[test]
fn test_concurrent_syslog_messages_stay_whole() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 250;

    let transport = ChunkedTransport::default();
    let sink: SharedLogger = Arc::new(
        SyslogSink::new(Box::new(transport.clone()), Facility::Daemon).with_hostname("stress"),
    );

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let sink = Arc::clone(&sink);
            thread::spawn(move || {
                let service = format!("svc-{}", t);
                let labels = LabelSet::from([("service_name", service.as_str())]);
                let app = AppLogger::new(labels, sink);
                for i in 0..PER_THREAD {
                    app.log_with_metadata(
                        LogLevel::Info,
                        Utc::now(),
                        &format!("thread {} message {}", t, i),
                        &Metadata::from([("seq", i.to_string())]),
                    );
                }
                app.metrics().delivered_count()
            })
        })
        .collect();

    let delivered: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(delivered, (THREADS * PER_THREAD) as u64);

    let bytes = transport.bytes.lock();
    let output = String::from_utf8_lossy(&bytes);
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), THREADS * PER_THREAD);

    for line in &lines {
        assert!(line.starts_with("<30>1 "), "corrupted line: {line}");
        let (prefix, rest) = line.split_once(" [meta@1234 seq=\"").expect("missing SD");
        let service = prefix.split(' ').nth(3).unwrap();
        let (seq, message) = rest.split_once("\"] ").unwrap();
        let thread_id = service.trim_start_matches("svc-");
        assert_eq!(message, format!("thread {} message {}", thread_id, seq));
    }
}

#[test]
fn test_failing_sink_never_stops_producers() {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = Arc::clone(&calls);
    let failing: SharedLogger = Arc::new(LoggerFn::new(
        "failing",
        move |_: &LabelSet, _: DateTime<Utc>, _: &str, _: &Metadata| -> Result<()> {
            calls_clone.fetch_add(1, Ordering::Relaxed);
            Err(LoggerError::other("connection reset"))
        },
    ));
    let observed = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let observed = Arc::clone(&observed);
            let app = AppLogger::new(LabelSet::new(), Arc::clone(&failing)).with_error_observer(
                Arc::new(move |_: &LoggerError| {
                    observed.fetch_add(1, Ordering::Relaxed);
                }),
            );
            thread::spawn(move || {
                for _ in 0..500 {
                    app.error(Utc::now(), "still going");
                }
                app.metrics().dropped_count()
            })
        })
        .collect();

    let dropped: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(dropped, 2_000);
    assert_eq!(calls.load(Ordering::Relaxed), 2_000);
    assert_eq!(observed.load(Ordering::Relaxed), 2_000);
}

#[test]
fn test_push_overflow_accounting() {
    // Nothing listens here: every batch fails fast and counts as dropped
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/push", listener.local_addr().unwrap());
    drop(listener);

    let sink = Arc::new(
        PushSink::new(
            PushConfig::new(url)
                .with_queue_capacity(16)
                .with_request_timeout(Duration::from_millis(200)),
        )
        .unwrap(),
    );

    let rejected = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let sink = Arc::clone(&sink);
            let rejected = Arc::clone(&rejected);
            thread::spawn(move || {
                for i in 0..250 {
                    let result = sink.handle(&LabelSet::new(), Utc::now(), &format!("m{}", i));
                    if matches!(result, Err(LoggerError::QueueFull { .. })) {
                        rejected.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    sink.flush().unwrap();

    let metrics = sink.metrics();
    // Rejected records and failed batches both count as dropped
    assert_eq!(metrics.dropped_count() + metrics.delivered_count(), 1_000);
    assert_eq!(metrics.delivered_count(), 0);
    assert_eq!(metrics.queue_full_events() as usize, rejected.load(Ordering::Relaxed));
}
