use std::path::PathBuf;
use std::sync::Arc;

use injector_core::{
    Config, Reporter, RunError, RunOutcome, Scheduler, Snapshot, StatsCollector,
    UnixSocketTransport,
};
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;

#[derive(Default, Clone)]
struct CountingReporter {
    finished: Arc<Mutex<u64>>,
}

impl Reporter for CountingReporter {
    fn live(&mut self, _snapshot: &Snapshot) {}

    fn finished(&mut self, _snapshot: &Snapshot) {
        *self.finished.lock() += 1;
    }
}

fn short_run_config(socket_path: PathBuf) -> Config {
    Config {
        socket_path,
        message_format: "e2e {counter}".to_string(),
        target_rate: 200,
        duration_secs: 1,
        batch_size: 20,
        verbose: false,
        results_path: None,
    }
}

#[tokio::test]
async fn test_messages_arrive_newline_framed_over_unix_socket() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("ingest.sock");
    let listener = UnixListener::bind(&socket_path).unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut lines = BufReader::new(stream).lines();
        let mut received = Vec::new();
        while let Ok(Some(line)) = lines.next_line().await {
            received.push(line);
        }
        received
    });

    let stats = Arc::new(StatsCollector::new());
    let reporter = CountingReporter::default();
    let mut scheduler = Scheduler::new(
        short_run_config(socket_path.clone()),
        UnixSocketTransport::new(&socket_path),
        Arc::clone(&stats),
        reporter.clone(),
        CancellationToken::new(),
    );

    let outcome = scheduler.run().await.unwrap();
    assert_eq!(outcome, RunOutcome::Completed);

    let received = server.await.unwrap();
    let snapshot = stats.snapshot();

    // Every counted message arrived as exactly one newline-framed line,
    // in order and with a gapless counter.
    assert_eq!(received.len() as u64, snapshot.messages_sent);
    assert!(!received.is_empty());
    for (i, line) in received.iter().enumerate() {
        assert_eq!(line, &format!("e2e {}", i));
    }
    assert_eq!(snapshot.errors, 0);
    assert_eq!(*reporter.finished.lock(), 1);
}

#[tokio::test]
async fn test_missing_endpoint_fails_before_any_send() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("nobody-listening.sock");

    let stats = Arc::new(StatsCollector::new());
    let mut scheduler = Scheduler::new(
        short_run_config(socket_path.clone()),
        UnixSocketTransport::new(&socket_path),
        Arc::clone(&stats),
        CountingReporter::default(),
        CancellationToken::new(),
    );

    let err = scheduler.run().await.unwrap_err();
    assert!(matches!(err, RunError::Connect(_)));
    assert_eq!(stats.snapshot().messages_sent, 0);
}
