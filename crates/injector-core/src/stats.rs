use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Run counters shared between the sending path and the reporting path.
///
/// A single mutex guards the aggregate so the concurrency contract is
/// explicit; the start instant is set once at construction and never
/// changes. Counters only ever increase during a run.
pub struct StatsCollector {
    inner: Mutex<Counters>,
    start_time: Instant,
}

#[derive(Default)]
struct Counters {
    messages_sent: u64,
    bytes_sent: u64,
    errors: u64,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Counters::default()),
            start_time: Instant::now(),
        }
    }

    pub fn record_success(&self, bytes: u64) {
        let mut inner = self.inner.lock();
        inner.messages_sent += 1;
        inner.bytes_sent += bytes;
    }

    pub fn record_error(&self) {
        self.inner.lock().errors += 1;
    }

    pub fn snapshot(&self) -> Snapshot {
        let inner = self.inner.lock();
        Snapshot {
            messages_sent: inner.messages_sent,
            bytes_sent: inner.bytes_sent,
            errors: inner.errors,
            elapsed: self.start_time.elapsed(),
        }
    }
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of the counters with derived rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub messages_sent: u64,
    pub bytes_sent: u64,
    pub errors: u64,
    pub elapsed: Duration,
}

impl Snapshot {
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Messages per second over the whole run; 0 before any time has passed.
    pub fn message_rate(&self) -> f64 {
        let elapsed = self.elapsed_secs();
        if elapsed <= 0.0 {
            return 0.0;
        }
        self.messages_sent as f64 / elapsed
    }

    /// Bytes per second over the whole run; 0 before any time has passed.
    pub fn byte_rate(&self) -> f64 {
        let elapsed = self.elapsed_secs();
        if elapsed <= 0.0 {
            return 0.0;
        }
        self.bytes_sent as f64 / elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_snapshot() {
        let stats = StatsCollector::new();

        stats.record_success(128);
        stats.record_success(64);
        stats.record_error();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.messages_sent, 2);
        assert_eq!(snapshot.bytes_sent, 192);
        assert_eq!(snapshot.errors, 1);
    }

    #[test]
    fn test_rates_zero_without_elapsed_time() {
        let snapshot = Snapshot {
            messages_sent: 100,
            bytes_sent: 1000,
            errors: 0,
            elapsed: Duration::ZERO,
        };
        assert_eq!(snapshot.message_rate(), 0.0);
        assert_eq!(snapshot.byte_rate(), 0.0);
    }

    #[test]
    fn test_rates_derived_from_elapsed() {
        let snapshot = Snapshot {
            messages_sent: 300,
            bytes_sent: 6000,
            errors: 2,
            elapsed: Duration::from_secs(3),
        };
        assert_eq!(snapshot.message_rate(), 100.0);
        assert_eq!(snapshot.byte_rate(), 2000.0);
    }

    #[test]
    fn test_concurrent_recording() {
        use std::sync::Arc;

        let stats = Arc::new(StatsCollector::new());
        let mut handles = Vec::new();

        for _ in 0..4 {
            let stats = Arc::clone(&stats);
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    stats.record_success(10);
                }
                stats.record_error();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.messages_sent, 4000);
        assert_eq!(snapshot.bytes_sent, 40_000);
        assert_eq!(snapshot.errors, 4);
    }
}
