use std::io::Write;

use crate::stats::Snapshot;

/// Sink for progress output. Purely a display concern: nothing in the
/// engine depends on what a reporter does with a snapshot.
pub trait Reporter: Send {
    /// Called at most once per elapsed second while the run is active.
    fn live(&mut self, snapshot: &Snapshot);

    /// Called exactly once when the run stops, graceful or not.
    fn finished(&mut self, snapshot: &Snapshot);
}

/// Console reporter: a `\r`-overwritten progress line while running and
/// a multi-line summary block at the end.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Reporter for ConsoleReporter {
    fn live(&mut self, snapshot: &Snapshot) {
        print!(
            "\rElapsed: {:.2}s | Messages: {} | Rate: {:.2} msg/s | Throughput: {:.2} KB/s | Errors: {}",
            snapshot.elapsed_secs(),
            snapshot.messages_sent,
            snapshot.message_rate(),
            snapshot.byte_rate() / 1024.0,
            snapshot.errors
        );
        let _ = std::io::stdout().flush();
    }

    fn finished(&mut self, snapshot: &Snapshot) {
        println!("\n\n=== Final Statistics ===");
        println!("Elapsed: {:.2}s", snapshot.elapsed_secs());
        println!("Messages sent: {}", snapshot.messages_sent);
        println!("Bytes sent: {}", snapshot.bytes_sent);
        println!("Rate: {:.2} msg/s", snapshot.message_rate());
        println!("Throughput: {:.2} KB/s", snapshot.byte_rate() / 1024.0);
        println!("Errors: {}", snapshot.errors);
    }
}
