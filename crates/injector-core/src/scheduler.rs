use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::report::Reporter;
use crate::stats::StatsCollector;
use crate::template::MessageFormatter;
use crate::transport::{Transport, TransportError};

/// Pause before the single reconnect attempt after a failed send.
const RECONNECT_DELAY: Duration = Duration::from_millis(100);

/// Minimum spacing between live progress snapshots.
const LIVE_REPORT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum RunError {
    #[error("initial connection failed: {0}")]
    Connect(#[source] TransportError),
    #[error("could not re-establish connection: {0}")]
    Reconnect(#[source] TransportError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The configured duration elapsed.
    Completed,
    /// Cancellation was requested and the run drained.
    Cancelled,
}

/// Drives batches of sends at the configured rate until the duration
/// elapses, cancellation is requested, or connectivity is lost for good.
///
/// Pacing anchors each batch to an absolute deadline: the next tick is
/// `previous_tick + batch_interval`, never `now + batch_interval`, so a
/// batch that overruns shortens or skips the following sleep and the
/// long-run rate stays on target. The scheduler never bursts past
/// `batch_size` sends per tick to catch up; falling behind lowers the
/// achieved rate instead.
pub struct Scheduler<T, R> {
    config: Config,
    formatter: MessageFormatter,
    transport: T,
    stats: Arc<StatsCollector>,
    reporter: R,
    cancel: CancellationToken,
    counter: u64,
}

impl<T: Transport, R: Reporter> Scheduler<T, R> {
    pub fn new(
        config: Config,
        transport: T,
        stats: Arc<StatsCollector>,
        reporter: R,
        cancel: CancellationToken,
    ) -> Self {
        let formatter = MessageFormatter::new(config.message_format.clone());
        Self {
            config,
            formatter,
            transport,
            stats,
            reporter,
            cancel,
            counter: 0,
        }
    }

    /// Run to completion. The final snapshot is reported exactly once on
    /// every path except an initial connect failure, where the run never
    /// started and there is nothing to report.
    pub async fn run(&mut self) -> Result<RunOutcome, RunError> {
        self.transport.connect().await.map_err(RunError::Connect)?;
        info!(
            "Connected to {:?} ({} transport)",
            self.config.socket_path,
            self.transport.name()
        );

        let interval = self.config.batch_interval();
        let start = Instant::now();
        let deadline = self.config.run_duration().map(|d| start + d);
        let mut next_tick = start;
        let mut last_report = start;

        let outcome = loop {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                break RunOutcome::Completed;
            }
            if self.cancel.is_cancelled() {
                break RunOutcome::Cancelled;
            }

            if let Err(err) = self.send_batch().await {
                // Connectivity is gone for good; the final numbers still go out.
                self.finish();
                return Err(err);
            }

            if last_report.elapsed() >= LIVE_REPORT_INTERVAL {
                self.reporter.live(&self.stats.snapshot());
                last_report = Instant::now();
            }

            next_tick += interval;
            tokio::select! {
                _ = time::sleep_until(next_tick) => {}
                _ = self.cancel.cancelled() => break RunOutcome::Cancelled,
            }
        };

        self.finish();
        Ok(outcome)
    }

    /// One batch tick: up to `batch_size` sequential sends. Cancellation
    /// is checked before every send, so shutdown latency is bounded by a
    /// single message rather than a full batch. The counter advances per
    /// rendered message whether or not the send succeeds; a message lost
    /// to a broken connection is not retried.
    async fn send_batch(&mut self) -> Result<(), RunError> {
        for _ in 0..self.config.batch_size {
            if self.cancel.is_cancelled() {
                break;
            }

            let message = self.formatter.render(self.counter);
            self.counter += 1;

            match self.transport.send(&message).await {
                Ok(bytes) => self.stats.record_success(bytes),
                Err(err) => {
                    self.stats.record_error();
                    if self.config.verbose {
                        warn!("Send failed: {}", err);
                    }
                    self.reconnect().await?;
                }
            }
        }
        Ok(())
    }

    /// Exactly one reconnect attempt after a failed send; a second
    /// failure in a row ends the run.
    async fn reconnect(&mut self) -> Result<(), RunError> {
        self.transport.close();
        time::sleep(RECONNECT_DELAY).await;

        match self.transport.connect().await {
            Ok(()) => {
                debug!("Reconnected to {:?}", self.config.socket_path);
                Ok(())
            }
            Err(err) => {
                warn!("Failed to reconnect: {}", err);
                Err(RunError::Reconnect(err))
            }
        }
    }

    fn finish(&mut self) {
        self.reporter.finished(&self.stats.snapshot());
        self.transport.close();
    }
}
