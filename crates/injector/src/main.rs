use anyhow::{Context, Result};
use clap::Parser;
use injector_core::{
    Config, ConsoleReporter, Scheduler, Snapshot, StatsCollector, UnixSocketTransport,
    DEFAULT_CONFIG_PATH,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "injector")]
#[command(about = "Syslog load injector - paced message generator for local stream sockets")]
struct Args {
    /// Path to configuration file
    #[arg(default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[derive(Debug, Serialize)]
struct RunReport {
    timestamp: String,
    socket_path: String,
    target_rate: u64,
    batch_size: u64,
    duration_secs: u64,
    messages_sent: u64,
    bytes_sent: u64,
    errors: u64,
    elapsed_secs: f64,
    achieved_rate: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    info!("Loading configuration from {:?}", args.config);
    let config = Config::load(&args.config)
        .with_context(|| format!("Invalid configuration in {:?}", args.config))?;

    info!("Endpoint: {:?}", config.socket_path);
    info!("Target rate: {} msg/s", config.target_rate);
    match config.run_duration() {
        Some(_) => info!("Duration: {}s", config.duration_secs),
        None => info!("Duration: unbounded, run until cancelled"),
    }
    info!("Batch size: {}", config.batch_size);

    let cancel = CancellationToken::new();
    spawn_signal_listener(cancel.clone());

    let stats = Arc::new(StatsCollector::new());
    let transport = UnixSocketTransport::new(&config.socket_path);
    let mut scheduler = Scheduler::new(
        config.clone(),
        transport,
        Arc::clone(&stats),
        ConsoleReporter::new(),
        cancel,
    );

    let result = scheduler.run().await;

    // The final snapshot exists on fatal paths too, so the report file is
    // written before the error propagates.
    if let Some(path) = &config.results_path {
        write_report(path, &config, &stats.snapshot())?;
    }

    result.context("Run aborted")?;
    Ok(())
}

/// First SIGINT or SIGTERM cancels the token; the scheduler drains and
/// prints final statistics instead of the process dying mid-send.
fn spawn_signal_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        let sigterm = async {
            match signal(SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                }
                Err(err) => {
                    warn!("Failed to install SIGTERM handler: {}", err);
                    std::future::pending::<()>().await
                }
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm => {}
        }

        info!("Shutdown requested, draining...");
        cancel.cancel();
    });
}

fn write_report(path: &Path, config: &Config, snapshot: &Snapshot) -> Result<()> {
    let report = RunReport {
        timestamp: chrono::Utc::now().to_rfc3339(),
        socket_path: config.socket_path.display().to_string(),
        target_rate: config.target_rate,
        batch_size: config.batch_size,
        duration_secs: config.duration_secs,
        messages_sent: snapshot.messages_sent,
        bytes_sent: snapshot.bytes_sent,
        errors: snapshot.errors,
        elapsed_secs: snapshot.elapsed_secs(),
        achieved_rate: snapshot.message_rate(),
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
    }
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write report to {:?}", path))?;
    info!("Results written to {:?}", path);

    Ok(())
}
