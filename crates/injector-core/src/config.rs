use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

/// Config file path used when none is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "injector_config.conf";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid integer for `{key}`: `{value}`")]
    InvalidNumber { key: &'static str, value: String },
    #[error("`{key}` must be greater than zero")]
    Zero { key: &'static str },
}

/// Immutable run parameters, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Filesystem path of the stream socket to inject into.
    pub socket_path: PathBuf,
    /// Message template; see `MessageFormatter` for recognized placeholders.
    pub message_format: String,
    /// Target messages per second.
    pub target_rate: u64,
    /// Run duration in seconds; 0 means run until cancelled.
    pub duration_secs: u64,
    /// Messages per batch tick.
    pub batch_size: u64,
    /// Log each failed send instead of only counting it.
    pub verbose: bool,
    /// Optional path for a JSON run report written after the run.
    pub results_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("/tmp/fluentbit.sock"),
            message_format: "<134>1 {timestamp} {hostname} test-app {pid} - - Test message #{counter}"
                .to_string(),
            target_rate: 1000,
            duration_secs: 60,
            batch_size: 100,
            verbose: false,
            results_path: None,
        }
    }
}

impl Config {
    /// Load from a line-oriented `key = value` file.
    ///
    /// A missing or unreadable file falls back to defaults with a warning;
    /// a malformed value in an existing file is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents),
            Err(err) => {
                warn!(
                    "Could not open config file {:?} ({}), using defaults",
                    path, err
                );
                Ok(Self::default())
            }
        }
    }

    /// Parse config file contents. Lines starting with `#`, empty lines
    /// and lines without `=` are skipped; unknown keys are ignored.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "socket_path" => config.socket_path = PathBuf::from(value),
                "message_format" => config.message_format = value.to_string(),
                "target_rate" => config.target_rate = parse_u64("target_rate", value)?,
                "duration" => config.duration_secs = parse_u64("duration", value)?,
                "batch_size" => config.batch_size = parse_u64("batch_size", value)?,
                "verbose" => config.verbose = value == "true" || value == "1",
                "results_path" => {
                    config.results_path = (!value.is_empty()).then(|| PathBuf::from(value));
                }
                other => debug!("Ignoring unknown config key `{}`", other),
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.target_rate == 0 {
            return Err(ConfigError::Zero { key: "target_rate" });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Zero { key: "batch_size" });
        }
        Ok(())
    }

    /// Wall-clock limit for the run; `None` means run until cancelled.
    pub fn run_duration(&self) -> Option<Duration> {
        (self.duration_secs > 0).then(|| Duration::from_secs(self.duration_secs))
    }

    /// Interval between batch ticks: `batch_size * 1_000_000 / target_rate`
    /// microseconds, integer math only.
    pub fn batch_interval(&self) -> Duration {
        Duration::from_micros(self.batch_size * 1_000_000 / self.target_rate)
    }
}

fn parse_u64(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidNumber {
        key,
        value: value.to_string(),
    })
}
