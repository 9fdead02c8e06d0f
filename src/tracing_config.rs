//! Tracing configuration module for structured logging
//!
//! The binary configures the subscriber once; library code only emits
//! `tracing` events (and `log` records, which are bridged into `tracing`).

use crate::util::now_name;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Configuration for console output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TracingFormat {
    /// Human-readable console output with colors (default for CLI)
    #[default]
    Console,
    /// Compact console output without ANSI colors, for CI environments
    Compact,
    /// JSON structured logging
    #[cfg(feature = "tracing-json")]
    Json,
}

/// Keeps the log file writer alive
///
/// Buffered lines are flushed when this is dropped, so the binary holds it
/// until exit.
#[derive(Debug)]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
    log_file: Option<PathBuf>,
}

impl LoggingGuard {
    /// Path of the log file, if file logging is enabled
    #[must_use]
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}

/// Tracing configuration builder
#[derive(Debug, Default)]
pub struct TracingConfig {
    /// Verbosity level (maps to log levels)
    pub verbosity: u8,
    /// Console output format
    pub format: TracingFormat,
    /// Directory for the timestamped log file; `None` logs to the console only
    pub log_dir: Option<PathBuf>,
    /// Environment filter string (overrides verbosity if set)
    pub env_filter: Option<String>,
    /// Session ID for correlation
    pub session_id: Option<String>,
}

impl TracingConfig {
    /// Create a new tracing configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity level (0-2+)
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set console output format
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Write a timestamped log file into `dir`
    #[must_use]
    pub fn with_log_dir<P: Into<PathBuf>>(mut self, dir: Option<P>) -> Self {
        self.log_dir = dir.map(Into::into);
        self
    }

    /// Set custom environment filter
    #[must_use]
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Set session ID for run correlation
    #[must_use]
    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Convert verbosity level to tracing filter string
    #[must_use]
    pub fn verbosity_to_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "info",  // Default: progress and summaries
            1 => "debug", // -v: per-image verdicts and mask statistics
            _ => "trace", // -vv+: extremely detailed traces
        }
    }

    /// Log file path for a run starting now: `<log_dir>/<timestamp>.log`
    #[must_use]
    pub fn log_file_path(&self) -> Option<PathBuf> {
        self.log_dir
            .as_ref()
            .map(|dir| dir.join(now_name(Some("log"))))
    }

    /// Initialize the global tracing subscriber
    ///
    /// # Errors
    /// - Invalid filter string
    /// - Log directory cannot be created
    /// - A global subscriber is already installed
    pub fn init(self) -> anyhow::Result<LoggingGuard> {
        let filter = if let Some(env_filter) = &self.env_filter {
            EnvFilter::try_new(env_filter)?
        } else {
            EnvFilter::try_new(self.verbosity_to_filter())?
        };

        let log_file = self.log_file_path();
        let (file_layer, file_guard) = match &log_file {
            Some(path) => {
                let dir = path.parent().unwrap_or_else(|| Path::new("."));
                std::fs::create_dir_all(dir)?;
                let file_name = path
                    .file_name()
                    .ok_or_else(|| anyhow::anyhow!("Invalid log file path {}", path.display()))?;
                let appender = tracing_appender::rolling::never(dir, file_name);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(writer)
                    .compact();
                (Some(layer), Some(guard))
            },
            None => (None, None),
        };

        let registry = Registry::default().with(filter).with(file_layer);

        match self.format {
            TracingFormat::Console => {
                let console_layer = fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_thread_names(false)
                    .with_level(true)
                    .compact();
                registry.with(console_layer).try_init()?;
            },
            TracingFormat::Compact => {
                let console_layer = fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .compact();
                registry.with(console_layer).try_init()?;
            },
            #[cfg(feature = "tracing-json")]
            TracingFormat::Json => {
                let console_layer = fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true);
                registry.with(console_layer).try_init()?;
            },
        }

        if let Some(session_id) = &self.session_id {
            tracing::info!(
                session_id = %session_id,
                log_file = ?log_file,
                "White background erasure session started"
            );
        }

        Ok(LoggingGuard {
            _file_guard: file_guard,
            log_file,
        })
    }
}

/// Initialize tracing with CLI-friendly defaults and a fresh session ID
pub fn init_cli_tracing(verbosity: u8, log_dir: Option<&Path>) -> anyhow::Result<LoggingGuard> {
    TracingConfig::new()
        .with_verbosity(verbosity)
        .with_format(TracingFormat::Console)
        .with_log_dir(log_dir)
        .with_session_id(uuid::Uuid::new_v4().to_string())
        .init()
}
