use std::path::Path;

use anyhow::Result;
use tracing::info;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::config::LoggingConfig;

/// Initialize structured logging system
///
/// Keep the returned guard alive for as long as the file log should be
/// written; dropping it flushes the buffered lines.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    // RUST_LOG wins over the configured level
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| anyhow::anyhow!("Failed to create log filter: {}", e))?;

    let console_layer = if config.format == "json" {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .json()
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    };

    let registry = Registry::default().with(env_filter).with(console_layer);

    let guard = if let Some(file_path) = config.file_path.as_deref() {
        let log_path = Path::new(file_path);
        let directory = log_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let file_name = log_path
            .file_name()
            .map_or_else(|| "walletcare.log".into(), |n| n.to_string_lossy().into_owned());
        let (non_blocking_appender, guard) = non_blocking(rolling::daily(directory, file_name));

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_appender)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .json();

        registry
            .with(file_layer)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))?;
        Some(guard)
    } else {
        registry
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))?;
        None
    };

    info!(level = %config.level, format = %config.format, "Logging system initialized");
    Ok(guard)
}

/// Performance timing utilities
pub struct OperationTimer {
    operation: &'static str,
    start: std::time::Instant,
}

impl OperationTimer {
    /// Start timing `operation`
    #[must_use]
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: std::time::Instant::now(),
        }
    }

    /// Name of the timed operation
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        self.operation
    }

    /// Stop timing and log the elapsed time
    pub fn finish(self) -> std::time::Duration {
        let duration = self.start.elapsed();
        tracing::debug!(
            operation = self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
        duration
    }
}
