use std::fs;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

use crate::config::LoggingConfig;
use crate::error::{GenError, Result};

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global subscriber.
///
/// Console output always goes to stderr. When `config.dir` is set a JSON layer
/// writes to daily files there; keep the returned guard alive until exit so
/// buffered lines are flushed.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let console = fmt::Layer::new()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter(&config.level));

    let (file_layer, guard) = match &config.dir {
        Some(dir) => {
            fs::create_dir_all(dir).map_err(|e| GenError::io(dir, e))?;
            let appender = tracing_appender::rolling::RollingFileAppender::builder()
                .rotation(tracing_appender::rolling::Rotation::DAILY)
                .filename_prefix("fisco-k8s")
                .filename_suffix("log")
                .build(dir)
                .map_err(|e| GenError::config(format!("Failed to create log file appender: {}", e)))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::Layer::new()
                .json()
                .with_writer(writer)
                .with_file(true)
                .with_line_number(true)
                .with_target(true)
                .with_ansi(false)
                .with_filter(filter(&config.level));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| GenError::config(format!("Failed to set tracing subscriber: {}", e)))?;

    Ok(guard)
}
