//! Logging initialization: console sink plus a rolling file sink.
//!
//! The console gets one informational line per record; the file sink
//! additionally captures debug detail (full request/response bodies from
//! the directory client) when debug mode is enabled.

use std::fs;

use pinsync_core::config::LoggingConfig;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init(config: &LoggingConfig) {
    let _ = fs::create_dir_all(&config.log_dir);

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "pinsync.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_level = if config.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let default_directive = if config.debug { "debug" } else { "info" };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer)
        .with_filter(file_level);
    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stdout)
        .with_filter(LevelFilter::INFO);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    // The guard must outlive main so buffered lines are flushed on exit.
    std::mem::forget(guard);
}
