//! Shared plumbing for the command-line tools.

pub mod png_io;

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::LevelFilter;
use ppu_core::logging::{LogConfig, LogLevel};

fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Off => LevelFilter::Off,
        LogLevel::Error => LevelFilter::Error,
        LogLevel::Warn => LevelFilter::Warn,
        LogLevel::Info => LevelFilter::Info,
        LogLevel::Debug => LevelFilter::Debug,
        LogLevel::Trace => LevelFilter::Trace,
    }
}

/// Apply `--log-level` / `--log-file` to both the core log config and the
/// frontend's `env_logger`. `RUST_LOG` still overrides the frontend filter.
pub fn init_logging(level: &str, log_file: Option<&Path>) -> Result<()> {
    let level = LogLevel::from_str(level).ok_or_else(|| anyhow!("Unknown log level '{}'", level))?;

    let config = LogConfig::global();
    config.set_global_level(level);
    if let Some(path) = log_file {
        config
            .set_log_file(path.to_path_buf())
            .with_context(|| format!("Cannot open log file {}", path.display()))?;
    }

    env_logger::Builder::new()
        .filter_level(level_filter(level))
        .parse_default_env()
        .init();
    Ok(())
}
