use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

pub const LOG_ENV: &str = "DEX_LOG";
pub const DEFAULT_FILTER: &str = "dex_tui=info,warn";
const LOG_FILE_PREFIX: &str = "dex-tui.log";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

// stdout belongs to the terminal UI, so events only ever go to the daily file.
pub fn init(settings: &LoggingConfig) -> Result<PathBuf> {
    let dir = log_directory(settings);
    fs::create_dir_all(&dir).with_context(|| format!("create log directory {}", dir.display()))?;

    let filter = build_filter(std::env::var(LOG_ENV).ok(), &settings.filter);
    let writer = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_timer(fmt::time::ChronoLocal::new(TIMESTAMP_FORMAT.to_string())),
        )
        .try_init()
        .context("install tracing subscriber")?;

    tracing::info!(
        version = crate::VERSION,
        dir = %dir.display(),
        filter = %settings.filter,
        "dex-tui starting"
    );
    Ok(dir)
}

pub fn log_directory(settings: &LoggingConfig) -> PathBuf {
    match &settings.directory {
        Some(dir) => dir.clone(),
        None => default_directory(),
    }
}

pub fn default_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dex-tui")
        .join("logs")
}

fn build_filter(from_env: Option<String>, configured: &str) -> EnvFilter {
    let directives = from_env
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| configured.to_string());
    EnvFilter::try_new(&directives).unwrap_or_else(|err| {
        eprintln!("warning: ignoring log filter {directives:?}: {err}");
        EnvFilter::new(DEFAULT_FILTER)
    })
}
