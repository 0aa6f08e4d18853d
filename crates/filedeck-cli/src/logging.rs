// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::config::Config;
use anyhow::{Context, Result, anyhow};
use std::env;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const LOG_FILTER_ENV: &str = "FILEDECK_LOG";

/// Installs the global subscriber. Events go to the log file only; the
/// terminal belongs to the UI. Keep the guard alive until exit so buffered
/// lines are flushed.
pub fn init(config: &Config) -> Result<WorkerGuard> {
    let path = config.log_file()?;
    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .ok_or_else(|| anyhow!("log file {} has no parent directory", path.display()))?;
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("log file {} has no file name", path.display()))?;
    fs::create_dir_all(directory)
        .with_context(|| format!("create log directory {}", directory.display()))?;

    let filter = build_filter(env::var(LOG_FILTER_ENV).ok().as_deref(), config.log_level())?;
    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|error| anyhow!("install log subscriber: {error}"))?;
    Ok(guard)
}

fn build_filter(env_value: Option<&str>, configured: &str) -> Result<EnvFilter> {
    let directives = env_value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(configured);
    EnvFilter::try_new(directives).with_context(|| {
        format!(
            "invalid log filter {directives:?}; use a level such as info or debug, or fix {LOG_FILTER_ENV} / [log].level"
        )
    })
}
