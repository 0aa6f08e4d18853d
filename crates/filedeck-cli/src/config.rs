// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use filedeck_api::{QueryDefaults, RetryDelay, parse_base_url};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_VERSION: i64 = 1;
pub const APP_NAME: &str = "filedeck";
pub const API_BASE_ENV: &str = "FILEDECK_API_BASE";
const CONFIG_PATH_ENV: &str = "FILEDECK_CONFIG_PATH";
const DEFAULT_TIMEOUT: &str = "10s";
const DEFAULT_STALE_TIME: &str = "30s";
const DEFAULT_RETRY: i64 = 2;
const MAX_RETRY: i64 = 10;
const DEFAULT_LOG_LEVEL: &str = "info";
const LOG_FILE_NAME: &str = "filedeck.log";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub query: Query,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api: Api::default(),
            query: Query::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Api {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Query {
    pub stale_time: Option<String>,
    pub retry: Option<i64>,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            stale_time: Some(DEFAULT_STALE_TIME.to_owned()),
            retry: Some(DEFAULT_RETRY),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
            file: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
        })?;

        let app_dir = config_root.join(APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and keep values under [api], [query], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1. Run `filedeck --print-example-config` for the current schema",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(base_url) = &self.api.base_url {
            parse_base_url(base_url)
                .with_context(|| format!("invalid api.base_url in {}", path.display()))?;
        }

        if let Some(timeout) = &self.api.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "api.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(stale_time) = &self.query.stale_time {
            parse_duration(stale_time)
                .with_context(|| format!("invalid query.stale_time in {}", path.display()))?;
        }

        if let Some(retry) = self.query.retry
            && !(0..=MAX_RETRY).contains(&retry)
        {
            bail!(
                "query.retry in {} must be between 0 and {MAX_RETRY}, got {}",
                path.display(),
                retry
            );
        }

        if let Some(file) = &self.log.file
            && file.trim().is_empty()
        {
            bail!(
                "log.file in {} must not be empty; remove it to use the default location",
                path.display()
            );
        }

        Ok(())
    }

    /// `FILEDECK_API_BASE` wins over `[api].base_url`; there is no built-in
    /// default.
    pub fn api_base_url(&self) -> Result<String> {
        resolve_base_url(env::var(API_BASE_ENV).ok(), self.api.base_url.as_deref())
    }

    pub fn api_timeout(&self) -> Result<Duration> {
        parse_duration(self.api.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn query_defaults(&self) -> Result<QueryDefaults> {
        let stale_time =
            parse_duration(self.query.stale_time.as_deref().unwrap_or(DEFAULT_STALE_TIME))?;
        let retry = self.query.retry.unwrap_or(DEFAULT_RETRY);
        let retry = u32::try_from(retry)
            .with_context(|| format!("query.retry must be non-negative, got {retry}"))?;
        Ok(QueryDefaults {
            stale_time,
            retry,
            retry_delay: RetryDelay::Exponential,
        })
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_file(&self) -> Result<PathBuf> {
        if let Some(file) = &self.log.file {
            return Ok(PathBuf::from(file));
        }
        let data_root = dirs::data_local_dir().ok_or_else(|| {
            anyhow!("cannot resolve data directory; set [log].file in the config")
        })?;
        Ok(data_root.join(APP_NAME).join(LOG_FILE_NAME))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# filedeck config\n# Place this file at: {}\n\nversion = 1\n\n[api]\n# Required unless {API_BASE_ENV} is set; the variable takes precedence.\n# base_url = \"http://localhost:3000\"\ntimeout = \"{DEFAULT_TIMEOUT}\"\n\n[query]\n# How long fetched data is served from cache before it is fetched again.\nstale_time = \"{DEFAULT_STALE_TIME}\"\n# Extra attempts after a failed request.\nretry = {DEFAULT_RETRY}\n\n[log]\n# Overridden by FILEDECK_LOG. Accepts tracing filter directives.\nlevel = \"{DEFAULT_LOG_LEVEL}\"\n# Optional. Default is the platform data dir (for example ~/.local/share/filedeck/filedeck.log)\n# file = \"/absolute/path/filedeck.log\"\n",
            path.display(),
        )
    }
}

fn resolve_base_url(env_value: Option<String>, configured: Option<&str>) -> Result<String> {
    let from_env = env_value.filter(|value| !value.trim().is_empty());
    let raw = match (&from_env, configured) {
        (Some(value), _) => value.as_str(),
        (None, Some(value)) => value,
        (None, None) => bail!(
            "no API base URL configured; set {API_BASE_ENV} or [api].base_url (for example http://localhost:3000)"
        ),
    };
    let source = if from_env.is_some() {
        API_BASE_ENV
    } else {
        "api.base_url"
    };
    parse_base_url(raw).with_context(|| format!("invalid API base URL from {source}"))
}

pub fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        let Some(secs) = mins.checked_mul(60) else {
            bail!("duration {raw:?} is too large");
        };
        return Ok(Duration::from_secs(secs));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 30s)")
}
